//! Parameter binding and backend dispatch for one statement execution.

use crate::strategy::StatementContext;
use sqlmapper_core::{
    BoundSql, CallResult, Connection, MappedStatement, ParameterMode, PreparedStatement, Result, Row,
    RowStream, SqlCommandType, StatementType, Value, set_property,
};

/// How the statement text reaches the backend.
#[derive(Debug, Clone, Copy)]
pub enum StatementHandle<'a> {
    /// Plain SQL text.
    Text(&'a str),
    /// A handle prepared earlier on the same connection.
    Prepared(&'a PreparedStatement),
}

/// Binds a [`BoundSql`] and runs it against a connection.
pub struct StatementHandler<'a> {
    conn: &'a dyn Connection,
    ms: &'a MappedStatement,
    bound_sql: &'a BoundSql,
}

impl<'a> StatementHandler<'a> {
    /// Apply the effective timeout and get ready to run.
    pub fn new(
        ctx: &StatementContext<'_>,
        conn: &'a dyn Connection,
        ms: &'a MappedStatement,
        bound_sql: &'a BoundSql,
    ) -> Self {
        conn.set_timeout(ctx.timeout(ms));
        Self {
            conn,
            ms,
            bound_sql,
        }
    }

    pub fn sql(&self) -> &str {
        self.bound_sql.sql()
    }

    /// Positional parameter values in placeholder order.
    pub fn parameters(&self) -> Vec<Value> {
        let values = self.bound_sql.parameter_values();
        tracing::trace!(sql = %self.bound_sql.sql(), params = values.len(), "Binding parameters");
        values
    }

    /// Run a mutation and return the affected row count.
    ///
    /// Callable statements write OUT values back into `parameter`. INSERTs
    /// with a key property receive the generated key there.
    pub fn update(&self, handle: StatementHandle<'_>, parameter: &mut Value) -> Result<i64> {
        let params = self.parameters();
        if self.ms.statement_type() == StatementType::Callable {
            let result = self.call(&params, parameter)?;
            return Ok(result.update_count as i64);
        }
        if let (SqlCommandType::Insert, Some(key_property)) =
            (self.ms.command_type(), self.ms.key_property())
        {
            let (count, id) = self.conn.insert_with_count(self.sql(), &params)?;
            tracing::debug!(statement = %self.ms.id(), key_property, id, "Assigning generated key");
            set_property(parameter, key_property, Value::BigInt(id))?;
            return Ok(count as i64);
        }
        let count = match handle {
            StatementHandle::Text(sql) => self.conn.execute(sql, &params)?,
            StatementHandle::Prepared(stmt) => self.conn.execute_prepared(stmt, &params)?,
        };
        Ok(count as i64)
    }

    /// Run a query and return its raw rows.
    pub fn query(&self, handle: StatementHandle<'_>, parameter: &mut Value) -> Result<Vec<Row>> {
        let params = self.parameters();
        if self.ms.statement_type() == StatementType::Callable {
            return Ok(self.call(&params, parameter)?.rows);
        }
        match handle {
            StatementHandle::Text(sql) => self.conn.query(sql, &params),
            StatementHandle::Prepared(stmt) => self.conn.query_prepared(stmt, &params),
        }
    }

    /// Open a row stream.
    pub fn query_stream(&self) -> Result<RowStream> {
        let params = self.parameters();
        self.conn.query_stream(self.sql(), &params)
    }

    fn call(&self, params: &[Value], parameter: &mut Value) -> Result<CallResult> {
        let mappings = self.bound_sql.parameter_mappings();
        let modes: Vec<ParameterMode> = mappings.iter().map(|m| m.mode).collect();
        let mut result = self.conn.call(self.sql(), params, &modes)?;
        let out_values = std::mem::take(&mut result.out_values);
        for (mapping, value) in mappings.iter().zip(out_values) {
            if mapping.mode.is_output() {
                tracing::trace!(property = %mapping.property, "Writing output parameter");
                set_property(parameter, &mapping.property, value)?;
            }
        }
        Ok(result)
    }
}
