//! Prepared statements reused by SQL text.

use crate::base::BaseExecutor;
use crate::cursor::Cursor;
use crate::executor::BatchResult;
use crate::result_set::{ResultSetHandler, RowMapper};
use crate::statement_handler::{StatementHandle, StatementHandler};
use crate::strategy::{StatementContext, StatementStrategy};
use sqlmapper_core::{
    BoundSql, Connection, MappedStatement, PreparedStatement, ResultHandler, ResultObject, Result,
    RowBounds, Value,
};
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

/// Keeps one prepared handle per distinct SQL text until the next flush.
#[derive(Debug, Default)]
pub struct ReuseStrategy {
    statements: Mutex<HashMap<String, PreparedStatement>>,
}

pub type ReuseExecutor = BaseExecutor<ReuseStrategy>;

impl ReuseStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of prepared handles currently held.
    pub fn cached_statements(&self) -> usize {
        self.statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn prepare(&self, conn: &dyn Connection, sql: &str) -> Result<PreparedStatement> {
        let mut statements = self
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(stmt) = statements.get(sql) {
            tracing::trace!(sql, "Reusing prepared statement");
            return Ok(stmt.clone());
        }
        let stmt = conn.prepare(sql)?;
        tracing::debug!(sql, id = stmt.id(), "Prepared statement");
        statements.insert(sql.to_string(), stmt.clone());
        Ok(stmt)
    }
}

impl StatementStrategy for ReuseStrategy {
    const NAME: &'static str = "reuse";

    fn do_update(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<i64> {
        let conn = ctx.connection()?;
        let bound_sql = ms.bound_sql(parameter);
        let stmt = self.prepare(conn.as_ref(), bound_sql.sql())?;
        StatementHandler::new(ctx, conn.as_ref(), ms, &bound_sql)
            .update(StatementHandle::Prepared(&stmt), parameter)
    }

    fn do_query(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        bound_sql: &BoundSql,
    ) -> Result<Vec<ResultObject>> {
        let conn = ctx.connection()?;
        let stmt = self.prepare(conn.as_ref(), bound_sql.sql())?;
        let rows = StatementHandler::new(ctx, conn.as_ref(), ms, bound_sql)
            .query(StatementHandle::Prepared(&stmt), parameter)?;
        ResultSetHandler::new(ctx, ms, bounds).handle_rows(rows, handler)
    }

    fn do_query_cursor(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        _parameter: &Value,
        bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<Cursor> {
        let conn = ctx.connection()?;
        let rows = StatementHandler::new(ctx, conn.as_ref(), ms, bound_sql).query_stream()?;
        Ok(Cursor::new(rows, RowMapper::new(ctx.configuration, ms), bounds))
    }

    fn do_flush_statements(
        &self,
        ctx: &StatementContext<'_>,
        _is_rollback: bool,
    ) -> Result<Vec<BatchResult>> {
        let statements: Vec<PreparedStatement> = self
            .statements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, stmt)| stmt)
            .collect();
        if statements.is_empty() {
            return Ok(Vec::new());
        }
        tracing::debug!(count = statements.len(), "Closing reused statements");
        let conn = ctx.connection()?;
        for stmt in &statements {
            conn.close_statement(stmt)?;
        }
        Ok(Vec::new())
    }
}
