//! Backend connection contract.
//!
//! All calls are synchronous and blocking. Executors are affined to one
//! unit of work and never share a connection between threads concurrently,
//! but the trait still requires `Send + Sync` so connections can sit behind
//! an `Arc` owned by a transaction.

use crate::error::{Error, QueryError, QueryErrorKind};
use crate::row::Row;
use crate::statement::ParameterMode;
use crate::value::Value;
use crate::Result;

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IsolationLevel {
    ReadUncommitted,
    #[default]
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    /// Get the SQL syntax for this isolation level.
    #[must_use]
    pub const fn as_sql(&self) -> &'static str {
        match self {
            IsolationLevel::ReadUncommitted => "READ UNCOMMITTED",
            IsolationLevel::ReadCommitted => "READ COMMITTED",
            IsolationLevel::RepeatableRead => "REPEATABLE READ",
            IsolationLevel::Serializable => "SERIALIZABLE",
        }
    }
}

/// A prepared statement handle.
#[derive(Debug, Clone)]
pub struct PreparedStatement {
    /// Driver-specific identifier
    id: u64,
    sql: String,
    param_count: usize,
}

impl PreparedStatement {
    /// Create a new prepared statement. Called by drivers.
    #[must_use]
    pub fn new(id: u64, sql: String, param_count: usize) -> Self {
        Self {
            id,
            sql,
            param_count,
        }
    }

    #[must_use]
    pub const fn id(&self) -> u64 {
        self.id
    }

    #[must_use]
    pub fn sql(&self) -> &str {
        &self.sql
    }

    #[must_use]
    pub const fn param_count(&self) -> usize {
        self.param_count
    }
}

/// A stream of rows pulled lazily from the backend.
pub type RowStream = Box<dyn Iterator<Item = Result<Row>> + Send>;

/// The outcome of a callable statement.
#[derive(Debug, Clone, Default)]
pub struct CallResult {
    /// Rows produced by the call, if any.
    pub rows: Vec<Row>,
    /// Rows affected by the call.
    pub update_count: u64,
    /// One entry per bound parameter. Entries at OUT/INOUT positions carry
    /// the value reported by the backend.
    pub out_values: Vec<Value>,
}

/// A database connection.
pub trait Connection: Send + Sync {
    /// Run a query and return all rows.
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>>;

    /// Run a query and stream its rows.
    fn query_stream(&self, sql: &str, params: &[Value]) -> Result<RowStream> {
        let rows = self.query(sql, params)?;
        Ok(Box::new(rows.into_iter().map(Ok)))
    }

    /// Run a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64>;

    /// Run an INSERT and return the generated row id.
    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64>;

    /// Run an INSERT and return `(affected rows, generated row id)`.
    fn insert_with_count(&self, sql: &str, params: &[Value]) -> Result<(u64, i64)> {
        let id = self.insert(sql, params)?;
        Ok((1, id))
    }

    /// Run several statements, returning one update count per statement.
    fn batch(&self, statements: &[(String, Vec<Value>)]) -> Result<Vec<u64>> {
        statements
            .iter()
            .map(|(sql, params)| self.execute(sql, params))
            .collect()
    }

    /// Prepare a statement for repeated execution.
    fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        Ok(PreparedStatement::new(
            0,
            sql.to_string(),
            sql.matches('?').count(),
        ))
    }

    fn query_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<Vec<Row>> {
        self.query(stmt.sql(), params)
    }

    fn execute_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<u64> {
        self.execute(stmt.sql(), params)
    }

    /// Release a prepared statement.
    fn close_statement(&self, _stmt: &PreparedStatement) -> Result<()> {
        Ok(())
    }

    /// Run a callable statement with IN/OUT parameters.
    fn call(&self, sql: &str, _params: &[Value], _modes: &[ParameterMode]) -> Result<CallResult> {
        Err(Error::Query(QueryError {
            kind: QueryErrorKind::Unsupported,
            sql: Some(sql.to_string()),
            message: "callable statements are not supported by this connection".to_string(),
            source: None,
        }))
    }

    /// Begin a backend transaction with the default isolation level.
    fn begin(&self) -> Result<()> {
        self.begin_with(IsolationLevel::default())
    }

    fn begin_with(&self, isolation: IsolationLevel) -> Result<()>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Apply a statement timeout in seconds. `None` clears it.
    fn set_timeout(&self, _seconds: Option<u64>) {}
}
