//! The hooks that distinguish executor strategies.

use crate::cursor::Cursor;
use crate::executor::{BatchResult, Executor};
use sqlmapper_core::{
    BoundSql, Configuration, Connection, MappedStatement, ResultHandler, ResultObject, Result,
    RowBounds, Transaction, Value,
};
use std::sync::Arc;

/// What a strategy hook may touch while running a statement.
pub struct StatementContext<'a> {
    pub configuration: &'a Configuration,
    pub transaction: Arc<dyn Transaction>,
    /// The executor nested selects go through. This is the outer wrapper
    /// when one is installed.
    pub executor: &'a dyn Executor,
}

impl StatementContext<'_> {
    pub fn connection(&self) -> Result<Arc<dyn Connection>> {
        self.transaction.connection()
    }

    /// Statement timeout in seconds. A shorter transaction timeout wins.
    pub fn timeout(&self, ms: &MappedStatement) -> Option<u64> {
        let statement = ms
            .timeout()
            .or(self.configuration.settings().default_statement_timeout)
            .filter(|t| *t > 0);
        match (statement, self.transaction.timeout()) {
            (Some(s), Some(t)) if t < s => Some(t),
            (None, Some(t)) => Some(t),
            (s, _) => s,
        }
    }
}

/// Physical statement execution. [`crate::BaseExecutor`] owns caching,
/// nesting depth and lifecycle; a strategy only decides how statements reach
/// the backend.
pub trait StatementStrategy: Send + Sync + 'static {
    /// Short name used in logs.
    const NAME: &'static str;

    fn do_update(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<i64>;

    fn do_query(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        bound_sql: &BoundSql,
    ) -> Result<Vec<ResultObject>>;

    fn do_query_cursor(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &Value,
        bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<Cursor>;

    fn do_flush_statements(
        &self,
        ctx: &StatementContext<'_>,
        is_rollback: bool,
    ) -> Result<Vec<BatchResult>>;
}
