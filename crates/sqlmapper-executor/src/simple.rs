//! One fresh statement per call.

use crate::base::BaseExecutor;
use crate::cursor::Cursor;
use crate::executor::BatchResult;
use crate::result_set::{ResultSetHandler, RowMapper};
use crate::statement_handler::{StatementHandle, StatementHandler};
use crate::strategy::{StatementContext, StatementStrategy};
use sqlmapper_core::{
    BoundSql, MappedStatement, ResultHandler, ResultObject, Result, RowBounds, Value,
};

/// Executes every statement directly; nothing is buffered or retained.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleStrategy;

pub type SimpleExecutor = BaseExecutor<SimpleStrategy>;

impl StatementStrategy for SimpleStrategy {
    const NAME: &'static str = "simple";

    fn do_update(
        &self,
        ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<i64> {
        let conn = ctx.connection()?;
        let bound_sql = ms.bound_sql(parameter);
        let handler = StatementHandler::new(ctx, conn.as_ref(), ms, &bound_sql);
        let count = handler.update(StatementHandle::Text(bound_sql.sql()), parameter)?;
        tracing::debug!(statement = %ms.id(), count, "Executed update");
        Ok(count)
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
        let rows = StatementHandler::new(ctx, conn.as_ref(), ms, bound_sql)
            .query(StatementHandle::Text(bound_sql.sql()), parameter)?;
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
        _ctx: &StatementContext<'_>,
        _is_rollback: bool,
    ) -> Result<Vec<BatchResult>> {
        Ok(Vec::new())
    }
}
