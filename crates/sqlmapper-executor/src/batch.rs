//! Buffered updates submitted on flush.
//!
//! Consecutive updates that share a statement and SQL text join one group.
//! A query, commit or explicit flush submits every group in order; a
//! rollback discards them.

use crate::base::BaseExecutor;
use crate::cursor::Cursor;
use crate::executor::{BATCH_UPDATE_RETURN_VALUE, BatchResult};
use crate::result_set::{ResultSetHandler, RowMapper};
use crate::statement_handler::{StatementHandle, StatementHandler};
use crate::strategy::{StatementContext, StatementStrategy};
use sqlmapper_core::{
    BoundSql, Error, ExecutorError, ExecutorErrorKind, MappedStatement, ResultHandler,
    ResultObject, Result, RowBounds, Value,
};
use std::sync::{Mutex, MutexGuard, PoisonError};

#[derive(Debug)]
struct StatementGroup {
    statement_id: String,
    sql: String,
    parameters: Vec<Vec<Value>>,
}

/// Buffers updates until flushed.
#[derive(Debug, Default)]
pub struct BatchStrategy {
    groups: Mutex<Vec<StatementGroup>>,
}

pub type BatchExecutor = BaseExecutor<BatchStrategy>;

impl BatchStrategy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffered statement groups awaiting a flush.
    pub fn pending_groups(&self) -> usize {
        self.groups().len()
    }

    fn groups(&self) -> MutexGuard<'_, Vec<StatementGroup>> {
        self.groups.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StatementStrategy for BatchStrategy {
    const NAME: &'static str = "batch";

    fn do_update(
        &self,
        _ctx: &StatementContext<'_>,
        ms: &MappedStatement,
        parameter: &mut Value,
    ) -> Result<i64> {
        let bound_sql = ms.bound_sql(parameter);
        let params = bound_sql.parameter_values();
        let mut groups = self.groups();
        match groups.last_mut() {
            Some(group) if group.statement_id == ms.id() && group.sql == bound_sql.sql() => {
                group.parameters.push(params);
                tracing::trace!(statement = %ms.id(), size = group.parameters.len(), "Appended to batch group");
            }
            _ => {
                tracing::debug!(statement = %ms.id(), "Starting batch group");
                groups.push(StatementGroup {
                    statement_id: ms.id().to_string(),
                    sql: bound_sql.sql().to_string(),
                    parameters: vec![params],
                });
            }
        }
        Ok(BATCH_UPDATE_RETURN_VALUE)
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
        self.do_flush_statements(ctx, false)?;
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
        self.do_flush_statements(ctx, false)?;
        let conn = ctx.connection()?;
        let rows = StatementHandler::new(ctx, conn.as_ref(), ms, bound_sql).query_stream()?;
        Ok(Cursor::new(rows, RowMapper::new(ctx.configuration, ms), bounds))
    }

    fn do_flush_statements(
        &self,
        ctx: &StatementContext<'_>,
        is_rollback: bool,
    ) -> Result<Vec<BatchResult>> {
        let groups = std::mem::take(&mut *self.groups());
        if is_rollback {
            if !groups.is_empty() {
                tracing::debug!(groups = groups.len(), "Discarding buffered statements");
            }
            return Ok(Vec::new());
        }
        if groups.is_empty() {
            return Ok(Vec::new());
        }
        let conn = ctx.connection()?;
        let mut results = Vec::with_capacity(groups.len());
        for group in groups {
            let statements: Vec<(String, Vec<Value>)> = group
                .parameters
                .iter()
                .map(|params| (group.sql.clone(), params.clone()))
                .collect();
            let update_counts = conn.batch(&statements).map_err(|e| {
                Error::Executor(ExecutorError {
                    kind: ExecutorErrorKind::Batch,
                    message: format!(
                        "Error executing batch statement {} after {} successful group(s). Cause: {}",
                        group.statement_id,
                        results.len(),
                        e
                    ),
                    source: Some(Box::new(e)),
                })
            })?;
            results.push(BatchResult {
                statement_id: group.statement_id,
                sql: group.sql,
                parameters: group.parameters,
                update_counts,
            });
        }
        tracing::info!(
            groups = results.len(),
            statements = results.iter().map(|r| r.update_counts.len()).sum::<usize>(),
            "Flushed batch"
        );
        Ok(results)
    }
}
