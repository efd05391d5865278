//! The executor contract shared by every strategy.

use crate::cache_key::CacheKey;
use crate::cursor::Cursor;
use sqlmapper_core::{
    BoundSql, MappedStatement, ResultHandler, ResultObject, Result, RowBounds, Transaction,
    TypeRef, Value,
};
use std::sync::{Arc, Weak};

/// Update count reported for statements buffered by the batch strategy.
pub const BATCH_UPDATE_RETURN_VALUE: i64 = i32::MIN as i64 + 1002;

/// The outcome of one flushed statement group.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub statement_id: String,
    pub sql: String,
    /// Parameter values, one entry per buffered execution.
    pub parameters: Vec<Vec<Value>>,
    /// Affected rows, one entry per buffered execution.
    pub update_counts: Vec<u64>,
}

/// Runs mapped statements for one unit of work.
///
/// An executor is `OPEN` until [`Executor::close`], after which every
/// operation except [`Executor::is_closed`] fails. Instances are not meant to
/// be driven from several threads at once; callers serialize access.
pub trait Executor: Send + Sync {
    /// Run an INSERT, UPDATE or DELETE. The session cache is cleared first.
    fn update(&self, ms: &Arc<MappedStatement>, parameter: &mut Value) -> Result<i64>;

    /// Run a query, deriving its cache key from the statement and parameter.
    fn query(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<ResultObject>>;

    /// Run a query under a precomputed cache key and rendered SQL.
    fn query_with_key(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        key: &CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<ResultObject>>;

    /// Stream a query's rows. The session cache is not consulted.
    fn query_cursor(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Cursor>;

    /// Submit buffered statements.
    fn flush_statements(&self) -> Result<Vec<BatchResult>>;

    fn commit(&self, required: bool) -> Result<()>;

    fn rollback(&self, required: bool) -> Result<()>;

    fn create_cache_key(
        &self,
        ms: &MappedStatement,
        parameter: &Value,
        bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<CacheKey>;

    /// Is the key cached or in flight?
    fn is_cached(&self, ms: &MappedStatement, key: &CacheKey) -> bool;

    fn clear_local_cache(&self);

    /// Assign a nested query's result into `owner.property`, now if the key
    /// is cached, otherwise once the outermost query finishes.
    fn defer_load(
        &self,
        ms: &MappedStatement,
        owner: &ResultObject,
        property: &str,
        key: &CacheKey,
        target: &TypeRef,
    ) -> Result<()>;

    fn transaction(&self) -> Result<Arc<dyn Transaction>>;

    /// Roll back (when forced) and release the transaction. Never fails;
    /// calling it again is a no-op.
    fn close(&self, force_rollback: bool);

    fn is_closed(&self) -> bool;

    /// Route nested queries through an outer executor.
    fn set_executor_wrapper(&self, wrapper: Weak<dyn Executor>);
}
