//! The executor state machine shared by every strategy.
//!
//! `BaseExecutor` owns the session cache, the callable output-parameter
//! cache, the deferred-load queue and the nesting depth of in-progress
//! queries. Strategies only see a [`StatementContext`]. No lock is held
//! while a strategy runs, so result mapping may re-enter the executor for
//! nested selects.

use crate::cache::{CacheEntry, OutputParameterCache, PerpetualCache};
use crate::cache_key::CacheKey;
use crate::cursor::Cursor;
use crate::deferred::DeferredLoad;
use crate::executor::{BatchResult, Executor};
use crate::strategy::{StatementContext, StatementStrategy};
use sqlmapper_core::{
    BoundSql, Configuration, Error, ExecutorErrorKind, LocalCacheScope, MappedStatement,
    ParameterMode, ResultHandler, ResultObject, Result, RowBounds, StatementType, Transaction,
    TypeRef, Value, get_property, set_property,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

fn lock<T: ?Sized>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Tracks query nesting for the lifetime of one `query_with_key` call.
struct QueryDepth<'a>(&'a AtomicUsize);

impl<'a> QueryDepth<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for QueryDepth<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Removes an in-flight marker however the query ends.
struct PendingEntry<'a> {
    cache: &'a Mutex<PerpetualCache>,
    key: &'a CacheKey,
}

impl Drop for PendingEntry<'_> {
    fn drop(&mut self) {
        lock(self.cache).remove(self.key);
    }
}

/// Executor lifecycle plus caching, parameterized by a statement strategy.
pub struct BaseExecutor<S: StatementStrategy> {
    configuration: Arc<Configuration>,
    transaction: Arc<dyn Transaction>,
    strategy: S,
    local_cache: Mutex<PerpetualCache>,
    local_output_parameter_cache: Mutex<OutputParameterCache>,
    deferred_loads: Mutex<VecDeque<DeferredLoad>>,
    query_stack: AtomicUsize,
    closed: AtomicBool,
    wrapper: Mutex<Option<Weak<dyn Executor>>>,
}

impl<S: StatementStrategy> BaseExecutor<S> {
    pub fn new(configuration: Arc<Configuration>, transaction: Arc<dyn Transaction>, strategy: S) -> Self {
        Self {
            configuration,
            transaction,
            strategy,
            local_cache: Mutex::new(PerpetualCache::new("LocalCache")),
            local_output_parameter_cache: Mutex::new(OutputParameterCache::default()),
            deferred_loads: Mutex::new(VecDeque::new()),
            query_stack: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            wrapper: Mutex::new(None),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn strategy(&self) -> &S {
        &self.strategy
    }

    /// Entries currently held by the session cache, in-flight markers included.
    pub fn local_cache_size(&self) -> usize {
        lock(&self.local_cache).len()
    }

    /// Deferred loads waiting for the outermost query to finish.
    pub fn pending_deferred_loads(&self) -> usize {
        lock(&self.deferred_loads).len()
    }

    /// Nesting depth of queries currently running on this executor.
    pub fn query_depth(&self) -> usize {
        self.query_stack.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::executor_closed());
        }
        Ok(())
    }

    /// Run a strategy hook with the executor nested selects should use.
    fn with_context<T>(&self, f: impl FnOnce(&StatementContext<'_>) -> Result<T>) -> Result<T> {
        let wrapper = lock(&self.wrapper).as_ref().and_then(Weak::upgrade);
        let executor: &dyn Executor = match &wrapper {
            Some(outer) => outer.as_ref(),
            None => self,
        };
        let ctx = StatementContext {
            configuration: &self.configuration,
            transaction: Arc::clone(&self.transaction),
            executor,
        };
        f(&ctx)
    }

    fn flush(&self, is_rollback: bool) -> Result<Vec<BatchResult>> {
        self.with_context(|ctx| self.strategy.do_flush_statements(ctx, is_rollback))
    }

    fn query_from_database(
        &self,
        ms: &MappedStatement,
        parameter: &mut Value,
        bounds: RowBounds,
        key: &CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<ResultObject>> {
        lock(&self.local_cache).put_pending(key.clone());
        tracing::debug!(statement = %ms.id(), "Cache miss; querying database");
        let result = {
            let _pending = PendingEntry {
                cache: &self.local_cache,
                key,
            };
            self.with_context(|ctx| {
                self.strategy
                    .do_query(ctx, ms, parameter, bounds, None, bound_sql)
            })
        };
        let list = result?;
        lock(&self.local_cache).put(key.clone(), list.clone());
        if ms.statement_type() == StatementType::Callable {
            lock(&self.local_output_parameter_cache).put(key.clone(), parameter.clone());
        }
        Ok(list)
    }

    /// Copy cached OUT values of a callable statement into the caller's parameter.
    fn restore_output_parameters(
        &self,
        ms: &MappedStatement,
        key: &CacheKey,
        parameter: &mut Value,
        bound_sql: &BoundSql,
    ) -> Result<()> {
        if ms.statement_type() != StatementType::Callable {
            return Ok(());
        }
        let Some(cached) = lock(&self.local_output_parameter_cache).get(key).cloned() else {
            return Ok(());
        };
        for mapping in bound_sql.parameter_mappings() {
            if mapping.mode == ParameterMode::In {
                continue;
            }
            let value = get_property(&cached, &mapping.property)
                .cloned()
                .unwrap_or(Value::Null);
            set_property(parameter, &mapping.property, value)?;
        }
        Ok(())
    }

    fn drain_deferred_loads(&self) -> Result<()> {
        let loads = std::mem::take(&mut *lock(&self.deferred_loads));
        if loads.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = loads.len(), "Draining deferred loads");
        for load in loads {
            let entry = lock(&self.local_cache).lookup(load.key());
            load.load(&entry)?;
        }
        Ok(())
    }
}

impl<S: StatementStrategy> Executor for BaseExecutor<S> {
    #[tracing::instrument(level = "debug", skip(self, ms, parameter), fields(statement = %ms.id(), strategy = S::NAME))]
    fn update(&self, ms: &Arc<MappedStatement>, parameter: &mut Value) -> Result<i64> {
        self.ensure_open()?;
        self.clear_local_cache();
        self.with_context(|ctx| self.strategy.do_update(ctx, ms, parameter))
    }

    fn query(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<ResultObject>> {
        self.ensure_open()?;
        let bound_sql = ms.bound_sql(parameter);
        let key = self.create_cache_key(ms, parameter, bounds, &bound_sql)?;
        self.query_with_key(ms, parameter, bounds, handler, &key, &bound_sql)
    }

    #[tracing::instrument(level = "debug", skip_all, fields(statement = %ms.id(), depth = self.query_depth()))]
    fn query_with_key(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
        key: &CacheKey,
        bound_sql: &BoundSql,
    ) -> Result<Vec<ResultObject>> {
        self.ensure_open()?;
        if self.query_depth() == 0 && ms.is_flush_cache_required() {
            self.clear_local_cache();
        }
        let list = {
            let _depth = QueryDepth::enter(&self.query_stack);
            match handler {
                Some(handler) => {
                    tracing::debug!("Result handler supplied; bypassing session cache");
                    self.with_context(|ctx| {
                        self.strategy
                            .do_query(ctx, ms, parameter, bounds, Some(handler), bound_sql)
                    })?
                }
                None => {
                    let entry = lock(&self.local_cache).lookup(key);
                    match entry {
                        CacheEntry::Present(list) => {
                            tracing::debug!(rows = list.len(), "Session cache hit");
                            self.restore_output_parameters(ms, key, parameter, bound_sql)?;
                            list
                        }
                        CacheEntry::Pending => {
                            return Err(Error::executor(
                                ExecutorErrorKind::PendingResult,
                                format!(
                                    "Query for statement {} is still in progress under the same cache key",
                                    ms.id()
                                ),
                            ));
                        }
                        CacheEntry::Absent => {
                            self.query_from_database(ms, parameter, bounds, key, bound_sql)?
                        }
                    }
                }
            }
        };
        if self.query_depth() == 0 {
            self.drain_deferred_loads()?;
            if self.configuration.settings().local_cache_scope == LocalCacheScope::Statement {
                self.clear_local_cache();
            }
        }
        Ok(list)
    }

    fn query_cursor(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &Value,
        bounds: RowBounds,
    ) -> Result<Cursor> {
        self.ensure_open()?;
        let bound_sql = ms.bound_sql(parameter);
        tracing::debug!(statement = %ms.id(), "Opening cursor");
        self.with_context(|ctx| {
            self.strategy
                .do_query_cursor(ctx, ms, parameter, bounds, &bound_sql)
        })
    }

    #[tracing::instrument(level = "debug", skip(self), fields(strategy = S::NAME))]
    fn flush_statements(&self) -> Result<Vec<BatchResult>> {
        self.ensure_open()?;
        self.flush(false)
    }

    fn commit(&self, required: bool) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::executor(
                ExecutorErrorKind::Closed,
                "Cannot commit, transaction is already closed",
            ));
        }
        self.clear_local_cache();
        self.flush(false)?;
        if required {
            tracing::debug!("Committing transaction");
            self.transaction.commit()?;
        }
        Ok(())
    }

    fn rollback(&self, required: bool) -> Result<()> {
        self.ensure_open()?;
        self.clear_local_cache();
        let flushed = self.flush(true);
        if required {
            tracing::debug!("Rolling back transaction");
            self.transaction.rollback()?;
        }
        flushed.map(|_| ())
    }

    fn create_cache_key(
        &self,
        ms: &MappedStatement,
        _parameter: &Value,
        bounds: RowBounds,
        bound_sql: &BoundSql,
    ) -> Result<CacheKey> {
        self.ensure_open()?;
        let mut key = CacheKey::new();
        key.update(ms.id());
        key.update(bounds.offset);
        key.update(bounds.limit);
        key.update(bound_sql.sql());
        for mapping in bound_sql.parameter_mappings() {
            if mapping.mode != ParameterMode::Out {
                key.update(bound_sql.parameter_value(&mapping.property));
            }
        }
        if let Some(environment) = self.configuration.environment() {
            key.update(environment.id.as_str());
        }
        Ok(key)
    }

    fn is_cached(&self, _ms: &MappedStatement, key: &CacheKey) -> bool {
        if self.closed.load(Ordering::SeqCst) {
            return false;
        }
        !lock(&self.local_cache).lookup(key).is_absent()
    }

    fn clear_local_cache(&self) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        lock(&self.local_cache).clear();
        lock(&self.local_output_parameter_cache).clear();
    }

    fn defer_load(
        &self,
        _ms: &MappedStatement,
        owner: &ResultObject,
        property: &str,
        key: &CacheKey,
        target: &TypeRef,
    ) -> Result<()> {
        self.ensure_open()?;
        let load = DeferredLoad::new(
            owner.clone(),
            property,
            key.clone(),
            target.clone(),
            self.configuration.object_factory(),
        );
        let entry = lock(&self.local_cache).lookup(key);
        if DeferredLoad::can_load(&entry) {
            load.load(&entry)
        } else {
            tracing::debug!(property, "Queueing deferred load");
            lock(&self.deferred_loads).push_back(load);
            Ok(())
        }
    }

    fn transaction(&self) -> Result<Arc<dyn Transaction>> {
        self.ensure_open()?;
        Ok(Arc::clone(&self.transaction))
    }

    fn close(&self, force_rollback: bool) {
        if self.closed.load(Ordering::SeqCst) {
            return;
        }
        if let Err(e) = self.rollback(force_rollback) {
            tracing::warn!(error = %e, "Unexpected exception on closing transaction");
        }
        if let Err(e) = self.transaction.close() {
            tracing::warn!(error = %e, "Failed to close transaction");
        }
        lock(&self.local_cache).clear();
        lock(&self.local_output_parameter_cache).clear();
        lock(&self.deferred_loads).clear();
        *lock(&self.wrapper) = None;
        self.closed.store(true, Ordering::SeqCst);
        tracing::debug!(strategy = S::NAME, "Executor closed");
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn set_executor_wrapper(&self, wrapper: Weak<dyn Executor>) {
        *lock(&self.wrapper) = Some(wrapper);
    }
}
