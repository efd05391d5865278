//! Sessions: the statement-level API mapper methods call into.

use crate::interface::MapperInterface;
use crate::param_names::ParamMap;
use crate::proxy::{MapperProxy, MapperRegistry};
use sqlmapper_core::{
    Configuration, Connection, DataSource, Error, ExecutorErrorKind, ExecutorType,
    IsolationLevel, ManagedTransaction, MappedStatement, Result, ResultHandler, RowBounds, Value,
    get_property,
};
use sqlmapper_executor::{BatchResult, Cursor, Executor, new_executor};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// One unit of work over one executor.
///
/// Mutations mark the session dirty. Commit and rollback reach the
/// transaction when the session is not auto-committing and is dirty, or
/// when forced.
pub struct SqlSession {
    configuration: Arc<Configuration>,
    executor: Arc<dyn Executor>,
    mappers: Arc<MapperRegistry>,
    auto_commit: bool,
    dirty: AtomicBool,
}

impl SqlSession {
    pub fn new(
        configuration: Arc<Configuration>,
        executor: Arc<dyn Executor>,
        mappers: Arc<MapperRegistry>,
        auto_commit: bool,
    ) -> Self {
        Self {
            configuration,
            executor,
            mappers,
            auto_commit,
            dirty: AtomicBool::new(false),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn executor(&self) -> &Arc<dyn Executor> {
        &self.executor
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.load(Ordering::SeqCst)
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    /// Run a query expected to produce at most one row.
    pub fn select_one(&self, statement: &str, parameter: &mut Value) -> Result<Value> {
        let mut rows = self.select_list(statement, parameter, RowBounds::DEFAULT)?;
        match rows.len() {
            0 => Ok(Value::Null),
            1 => Ok(rows.swap_remove(0)),
            n => Err(Error::executor(
                ExecutorErrorKind::TooManyResults,
                format!(
                    "Expected one result (or null) to be returned by select_one(), but found: {n}"
                ),
            )),
        }
    }

    #[tracing::instrument(level = "debug", skip(self, parameter), fields(statement = %statement))]
    pub fn select_list(
        &self,
        statement: &str,
        parameter: &mut Value,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        let ms = self.configuration.mapped_statement(statement)?;
        let results = with_wrapped_collection(&ms, parameter, |param| {
            self.executor.query(&ms, param, bounds, None)
        })?;
        Ok(results.iter().map(|r| r.snapshot()).collect())
    }

    /// Run a query and key each row by one of its properties. Later rows
    /// replace earlier rows with the same key.
    pub fn select_map(
        &self,
        statement: &str,
        parameter: &mut Value,
        map_key: &str,
        bounds: RowBounds,
    ) -> Result<BTreeMap<String, Value>> {
        let rows = self.select_list(statement, parameter, bounds)?;
        let mut map = BTreeMap::new();
        for row in rows {
            let key = get_property(&row, map_key).unwrap_or(&Value::Null).to_string();
            map.insert(key, row);
        }
        Ok(map)
    }

    /// Open a cursor over a query. The session cache is not consulted.
    pub fn select_cursor(
        &self,
        statement: &str,
        parameter: &mut Value,
        bounds: RowBounds,
    ) -> Result<Cursor> {
        let ms = self.configuration.mapped_statement(statement)?;
        with_wrapped_collection(&ms, parameter, |param| {
            self.executor.query_cursor(&ms, param, bounds)
        })
    }

    /// Stream mapped rows through `handler`.
    pub fn select(
        &self,
        statement: &str,
        parameter: &mut Value,
        bounds: RowBounds,
        handler: &mut dyn ResultHandler,
    ) -> Result<()> {
        let ms = self.configuration.mapped_statement(statement)?;
        with_wrapped_collection(&ms, parameter, |param| {
            self.executor.query(&ms, param, bounds, Some(handler))
        })?;
        Ok(())
    }

    pub fn insert(&self, statement: &str, parameter: &mut Value) -> Result<i64> {
        self.update(statement, parameter)
    }

    #[tracing::instrument(level = "debug", skip(self, parameter), fields(statement = %statement))]
    pub fn update(&self, statement: &str, parameter: &mut Value) -> Result<i64> {
        self.dirty.store(true, Ordering::SeqCst);
        let ms = self.configuration.mapped_statement(statement)?;
        with_wrapped_collection(&ms, parameter, |param| self.executor.update(&ms, param))
    }

    pub fn delete(&self, statement: &str, parameter: &mut Value) -> Result<i64> {
        self.update(statement, parameter)
    }

    pub fn flush_statements(&self) -> Result<Vec<BatchResult>> {
        self.executor.flush_statements()
    }

    fn is_commit_or_rollback_required(&self, force: bool) -> bool {
        (!self.auto_commit && self.is_dirty()) || force
    }

    pub fn commit(&self, force: bool) -> Result<()> {
        self.executor.commit(self.is_commit_or_rollback_required(force))?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn rollback(&self, force: bool) -> Result<()> {
        self.executor.rollback(self.is_commit_or_rollback_required(force))?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    /// Close the executor, rolling back uncommitted changes.
    pub fn close(&self) {
        self.executor.close(self.is_commit_or_rollback_required(false));
        self.dirty.store(false, Ordering::SeqCst);
    }

    pub fn clear_cache(&self) {
        self.executor.clear_local_cache();
    }

    pub fn connection(&self) -> Result<Arc<dyn Connection>> {
        self.executor.transaction()?.connection()
    }

    /// A proxy for a registered mapper interface, bound to this session.
    pub fn get_mapper(self: &Arc<Self>, interface: &str) -> Result<MapperProxy> {
        let interface = self.mappers.get(interface)?;
        Ok(MapperProxy::new(Arc::clone(self), interface))
    }
}

impl std::fmt::Debug for SqlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSession")
            .field("auto_commit", &self.auto_commit)
            .field("dirty", &self.is_dirty())
            .field("closed", &self.executor.is_closed())
            .finish_non_exhaustive()
    }
}

/// Run `f` with a sole collection parameter wrapped into a named map.
///
/// The collection is reachable as `collection`, `list` and `array`, and
/// the statement may not name any other parameter. Whatever the statement
/// wrote into `list` is restored afterwards.
fn with_wrapped_collection<T>(
    ms: &MappedStatement,
    parameter: &mut Value,
    f: impl FnOnce(&mut Value) -> Result<T>,
) -> Result<T> {
    let Value::Array(items) = parameter else {
        return f(parameter);
    };
    let mut params = ParamMap::new();
    params.insert("collection", Value::Array(items.clone()));
    params.insert("list", Value::Array(items.clone()));
    params.insert("array", Value::Array(items.clone()));
    params.require(ms)?;
    let mut wrapped = params.into_value();
    let result = f(&mut wrapped);
    if let Value::Map(mut map) = wrapped {
        if let Some(list) = map.remove("list") {
            *parameter = list;
        }
    }
    result
}

/// Opens sessions over one data source.
pub struct SqlSessionFactory {
    configuration: Arc<Configuration>,
    data_source: Arc<dyn DataSource>,
    mappers: Arc<MapperRegistry>,
}

impl SqlSessionFactory {
    pub fn new(configuration: impl Into<Arc<Configuration>>, data_source: Arc<dyn DataSource>) -> Self {
        Self {
            configuration: configuration.into(),
            data_source,
            mappers: Arc::new(MapperRegistry::default()),
        }
    }

    pub fn configuration(&self) -> &Arc<Configuration> {
        &self.configuration
    }

    pub fn mappers(&self) -> &MapperRegistry {
        &self.mappers
    }

    /// Register a mapper interface. Sessions opened afterwards can bind it.
    pub fn add_mapper(&mut self, interface: MapperInterface) -> Result<()> {
        Arc::make_mut(&mut self.mappers).add(interface)
    }

    /// Open a session with the configured executor type, not auto-committing.
    pub fn open_session(&self) -> Arc<SqlSession> {
        self.open_session_with(self.configuration.settings().default_executor_type, false)
    }

    pub fn open_session_with(&self, executor_type: ExecutorType, auto_commit: bool) -> Arc<SqlSession> {
        let transaction = ManagedTransaction::new(Arc::clone(&self.data_source), auto_commit);
        self.open(transaction, executor_type, auto_commit)
    }

    pub fn open_session_with_isolation(&self, level: IsolationLevel) -> Arc<SqlSession> {
        let transaction = ManagedTransaction::new(Arc::clone(&self.data_source), false).with_isolation(level);
        self.open(transaction, self.configuration.settings().default_executor_type, false)
    }

    fn open(
        &self,
        transaction: ManagedTransaction,
        executor_type: ExecutorType,
        auto_commit: bool,
    ) -> Arc<SqlSession> {
        tracing::debug!(executor_type = %executor_type, auto_commit, "Opening session");
        let executor = new_executor(Arc::clone(&self.configuration), Arc::new(transaction), executor_type);
        Arc::new(SqlSession::new(
            Arc::clone(&self.configuration),
            executor,
            Arc::clone(&self.mappers),
            auto_commit,
        ))
    }
}

impl std::fmt::Debug for SqlSessionFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlSessionFactory")
            .field("configuration", &self.configuration)
            .field("mappers", &self.mappers)
            .finish_non_exhaustive()
    }
}
