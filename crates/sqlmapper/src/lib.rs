//! SQLMapper Rust - a statement-mapping execution engine.
//!
//! Mapper interfaces are declared as data and bound to SQL statements
//! registered in a [`Configuration`]. Calls go through a [`MapperProxy`],
//! which resolves each method once, turns its arguments into a parameter
//! object, and runs the statement on a session's executor. Executors keep a
//! session-scoped cache so repeated reads inside one unit of work hit the
//! backend once.
//!
//! This crate re-exports the workspace crates:
//!
//! - `sqlmapper-core`: values, errors, statements, result maps, configuration
//! - `sqlmapper-executor`: the executor strategies and session cache
//! - `sqlmapper-binding`: mapper interfaces, proxies and sessions
//! - `sqlmapper-macros`: `#[derive(Mapped)]`
//! - `sqlmapper-sqlite`: the SQLite backend
//!
//! # Quick Start
//!
//! ```ignore
//! use sqlmapper::prelude::*;
//!
//! #[derive(Mapped, Debug)]
//! struct User {
//!     id: i64,
//!     name: String,
//! }
//!
//! let mut config = Configuration::default();
//! let user = config.register_record::<User>();
//! config.add_statement(
//!     MappedStatement::builder("app.UserMapper.find", SqlCommandType::Select,
//!         "SELECT id, name FROM users WHERE id = #{id}")
//!         .result_map(ResultMap::record("User", user))
//!         .build()?,
//! );
//!
//! let source = Arc::new(SqliteDataSource::memory());
//! let mut factory = SqlSessionFactory::new(config, source);
//! factory.add_mapper(
//!     MapperInterface::new("app.UserMapper")
//!         .method(MethodDecl::new("find", TypeRef::record("User")).param(ParamDecl::named("id"))),
//! )?;
//!
//! let session = factory.open_session();
//! let users = session.get_mapper("app.UserMapper")?;
//! let user: User = users.call("find", vec![Arg::value(1)])?.get()?;
//! session.commit(false)?;
//! ```

pub use sqlmapper_core::{
    BindingErrorKind, BoundSql, CollectingHandler, Configuration, Connection, DataSource,
    Environment, Error, ExecutorErrorKind, ExecutorType, FromValue, IsolationLevel,
    LocalCacheScope, ManagedTransaction, Mapped, MappedStatement, ObjectFactory, ParameterMode,
    QueryErrorKind, RecordType, Result, ResultContext, ResultHandler, ResultHandlerRef, ResultMap,
    Row, RowBounds, ScalarType, Settings, SqlCommandType, StatementType, ToValue, Transaction,
    TypeRef, Value, get_property, set_property,
};

pub use sqlmapper_executor::{BATCH_UPDATE_RETURN_VALUE, BatchResult, CacheKey, Cursor, Executor, new_executor};

pub use sqlmapper_binding::{
    Arg, MapperInterface, MapperProxy, MethodDecl, MethodResult, ParamDecl, SqlSession,
    SqlSessionFactory,
};

pub use sqlmapper_macros::Mapped;

pub use sqlmapper_sqlite::{SqliteConfig, SqliteConnection, SqliteDataSource};

/// The workspace crates, for items not re-exported at the top level.
pub mod crates {
    pub use sqlmapper_binding as binding;
    pub use sqlmapper_core as core;
    pub use sqlmapper_executor as executor;
    pub use sqlmapper_sqlite as sqlite;
}

/// Everything needed to declare mappers and run them.
///
/// ```ignore
/// use sqlmapper::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        Arg, Configuration, Error, ExecutorType, FromValue, MapperInterface, MapperProxy, Mapped,
        MappedStatement, MethodDecl, MethodResult, ParamDecl, Result, ResultMap, RowBounds,
        ScalarType, Settings, SqlCommandType, SqlSession, SqlSessionFactory, SqliteDataSource,
        ToValue, TypeRef, Value,
    };
    pub use std::sync::Arc;
}
