//! Core types and traits for SQLMapper Rust.
//!
//! This crate holds the vocabulary shared by the executor and the mapper
//! binding layer:
//!
//! - `Value` and `Row` for data flowing to and from the backend
//! - `Connection`, `Transaction` and `DataSource` contracts for drivers
//! - `MappedStatement`, `BoundSql` and `ResultMap` for registered statements
//! - `Configuration` and `Settings` for the statement registry
//! - `Mapped` for typed records, usually derived

pub mod config;
pub mod connection;
pub mod error;
pub mod handler;
pub mod property;
pub mod result_map;
pub mod row;
pub mod statement;
pub mod transaction;
pub mod types;
pub mod value;

pub use config::{
    Configuration, DefaultObjectFactory, Environment, ExecutorType, LocalCacheScope,
    ObjectFactory, Settings,
};
pub use connection::{CallResult, Connection, IsolationLevel, PreparedStatement, RowStream};
pub use error::{
    BindingError, BindingErrorKind, ConfigError, ConnectionError, ConnectionErrorKind, Error,
    ExecutorError, ExecutorErrorKind, QueryError, QueryErrorKind, Result, TransactionError,
    TransactionErrorKind, TypeError,
};
pub use handler::{CollectingHandler, ResultContext, ResultHandler, ResultHandlerRef, RowBounds};
pub use property::{
    Mapped, RecordType, ResultObject, get_property, has_property, read_property, record_fields,
    set_property,
};
pub use result_map::{ResultMap, ResultMapping, ResultType};
pub use row::{ColumnInfo, FromValue, Row, ToValue};
pub use statement::{
    BoundSql, MappedStatement, MappedStatementBuilder, ParameterMapping, ParameterMode,
    SqlCommandType, SqlSource, StatementType,
};
pub use transaction::{DataSource, ManagedTransaction, Transaction};
pub use types::{ScalarType, TypeRef};
pub use value::Value;
