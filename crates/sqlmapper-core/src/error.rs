//! Error types for SQLMapper operations.

use std::fmt;

/// The primary error type for all SQLMapper operations.
#[derive(Debug)]
pub enum Error {
    /// Connection-related errors (open, lost connection)
    Connection(ConnectionError),
    /// Errors reported by the backend while running a statement
    Query(QueryError),
    /// Value conversion errors
    Type(TypeError),
    /// Transaction boundary errors
    Transaction(TransactionError),
    /// Mapper binding errors (bad registration, bad method shape, missing parameter)
    Binding(BindingError),
    /// Executor lifecycle and result-shape errors
    Executor(ExecutorError),
    /// Configuration errors
    Config(ConfigError),
    /// I/O errors
    Io(std::io::Error),
    /// Serialization/deserialization errors
    Serde(String),
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct ConnectionError {
    pub kind: ConnectionErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionErrorKind {
    /// Failed to establish connection
    Connect,
    /// Connection lost during operation
    Disconnected,
    /// The data source has no connection to hand out
    Unavailable,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// Syntax error in SQL
    Syntax,
    /// Constraint violation (unique, foreign key, etc.)
    Constraint,
    /// Table or column not found
    NotFound,
    /// Permission denied
    Permission,
    /// Database is busy or locked (retry may succeed)
    Busy,
    /// Statement timeout
    Timeout,
    /// The backend does not support the requested operation
    Unsupported,
    /// Other database error
    Database,
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
    pub rust_type: Option<&'static str>,
}

#[derive(Debug)]
pub struct TransactionError {
    pub kind: TransactionErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionErrorKind {
    /// The transaction was already closed
    Closed,
    /// Commit or rollback without an active backend transaction
    NotActive,
    /// A backend transaction is already active
    AlreadyActive,
}

/// A mapper binding failure. These are never retried.
#[derive(Debug)]
pub struct BindingError {
    pub kind: BindingErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingErrorKind {
    /// No statement is registered under the resolved id
    StatementNotFound,
    /// The registered statement has an UNKNOWN command type
    UnknownCommand,
    /// More than one row-bounds or result-handler parameter on a method
    DuplicateSpecialParameter,
    /// The same explicit parameter name is declared twice
    DuplicateParameterName,
    /// The declared return type cannot carry the result
    UnsupportedReturnType,
    /// A handler-driven query targets a statement without a concrete result type
    MissingResultType,
    /// A null result was produced for a primitive return type
    NullIntoPrimitive,
    /// A named parameter lookup failed
    ParameterNotFound,
    /// The interface declares no method with the requested name
    MethodNotFound,
    /// No mapper interface is registered under the requested name
    UnknownMapper,
    /// Arguments do not match the declared parameters
    InvalidArgument,
}

#[derive(Debug)]
pub struct ExecutorError {
    pub kind: ExecutorErrorKind,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutorErrorKind {
    /// Any operation on a closed executor
    Closed,
    /// A single-row read produced more than one row
    TooManyResults,
    /// A cache read hit a key whose query is still in flight
    PendingResult,
    /// A buffered batch failed while flushing
    Batch,
}

#[derive(Debug)]
pub struct ConfigError {
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl Error {
    /// Build a binding error.
    pub fn binding(kind: BindingErrorKind, message: impl Into<String>) -> Self {
        Error::Binding(BindingError {
            kind,
            message: message.into(),
        })
    }

    /// The error raised when a statement id is not registered.
    pub fn statement_not_found(id: &str) -> Self {
        Self::binding(
            BindingErrorKind::StatementNotFound,
            format!("Mapped statements collection does not contain value for {id}"),
        )
    }

    /// The error raised when a named parameter lookup misses.
    pub fn parameter_not_found<'a>(
        name: &str,
        available: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let keys: Vec<&str> = available.into_iter().collect();
        Self::binding(
            BindingErrorKind::ParameterNotFound,
            format!(
                "Parameter '{}' not found. Available parameters are [{}]",
                name,
                keys.join(", ")
            ),
        )
    }

    /// The error raised by every operation on a closed executor.
    pub fn executor_closed() -> Self {
        Error::Executor(ExecutorError {
            kind: ExecutorErrorKind::Closed,
            message: "Executor was closed.".to_string(),
            source: None,
        })
    }

    /// Build an executor error without a source.
    pub fn executor(kind: ExecutorErrorKind, message: impl Into<String>) -> Self {
        Error::Executor(ExecutorError {
            kind,
            message: message.into(),
            source: None,
        })
    }

    /// Is this a retryable error (busy database, statement timeout)?
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Query(q) => matches!(q.kind, QueryErrorKind::Busy | QueryErrorKind::Timeout),
            _ => false,
        }
    }

    /// Is this a binding/configuration error?
    pub fn is_binding(&self) -> bool {
        matches!(self, Error::Binding(_))
    }

    /// The binding error kind, if this is a binding error.
    pub fn binding_kind(&self) -> Option<BindingErrorKind> {
        match self {
            Error::Binding(b) => Some(b.kind),
            _ => None,
        }
    }

    /// The executor error kind, if this is an executor error.
    pub fn executor_kind(&self) -> Option<ExecutorErrorKind> {
        match self {
            Error::Executor(e) => Some(e.kind),
            _ => None,
        }
    }

    /// Was this raised because the executor is closed?
    pub fn is_executor_closed(&self) -> bool {
        self.executor_kind() == Some(ExecutorErrorKind::Closed)
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Connection(e) => write!(f, "Connection error: {}", e.message),
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Transaction(e) => write!(f, "Transaction error: {}", e.message),
            Error::Binding(e) => write!(f, "{}", e.message),
            Error::Executor(e) => write!(f, "{}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Serde(msg) => write!(f, "Serialization error: {}", msg),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Connection(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Executor(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Config(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ExecutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serde(err.to_string())
    }
}

impl From<ConnectionError> for Error {
    fn from(err: ConnectionError) -> Self {
        Error::Connection(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<TransactionError> for Error {
    fn from(err: TransactionError) -> Self {
        Error::Transaction(err)
    }
}

impl From<BindingError> for Error {
    fn from(err: BindingError) -> Self {
        Error::Binding(err)
    }
}

impl From<ExecutorError> for Error {
    fn from(err: ExecutorError) -> Self {
        Error::Executor(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

/// Result type alias for SQLMapper operations.
pub type Result<T> = std::result::Result<T, Error>;
