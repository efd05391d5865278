//! Transaction and data-source contracts.

use crate::connection::{Connection, IsolationLevel};
use crate::error::{Error, TransactionError, TransactionErrorKind};
use crate::Result;
use std::sync::{Arc, Mutex, PoisonError};

/// Hands out backend connections.
pub trait DataSource: Send + Sync {
    fn connection(&self) -> Result<Arc<dyn Connection>>;
}

/// A unit-of-work transaction wrapping one backend connection.
pub trait Transaction: Send + Sync {
    /// The connection bound to this transaction, opened on first use.
    fn connection(&self) -> Result<Arc<dyn Connection>>;

    fn commit(&self) -> Result<()>;

    fn rollback(&self) -> Result<()>;

    /// Release the connection. Uncommitted work is rolled back.
    fn close(&self) -> Result<()>;

    /// Transaction-level statement timeout in seconds.
    fn timeout(&self) -> Option<u64>;
}

struct ManagedState {
    connection: Option<Arc<dyn Connection>>,
    active: bool,
    closed: bool,
}

/// A transaction that opens its connection lazily from a [`DataSource`].
///
/// Unless auto-commit is requested, a backend transaction is begun before the
/// connection is handed out, and again after each commit or rollback.
pub struct ManagedTransaction {
    data_source: Arc<dyn DataSource>,
    isolation: Option<IsolationLevel>,
    auto_commit: bool,
    timeout: Option<u64>,
    state: Mutex<ManagedState>,
}

impl ManagedTransaction {
    pub fn new(data_source: Arc<dyn DataSource>, auto_commit: bool) -> Self {
        Self {
            data_source,
            isolation: None,
            auto_commit,
            timeout: None,
            state: Mutex::new(ManagedState {
                connection: None,
                active: false,
                closed: false,
            }),
        }
    }

    /// Set the isolation level used when beginning backend transactions.
    pub fn with_isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    /// Set the transaction-level statement timeout.
    pub fn with_timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn is_auto_commit(&self) -> bool {
        self.auto_commit
    }

    fn closed_error() -> Error {
        Error::Transaction(TransactionError {
            kind: TransactionErrorKind::Closed,
            message: "Transaction is already closed".to_string(),
        })
    }
}

impl Transaction for ManagedTransaction {
    fn connection(&self) -> Result<Arc<dyn Connection>> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(Self::closed_error());
        }
        let conn = if let Some(conn) = state.connection.clone() {
            conn
        } else {
            tracing::debug!("Opening connection");
            let conn = self.data_source.connection()?;
            state.connection = Some(Arc::clone(&conn));
            conn
        };
        if !self.auto_commit && !state.active {
            conn.begin_with(self.isolation.unwrap_or_default())?;
            state.active = true;
        }
        Ok(conn)
    }

    fn commit(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(Self::closed_error());
        }
        if let (Some(conn), true) = (state.connection.clone(), state.active) {
            tracing::debug!("Committing connection");
            conn.commit()?;
            state.active = false;
        }
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Err(Self::closed_error());
        }
        if let (Some(conn), true) = (state.connection.clone(), state.active) {
            tracing::debug!("Rolling back connection");
            conn.rollback()?;
            state.active = false;
        }
        Ok(())
    }

    fn close(&self) -> Result<()> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state.closed {
            return Ok(());
        }
        state.closed = true;
        let conn = state.connection.take();
        if let (Some(conn), true) = (conn, state.active) {
            state.active = false;
            tracing::debug!("Closing connection with an open transaction; rolling back");
            conn.rollback()?;
        }
        Ok(())
    }

    fn timeout(&self) -> Option<u64> {
        self.timeout
    }
}
