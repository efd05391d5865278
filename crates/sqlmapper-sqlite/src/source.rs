//! Data sources handing SQLite connections to transactions.

use crate::connection::{SqliteConfig, SqliteConnection};
use sqlmapper_core::{Connection, DataSource, Result};
use std::sync::{Arc, Mutex, PoisonError};

/// A [`DataSource`] over one SQLite database.
///
/// File databases open a fresh connection per request. An in-memory
/// database exists only inside its connection, so every request for one
/// shares the same connection.
#[derive(Debug)]
pub struct SqliteDataSource {
    config: SqliteConfig,
    shared: Mutex<Option<Arc<SqliteConnection>>>,
}

impl SqliteDataSource {
    pub fn new(config: SqliteConfig) -> Self {
        Self {
            config,
            shared: Mutex::new(None),
        }
    }

    pub fn memory() -> Self {
        Self::new(SqliteConfig::memory())
    }

    pub fn file(path: impl Into<String>) -> Self {
        Self::new(SqliteConfig::file(path))
    }

    /// Hand out `conn` for every request.
    pub fn shared(conn: Arc<SqliteConnection>) -> Self {
        Self {
            config: SqliteConfig::file(conn.path()),
            shared: Mutex::new(Some(conn)),
        }
    }

    pub fn config(&self) -> &SqliteConfig {
        &self.config
    }

    /// Open (or reuse) a connection with its concrete type, e.g. to run DDL.
    pub fn sqlite_connection(&self) -> Result<Arc<SqliteConnection>> {
        let mut shared = self.shared.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(conn) = shared.as_ref() {
            return Ok(Arc::clone(conn));
        }
        let conn = Arc::new(SqliteConnection::open(&self.config)?);
        if self.config.is_memory() {
            *shared = Some(Arc::clone(&conn));
        }
        Ok(conn)
    }
}

impl DataSource for SqliteDataSource {
    fn connection(&self) -> Result<Arc<dyn Connection>> {
        let conn: Arc<dyn Connection> = self.sqlite_connection()?;
        Ok(conn)
    }
}
