//! SQLite connection implementation.
//!
//! Safe wrappers around SQLite's C API implementing the `Connection` trait
//! from sqlmapper-core. Prepared statements handed out by
//! [`Connection::prepare`] stay compiled until they are closed or the
//! connection is dropped.

// Allow casts in FFI code where we need to match C types exactly
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::borrow_as_ptr)]

use crate::types;
// libsqlite3-sys omits `sqlite3_close_v2` from its generated bindings, but the
// bundled SQLite library still exports it.
mod ffi {
    pub use libsqlite3_sys::*;

    unsafe extern "C" {
        pub fn sqlite3_close_v2(db: *mut sqlite3) -> std::ffi::c_int;
    }
}
use sqlmapper_core::{
    ColumnInfo, Connection, ConnectionError, ConnectionErrorKind, Error, IsolationLevel,
    PreparedStatement, QueryError, QueryErrorKind, Result, Row, TransactionError,
    TransactionErrorKind, Value,
};
use std::collections::HashMap;
use std::ffi::{CStr, CString, c_int};
use std::ptr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

pub const MEMORY_PATH: &str = ":memory:";

/// Configuration for opening SQLite connections.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// Path to the database file, or ":memory:" for in-memory database.
    pub path: String,
    pub flags: OpenFlags,
    /// Busy timeout in milliseconds.
    pub busy_timeout_ms: u32,
}

/// Flags controlling how the database is opened.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenFlags {
    pub read_only: bool,
    pub read_write: bool,
    /// Create the database if it doesn't exist.
    pub create: bool,
    /// Enable URI filename interpretation.
    pub uri: bool,
}

impl OpenFlags {
    pub fn read_only() -> Self {
        Self {
            read_only: true,
            ..Default::default()
        }
    }

    pub fn read_write() -> Self {
        Self {
            read_write: true,
            ..Default::default()
        }
    }

    pub fn create_read_write() -> Self {
        Self {
            read_write: true,
            create: true,
            ..Default::default()
        }
    }

    fn to_sqlite_flags(self) -> c_int {
        let mut flags = 0;
        if self.read_only {
            flags |= ffi::SQLITE_OPEN_READONLY;
        }
        if self.read_write {
            flags |= ffi::SQLITE_OPEN_READWRITE;
        }
        if self.create {
            flags |= ffi::SQLITE_OPEN_CREATE;
        }
        if self.uri {
            flags |= ffi::SQLITE_OPEN_URI;
        }

        // Default to read-write if no mode specified
        if flags & (ffi::SQLITE_OPEN_READONLY | ffi::SQLITE_OPEN_READWRITE) == 0 {
            flags |= ffi::SQLITE_OPEN_READWRITE | ffi::SQLITE_OPEN_CREATE;
        }
        flags
    }
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: MEMORY_PATH.to_string(),
            flags: OpenFlags::create_read_write(),
            busy_timeout_ms: 5000,
        }
    }
}

impl SqliteConfig {
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }

    pub fn memory() -> Self {
        Self::default()
    }

    pub fn flags(mut self, flags: OpenFlags) -> Self {
        self.flags = flags;
        self
    }

    pub fn busy_timeout(mut self, ms: u32) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    pub fn is_memory(&self) -> bool {
        self.path == MEMORY_PATH
    }
}

/// Inner state of the SQLite connection, protected by a mutex.
struct SqliteInner {
    db: *mut ffi::sqlite3,
    in_transaction: bool,
    statements: HashMap<u64, *mut ffi::sqlite3_stmt>,
    next_statement_id: u64,
}

// SAFETY: every use of the raw handles goes through the connection's Mutex.
unsafe impl Send for SqliteInner {}

/// A connection to a SQLite database.
pub struct SqliteConnection {
    inner: Mutex<SqliteInner>,
    path: String,
}

impl SqliteConnection {
    /// Open a new SQLite connection with the given configuration.
    pub fn open(config: &SqliteConfig) -> Result<Self> {
        let c_path = CString::new(config.path.as_str()).map_err(|_| {
            Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: "Invalid path: contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut db: *mut ffi::sqlite3 = ptr::null_mut();
        let flags = config.flags.to_sqlite_flags();

        // SAFETY: We pass valid pointers and check the return value
        let rc = unsafe { ffi::sqlite3_open_v2(c_path.as_ptr(), &mut db, flags, ptr::null()) };

        if rc != ffi::SQLITE_OK {
            let msg = if db.is_null() {
                error_string(rc)
            } else {
                // SAFETY: db is valid, errmsg returns a valid C string
                unsafe {
                    let msg = CStr::from_ptr(ffi::sqlite3_errmsg(db))
                        .to_string_lossy()
                        .into_owned();
                    ffi::sqlite3_close(db);
                    msg
                }
            };

            return Err(Error::Connection(ConnectionError {
                kind: ConnectionErrorKind::Connect,
                message: format!("Failed to open database: {}", msg),
                source: None,
            }));
        }

        if config.busy_timeout_ms > 0 {
            // SAFETY: db is valid
            unsafe {
                ffi::sqlite3_busy_timeout(db, c_int::try_from(config.busy_timeout_ms).unwrap_or(c_int::MAX));
            }
        }

        tracing::debug!(path = %config.path, "Opened SQLite database");
        Ok(Self {
            inner: Mutex::new(SqliteInner {
                db,
                in_transaction: false,
                statements: HashMap::new(),
                next_statement_id: 1,
            }),
            path: config.path.clone(),
        })
    }

    pub fn open_memory() -> Result<Self> {
        Self::open(&SqliteConfig::memory())
    }

    pub fn open_file(path: impl Into<String>) -> Result<Self> {
        Self::open(&SqliteConfig::file(path))
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, SqliteInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Execute SQL directly without preparing (DDL, multi-statement scripts).
    pub fn execute_raw(&self, sql: &str) -> Result<()> {
        let inner = self.lock();
        exec(inner.db, sql)
    }

    /// The rowid of the most recent successful INSERT.
    pub fn last_insert_rowid(&self) -> i64 {
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_last_insert_rowid(inner.db) }
    }

    /// Number of rows changed by the most recent statement.
    pub fn changes(&self) -> u64 {
        let inner = self.lock();
        // SAFETY: db is valid
        u64::try_from(unsafe { ffi::sqlite3_changes(inner.db) }).unwrap_or(0)
    }

    pub fn in_transaction(&self) -> bool {
        self.lock().in_transaction
    }

    /// Number of statements currently held open by `prepare`.
    pub fn open_statements(&self) -> usize {
        self.lock().statements.len()
    }

    fn query_sync(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        tracing::trace!(sql, params = params.len(), "SQLite query");
        let inner = self.lock();
        let stmt = Statement::prepare(inner.db, sql)?;
        read_rows(inner.db, stmt.0, sql, params)
    }

    fn execute_sync(inner: &SqliteInner, sql: &str, params: &[Value]) -> Result<u64> {
        tracing::trace!(sql, params = params.len(), "SQLite execute");
        let stmt = Statement::prepare(inner.db, sql)?;
        run_update(inner.db, stmt.0, sql, params)
    }

    fn prepared(inner: &SqliteInner, stmt: &PreparedStatement) -> Result<*mut ffi::sqlite3_stmt> {
        inner.statements.get(&stmt.id()).copied().ok_or_else(|| {
            Error::Query(QueryError {
                kind: QueryErrorKind::Database,
                sql: Some(stmt.sql().to_string()),
                message: format!("Prepared statement {} is not open", stmt.id()),
                source: None,
            })
        })
    }

    fn transaction_error(kind: TransactionErrorKind, message: &str) -> Error {
        Error::Transaction(TransactionError {
            kind,
            message: message.to_string(),
        })
    }
}

impl Connection for SqliteConnection {
    fn query(&self, sql: &str, params: &[Value]) -> Result<Vec<Row>> {
        self.query_sync(sql, params)
    }

    fn execute(&self, sql: &str, params: &[Value]) -> Result<u64> {
        Self::execute_sync(&self.lock(), sql, params)
    }

    fn insert(&self, sql: &str, params: &[Value]) -> Result<i64> {
        self.insert_with_count(sql, params).map(|(_, id)| id)
    }

    fn insert_with_count(&self, sql: &str, params: &[Value]) -> Result<(u64, i64)> {
        let inner = self.lock();
        let count = Self::execute_sync(&inner, sql, params)?;
        // SAFETY: db is valid; the lock keeps another insert from interleaving
        let id = unsafe { ffi::sqlite3_last_insert_rowid(inner.db) };
        Ok((count, id))
    }

    fn batch(&self, statements: &[(String, Vec<Value>)]) -> Result<Vec<u64>> {
        let inner = self.lock();
        let mut counts = Vec::with_capacity(statements.len());
        // consecutive runs of the same SQL share one compiled statement
        let mut current: Option<(&str, Statement)> = None;
        for (sql, params) in statements {
            if current.as_ref().is_none_or(|(last, _)| *last != sql.as_str()) {
                current = Some((sql.as_str(), Statement::prepare(inner.db, sql)?));
            }
            if let Some((_, stmt)) = &current {
                counts.push(run_update(inner.db, stmt.0, sql, params)?);
            }
        }
        tracing::debug!(statements = statements.len(), "SQLite batch executed");
        Ok(counts)
    }

    fn prepare(&self, sql: &str) -> Result<PreparedStatement> {
        let mut inner = self.lock();
        let stmt = Statement::prepare(inner.db, sql)?;
        // SAFETY: stmt is valid
        let param_count = unsafe { ffi::sqlite3_bind_parameter_count(stmt.0) };
        let id = inner.next_statement_id;
        inner.next_statement_id += 1;
        inner.statements.insert(id, stmt.into_raw());
        tracing::trace!(id, sql, "Prepared SQLite statement");
        Ok(PreparedStatement::new(
            id,
            sql.to_string(),
            usize::try_from(param_count).unwrap_or(0),
        ))
    }

    fn query_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<Vec<Row>> {
        let inner = self.lock();
        let raw = Self::prepared(&inner, stmt)?;
        let rows = read_rows(inner.db, raw, stmt.sql(), params);
        // SAFETY: raw is a live statement owned by this connection
        unsafe { reset(raw) };
        rows
    }

    fn execute_prepared(&self, stmt: &PreparedStatement, params: &[Value]) -> Result<u64> {
        let inner = self.lock();
        let raw = Self::prepared(&inner, stmt)?;
        let count = run_update(inner.db, raw, stmt.sql(), params);
        // SAFETY: raw is a live statement owned by this connection
        unsafe { reset(raw) };
        count
    }

    fn close_statement(&self, stmt: &PreparedStatement) -> Result<()> {
        if let Some(raw) = self.lock().statements.remove(&stmt.id()) {
            // SAFETY: raw was removed from the map, so nothing else finalizes it
            unsafe { ffi::sqlite3_finalize(raw) };
        }
        Ok(())
    }

    fn begin_with(&self, isolation: IsolationLevel) -> Result<()> {
        let mut inner = self.lock();
        if inner.in_transaction {
            return Err(Self::transaction_error(
                TransactionErrorKind::AlreadyActive,
                "Already in a transaction",
            ));
        }

        // SQLite has no isolation levels; approximate with transaction types
        let begin_sql = match isolation {
            IsolationLevel::Serializable => "BEGIN EXCLUSIVE",
            IsolationLevel::RepeatableRead | IsolationLevel::ReadCommitted => "BEGIN IMMEDIATE",
            IsolationLevel::ReadUncommitted => "BEGIN DEFERRED",
        };
        exec(inner.db, begin_sql)?;
        inner.in_transaction = true;
        tracing::debug!(statement = begin_sql, "SQLite transaction started");
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.in_transaction {
            return Err(Self::transaction_error(
                TransactionErrorKind::NotActive,
                "Not in a transaction",
            ));
        }
        exec(inner.db, "COMMIT")?;
        inner.in_transaction = false;
        tracing::debug!("SQLite transaction committed");
        Ok(())
    }

    fn rollback(&self) -> Result<()> {
        let mut inner = self.lock();
        if !inner.in_transaction {
            return Err(Self::transaction_error(
                TransactionErrorKind::NotActive,
                "Not in a transaction",
            ));
        }
        exec(inner.db, "ROLLBACK")?;
        inner.in_transaction = false;
        tracing::debug!("SQLite transaction rolled back");
        Ok(())
    }

    fn set_timeout(&self, seconds: Option<u64>) {
        let ms = seconds.map_or(0, |s| c_int::try_from(s.saturating_mul(1000)).unwrap_or(c_int::MAX));
        let inner = self.lock();
        // SAFETY: db is valid
        unsafe { ffi::sqlite3_busy_timeout(inner.db, ms) };
    }
}

impl Drop for SqliteConnection {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        for (_, stmt) in inner.statements.drain() {
            // SAFETY: each statement is finalized exactly once
            unsafe { ffi::sqlite3_finalize(stmt) };
        }
        if !inner.db.is_null() {
            // SAFETY: db is valid and no statements remain
            unsafe { ffi::sqlite3_close_v2(inner.db) };
        }
    }
}

impl std::fmt::Debug for SqliteConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteConnection")
            .field("path", &self.path)
            .field("in_transaction", &self.in_transaction())
            .finish_non_exhaustive()
    }
}

/// A statement finalized on drop.
struct Statement(*mut ffi::sqlite3_stmt);

impl Statement {
    fn prepare(db: *mut ffi::sqlite3, sql: &str) -> Result<Self> {
        let c_sql = CString::new(sql).map_err(|_| {
            Error::Query(QueryError {
                kind: QueryErrorKind::Syntax,
                sql: Some(sql.to_string()),
                message: "SQL contains null byte".to_string(),
                source: None,
            })
        })?;

        let mut stmt: *mut ffi::sqlite3_stmt = ptr::null_mut();
        // SAFETY: All pointers are valid
        let rc = unsafe {
            ffi::sqlite3_prepare_v2(
                db,
                c_sql.as_ptr(),
                c_int::try_from(c_sql.as_bytes().len()).unwrap_or(-1),
                &mut stmt,
                ptr::null_mut(),
            )
        };
        if rc != ffi::SQLITE_OK {
            return Err(db_error(db, sql, None));
        }
        Ok(Self(stmt))
    }

    /// Hand ownership of the handle to the caller.
    fn into_raw(self) -> *mut ffi::sqlite3_stmt {
        let raw = self.0;
        std::mem::forget(self);
        raw
    }
}

impl Drop for Statement {
    fn drop(&mut self) {
        // SAFETY: the handle is owned by this guard
        unsafe { ffi::sqlite3_finalize(self.0) };
    }
}

unsafe fn reset(stmt: *mut ffi::sqlite3_stmt) {
    // SAFETY: forwarded from the caller's contract
    unsafe {
        ffi::sqlite3_reset(stmt);
        ffi::sqlite3_clear_bindings(stmt);
    }
}

fn bind_all(db: *mut ffi::sqlite3, stmt: *mut ffi::sqlite3_stmt, sql: &str, params: &[Value]) -> Result<()> {
    for (i, param) in params.iter().enumerate() {
        let index = c_int::try_from(i + 1).unwrap_or(c_int::MAX);
        // SAFETY: stmt is valid, index is 1-based
        let rc = unsafe { types::bind_value(stmt, index, param) };
        if rc != ffi::SQLITE_OK {
            return Err(db_error(db, sql, Some(i + 1)));
        }
    }
    Ok(())
}

fn read_rows(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    sql: &str,
    params: &[Value],
) -> Result<Vec<Row>> {
    bind_all(db, stmt, sql, params)?;

    // SAFETY: stmt is valid
    let col_count = unsafe { ffi::sqlite3_column_count(stmt) };
    let names = (0..col_count)
        // SAFETY: i is within the column count
        .map(|i| unsafe { types::column_name(stmt, i) }.unwrap_or_else(|| format!("col{}", i)))
        .collect();
    let columns = Arc::new(ColumnInfo::new(names));

    let mut rows = Vec::new();
    loop {
        // SAFETY: stmt is valid
        match unsafe { ffi::sqlite3_step(stmt) } {
            ffi::SQLITE_ROW => {
                let values = (0..col_count)
                    // SAFETY: the statement just returned SQLITE_ROW
                    .map(|i| unsafe { types::read_column(stmt, i) })
                    .collect();
                rows.push(Row::with_columns(Arc::clone(&columns), values));
            }
            ffi::SQLITE_DONE => return Ok(rows),
            _ => return Err(db_error(db, sql, None)),
        }
    }
}

fn run_update(
    db: *mut ffi::sqlite3,
    stmt: *mut ffi::sqlite3_stmt,
    sql: &str,
    params: &[Value],
) -> Result<u64> {
    // SAFETY: stmt is valid
    unsafe { reset(stmt) };
    bind_all(db, stmt, sql, params)?;
    // SAFETY: stmt is valid
    match unsafe { ffi::sqlite3_step(stmt) } {
        ffi::SQLITE_DONE | ffi::SQLITE_ROW => {
            // SAFETY: db is valid
            Ok(u64::try_from(unsafe { ffi::sqlite3_changes(db) }).unwrap_or(0))
        }
        _ => Err(db_error(db, sql, None)),
    }
}

fn exec(db: *mut ffi::sqlite3, sql: &str) -> Result<()> {
    let c_sql = CString::new(sql).map_err(|_| {
        Error::Query(QueryError {
            kind: QueryErrorKind::Syntax,
            sql: Some(sql.to_string()),
            message: "SQL contains null byte".to_string(),
            source: None,
        })
    })?;
    let mut errmsg: *mut std::ffi::c_char = ptr::null_mut();

    // SAFETY: All pointers are valid
    let rc = unsafe { ffi::sqlite3_exec(db, c_sql.as_ptr(), None, ptr::null_mut(), &mut errmsg) };
    if rc == ffi::SQLITE_OK {
        return Ok(());
    }

    let message = if errmsg.is_null() {
        error_string(rc)
    } else {
        // SAFETY: errmsg was allocated by SQLite and is freed exactly once
        unsafe {
            let msg = CStr::from_ptr(errmsg).to_string_lossy().into_owned();
            ffi::sqlite3_free(errmsg.cast());
            msg
        }
    };
    Err(Error::Query(QueryError {
        kind: error_code_to_kind(rc),
        sql: Some(sql.to_string()),
        message,
        source: None,
    }))
}

fn db_error(db: *mut ffi::sqlite3, sql: &str, param_index: Option<usize>) -> Error {
    // SAFETY: db is valid
    let (msg, code) = unsafe {
        (
            CStr::from_ptr(ffi::sqlite3_errmsg(db)).to_string_lossy().into_owned(),
            ffi::sqlite3_errcode(db),
        )
    };
    let (kind, message) = match param_index {
        Some(i) => (QueryErrorKind::Database, format!("Failed to bind parameter {}: {}", i, msg)),
        None => (error_code_to_kind(code), msg),
    };
    Error::Query(QueryError {
        kind,
        sql: Some(sql.to_string()),
        message,
        source: None,
    })
}

fn error_string(code: c_int) -> String {
    // SAFETY: sqlite3_errstr returns a static string for every code
    unsafe { CStr::from_ptr(ffi::sqlite3_errstr(code)) }
        .to_string_lossy()
        .into_owned()
}

fn error_code_to_kind(code: c_int) -> QueryErrorKind {
    // Extended codes carry the primary code in the low byte
    match code & 0xff {
        ffi::SQLITE_CONSTRAINT => QueryErrorKind::Constraint,
        ffi::SQLITE_BUSY | ffi::SQLITE_LOCKED => QueryErrorKind::Busy,
        ffi::SQLITE_PERM | ffi::SQLITE_AUTH => QueryErrorKind::Permission,
        ffi::SQLITE_NOTFOUND => QueryErrorKind::NotFound,
        ffi::SQLITE_INTERRUPT => QueryErrorKind::Timeout,
        _ => QueryErrorKind::Database,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users() -> SqliteConnection {
        let conn = SqliteConnection::open_memory().unwrap();
        conn.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL UNIQUE)")
            .unwrap();
        conn
    }

    #[test]
    fn insert_reports_count_and_rowid() {
        let conn = users();
        let (count, id) = conn
            .insert_with_count("INSERT INTO users (name) VALUES (?)", &[Value::from("ann")])
            .unwrap();
        assert_eq!((count, id), (1, 1));
        assert_eq!(conn.last_insert_rowid(), 1);
        let rows = conn.query("SELECT id, name FROM users", &[]).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get_by_name("name"), Some(&Value::from("ann")));
        assert_eq!(rows[0].get_by_name("id"), Some(&Value::Int(1)));
    }

    #[test]
    fn constraint_violations_are_classified() {
        let conn = users();
        conn.execute("INSERT INTO users (name) VALUES (?)", &[Value::from("ann")])
            .unwrap();
        let err = conn
            .execute("INSERT INTO users (name) VALUES (?)", &[Value::from("ann")])
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Query(QueryError {
                kind: QueryErrorKind::Constraint,
                ..
            })
        ));
        assert_eq!(err.sql(), Some("INSERT INTO users (name) VALUES (?)"));
    }

    #[test]
    fn prepared_statements_are_reused_until_closed() {
        let conn = users();
        let stmt = conn.prepare("INSERT INTO users (name) VALUES (?)").unwrap();
        assert_eq!(stmt.param_count(), 1);
        assert_eq!(conn.open_statements(), 1);
        for name in ["a", "b", "c"] {
            assert_eq!(conn.execute_prepared(&stmt, &[Value::from(name)]).unwrap(), 1);
        }
        let select = conn.prepare("SELECT name FROM users WHERE id > ?").unwrap();
        assert_eq!(conn.query_prepared(&select, &[Value::Int(1)]).unwrap().len(), 2);
        assert_eq!(conn.query_prepared(&select, &[Value::Int(2)]).unwrap().len(), 1);

        conn.close_statement(&stmt).unwrap();
        conn.close_statement(&select).unwrap();
        assert_eq!(conn.open_statements(), 0);
        assert!(conn.execute_prepared(&stmt, &[Value::from("d")]).is_err());
    }

    #[test]
    fn batch_returns_one_count_per_statement() {
        let conn = users();
        let insert = "INSERT INTO users (name) VALUES (?)".to_string();
        let counts = conn
            .batch(&[
                (insert.clone(), vec![Value::from("a")]),
                (insert, vec![Value::from("b")]),
                ("UPDATE users SET name = name || '!'".to_string(), Vec::new()),
            ])
            .unwrap();
        assert_eq!(counts, vec![1, 1, 2]);
    }

    #[test]
    fn rollback_discards_changes() {
        let conn = users();
        conn.begin().unwrap();
        assert!(conn.begin().is_err());
        conn.execute("INSERT INTO users (name) VALUES ('x')", &[]).unwrap();
        conn.rollback().unwrap();
        assert!(!conn.in_transaction());
        assert!(conn.query("SELECT * FROM users", &[]).unwrap().is_empty());
        assert!(matches!(
            conn.commit(),
            Err(Error::Transaction(TransactionError {
                kind: TransactionErrorKind::NotActive,
                ..
            }))
        ));
    }

    #[test]
    fn open_reports_bad_paths() {
        let config = SqliteConfig::file("/nonexistent-dir/db.sqlite").flags(OpenFlags::read_write());
        assert!(matches!(
            SqliteConnection::open(&config),
            Err(Error::Connection(_))
        ));
    }
}
