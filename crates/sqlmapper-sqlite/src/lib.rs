//! SQLite backend for SQLMapper Rust.
//!
// FFI bindings require unsafe code
#![allow(unsafe_code)]
//!
//! Implements the `Connection` contract from sqlmapper-core over the
//! bundled libsqlite3, plus a [`SqliteDataSource`] that session factories
//! draw connections from.
//!
//! # Example
//!
//! ```rust,ignore
//! use sqlmapper_sqlite::SqliteDataSource;
//!
//! let source = Arc::new(SqliteDataSource::memory());
//! source.sqlite_connection()?.execute_raw("CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT)")?;
//! let factory = SqlSessionFactory::new(config, source);
//! ```
//!
//! # Type Mapping
//!
//! | Value | SQLite Type |
//! |-------|-------------|
//! | `Bool` | INTEGER (0/1) |
//! | `Int`, `BigInt`, `Timestamp` | INTEGER |
//! | `Double` | REAL |
//! | `Text`, `Decimal` | TEXT |
//! | `Bytes` | BLOB |
//! | `Json`, `Array`, `Map` | TEXT (JSON) |
//!
//! Integers read back as `Int` when they fit in 32 bits and `BigInt`
//! otherwise.

pub mod connection;
pub mod source;
pub mod types;

pub use connection::{MEMORY_PATH, OpenFlags, SqliteConfig, SqliteConnection};
pub use source::SqliteDataSource;

use libsqlite3_sys as ffi;

/// The SQLite library version.
pub fn sqlite_version() -> &'static str {
    // SAFETY: sqlite3_libversion returns a static NUL-terminated string
    unsafe { std::ffi::CStr::from_ptr(ffi::sqlite3_libversion()) }
        .to_str()
        .unwrap_or("unknown")
}

/// The SQLite library version number.
pub fn sqlite_version_number() -> i32 {
    // SAFETY: no preconditions
    unsafe { ffi::sqlite3_libversion_number() }
}
