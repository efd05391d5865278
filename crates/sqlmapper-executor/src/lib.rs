//! Statement executors for SQLMapper Rust.
//!
//! An [`Executor`] runs mapped statements for one unit of work. All
//! strategies share [`BaseExecutor`], which owns:
//!
//! - the session cache, keyed by [`CacheKey`] with explicit in-flight entries
//! - output parameters of callable statements
//! - deferred loads for nested selects that hit an in-flight key
//! - the nesting depth that decides when deferred loads drain
//!
//! Strategies differ only in how statements reach the backend:
//! [`SimpleStrategy`] executes each call directly, [`ReuseStrategy`] keeps
//! prepared handles per SQL text, and [`BatchStrategy`] buffers updates until
//! they are flushed.

pub mod base;
pub mod batch;
pub mod cache;
pub mod cache_key;
pub mod cursor;
pub mod deferred;
pub mod executor;
pub mod result_set;
pub mod reuse;
pub mod simple;
pub mod statement_handler;
pub mod strategy;

pub use base::BaseExecutor;
pub use batch::{BatchExecutor, BatchStrategy};
pub use cache::{CacheEntry, OutputParameterCache, PerpetualCache};
pub use cache_key::CacheKey;
pub use cursor::Cursor;
pub use deferred::DeferredLoad;
pub use executor::{BATCH_UPDATE_RETURN_VALUE, BatchResult, Executor};
pub use result_set::{ResultSetHandler, RowMapper, extract_object_from_list};
pub use reuse::{ReuseExecutor, ReuseStrategy};
pub use simple::{SimpleExecutor, SimpleStrategy};
pub use statement_handler::{StatementHandle, StatementHandler};
pub use strategy::{StatementContext, StatementStrategy};

use sqlmapper_core::{Configuration, ExecutorType, Transaction};
use std::sync::Arc;

/// Build an executor of the requested strategy over a transaction.
pub fn new_executor(
    configuration: Arc<Configuration>,
    transaction: Arc<dyn Transaction>,
    executor_type: ExecutorType,
) -> Arc<dyn Executor> {
    tracing::debug!(executor_type = %executor_type, "Creating executor");
    match executor_type {
        ExecutorType::Simple => Arc::new(SimpleExecutor::new(configuration, transaction, SimpleStrategy)),
        ExecutorType::Reuse => {
            Arc::new(ReuseExecutor::new(configuration, transaction, ReuseStrategy::new()))
        }
        ExecutorType::Batch => {
            Arc::new(BatchExecutor::new(configuration, transaction, BatchStrategy::new()))
        }
    }
}
