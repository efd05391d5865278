//! Mapper call arguments and results.

use sqlmapper_core::{
    BindingErrorKind, Error, FromValue, ResultHandlerRef, Result, RowBounds, Value,
};
use sqlmapper_executor::{BatchResult, Cursor};
use std::collections::BTreeMap;
use std::fmt;

/// One argument of a mapper call.
#[derive(Clone)]
pub enum Arg {
    Value(Value),
    RowBounds(RowBounds),
    ResultHandler(ResultHandlerRef),
}

impl Arg {
    pub fn value(value: impl Into<Value>) -> Self {
        Arg::Value(value.into())
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(v) => Some(v),
            _ => None,
        }
    }

    /// Take the value out, leaving NULL behind.
    pub fn take_value(&mut self) -> Option<Value> {
        match self {
            Arg::Value(v) => Some(std::mem::take(v)),
            _ => None,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            Arg::Value(_) => "Value",
            Arg::RowBounds(_) => "RowBounds",
            Arg::ResultHandler(_) => "ResultHandler",
        }
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::RowBounds(b) => f.debug_tuple("RowBounds").field(b).finish(),
            Arg::ResultHandler(_) => f.write_str("ResultHandler"),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<RowBounds> for Arg {
    fn from(bounds: RowBounds) -> Self {
        Arg::RowBounds(bounds)
    }
}

/// What a mapper method returned, shaped by its declared return type.
pub enum MethodResult {
    /// Nothing (a unit return or a discarded count).
    Unit,
    Value(Value),
    List(Vec<Value>),
    Array(Vec<Value>),
    /// A collection created through the object factory.
    Collection(Value),
    Map(BTreeMap<String, Value>),
    Cursor(Cursor),
    Optional(Option<Value>),
    Batch(Vec<BatchResult>),
}

impl MethodResult {
    pub fn is_unit(&self) -> bool {
        matches!(self, MethodResult::Unit)
    }

    fn shape(&self) -> &'static str {
        match self {
            MethodResult::Unit => "unit",
            MethodResult::Value(_) => "value",
            MethodResult::List(_) => "list",
            MethodResult::Array(_) => "array",
            MethodResult::Collection(_) => "collection",
            MethodResult::Map(_) => "map",
            MethodResult::Cursor(_) => "cursor",
            MethodResult::Optional(_) => "optional",
            MethodResult::Batch(_) => "batch results",
        }
    }

    fn mismatch(&self, expected: &str) -> Error {
        Error::binding(
            BindingErrorKind::UnsupportedReturnType,
            format!("Expected a {expected} result but the method returned a {}", self.shape()),
        )
    }

    /// Flatten into a single value. Cursors and batch results do not flatten.
    pub fn into_value(self) -> Result<Value> {
        match self {
            MethodResult::Unit | MethodResult::Optional(None) => Ok(Value::Null),
            MethodResult::Value(v) | MethodResult::Collection(v) | MethodResult::Optional(Some(v)) => {
                Ok(v)
            }
            MethodResult::List(items) | MethodResult::Array(items) => Ok(Value::Array(items)),
            MethodResult::Map(map) => Ok(Value::Map(map)),
            other => Err(other.mismatch("value")),
        }
    }

    /// Convert a single value into a typed result.
    pub fn get<T: FromValue>(self) -> Result<T> {
        T::from_value(&self.into_value()?)
    }

    pub fn into_list(self) -> Result<Vec<Value>> {
        match self {
            MethodResult::List(items) | MethodResult::Array(items) => Ok(items),
            MethodResult::Collection(Value::Array(items)) => Ok(items),
            other => Err(other.mismatch("list")),
        }
    }

    /// Convert every element of a list result.
    pub fn list_of<T: FromValue>(self) -> Result<Vec<T>> {
        self.into_list()?.iter().map(T::from_value).collect()
    }

    pub fn into_map(self) -> Result<BTreeMap<String, Value>> {
        match self {
            MethodResult::Map(map) => Ok(map),
            other => Err(other.mismatch("map")),
        }
    }

    pub fn into_cursor(self) -> Result<Cursor> {
        match self {
            MethodResult::Cursor(cursor) => Ok(cursor),
            other => Err(other.mismatch("cursor")),
        }
    }

    pub fn into_optional(self) -> Result<Option<Value>> {
        match self {
            MethodResult::Optional(v) => Ok(v),
            other => Err(other.mismatch("optional")),
        }
    }

    pub fn into_batch(self) -> Result<Vec<BatchResult>> {
        match self {
            MethodResult::Batch(results) => Ok(results),
            other => Err(other.mismatch("batch")),
        }
    }
}

impl fmt::Debug for MethodResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MethodResult::Unit => f.write_str("Unit"),
            MethodResult::Value(v) => f.debug_tuple("Value").field(v).finish(),
            MethodResult::List(v) => f.debug_tuple("List").field(v).finish(),
            MethodResult::Array(v) => f.debug_tuple("Array").field(v).finish(),
            MethodResult::Collection(v) => f.debug_tuple("Collection").field(v).finish(),
            MethodResult::Map(v) => f.debug_tuple("Map").field(v).finish(),
            MethodResult::Cursor(c) => f.debug_tuple("Cursor").field(c).finish(),
            MethodResult::Optional(v) => f.debug_tuple("Optional").field(v).finish(),
            MethodResult::Batch(v) => f.debug_tuple("Batch").field(v).finish(),
        }
    }
}
