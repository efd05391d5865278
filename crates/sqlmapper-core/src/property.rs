//! Schema-driven property access.
//!
//! Mapped objects are `Value::Map`s keyed by property name. Dotted paths
//! (`author.name`) walk nested maps. Typed structs participate through the
//! [`Mapped`] trait, which exposes a static description of their properties
//! so result mapping can consult it by name at runtime.

use crate::error::{Error, TypeError};
use crate::row::{FromValue, ToValue};
use crate::value::Value;
use crate::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Read a property by dotted path.
///
/// Returns `None` when any segment is missing or a non-map value is reached
/// before the path ends.
pub fn get_property<'a>(object: &'a Value, path: &str) -> Option<&'a Value> {
    let mut current = object;
    for segment in path.split('.') {
        current = current.as_map()?.get(segment)?;
    }
    Some(current)
}

/// Is there a value at this dotted path?
pub fn has_property(object: &Value, path: &str) -> bool {
    get_property(object, path).is_some()
}

/// Write a property by dotted path, creating intermediate maps as needed.
pub fn set_property(object: &mut Value, path: &str, value: Value) -> Result<()> {
    let mut segments = path.split('.').peekable();
    let mut current = object;
    while let Some(segment) = segments.next() {
        if current.is_null() {
            *current = Value::map();
        }
        let map = match current {
            Value::Map(map) => map,
            other => {
                return Err(Error::Type(TypeError {
                    expected: "MAP",
                    actual: format!("cannot set property '{}' on {}", path, other.type_name()),
                    column: None,
                    rust_type: None,
                }));
            }
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        current = map.entry(segment.to_string()).or_insert(Value::Null);
    }
    Ok(())
}

/// The property map of a record value, or a type error naming `type_name`.
pub fn record_fields<'a>(
    value: &'a Value,
    type_name: &'static str,
) -> Result<&'a BTreeMap<String, Value>> {
    value.as_map().ok_or_else(|| {
        Error::Type(TypeError {
            expected: "MAP",
            actual: value.type_name().to_string(),
            column: None,
            rust_type: Some(type_name),
        })
    })
}

/// Read one property of a record into a typed field.
///
/// A missing property reads as NULL. Type errors carry the property name.
pub fn read_property<T: FromValue>(fields: &BTreeMap<String, Value>, name: &str) -> Result<T> {
    let value = fields.get(name).unwrap_or(&Value::Null);
    T::from_value(value).map_err(|e| match e {
        Error::Type(mut err) => {
            err.column.get_or_insert_with(|| name.to_string());
            Error::Type(err)
        }
        other => other,
    })
}

/// Static description of a mapped record type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordType {
    pub name: String,
    pub properties: Vec<String>,
}

impl RecordType {
    pub fn new<S: Into<String>>(name: impl Into<String>, properties: impl IntoIterator<Item = S>) -> Self {
        Self {
            name: name.into(),
            properties: properties.into_iter().map(Into::into).collect(),
        }
    }

    /// Resolve a property name case-insensitively.
    pub fn find_property(&self, name: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|p| p.eq_ignore_ascii_case(name))
            .map(String::as_str)
    }

    /// A fresh instance with every declared property set to NULL.
    pub fn instantiate(&self) -> Value {
        Value::Map(
            self.properties
                .iter()
                .map(|p| (p.clone(), Value::Null))
                .collect::<BTreeMap<_, _>>(),
        )
    }
}

/// A struct that maps to and from a property map.
///
/// Usually derived with `#[derive(Mapped)]`.
pub trait Mapped: FromValue + ToValue {
    /// The record name used in result maps.
    const TYPE_NAME: &'static str;

    /// Declared property names, in field order.
    fn property_names() -> &'static [&'static str];

    fn record_type() -> RecordType {
        RecordType::new(Self::TYPE_NAME, Self::property_names().iter().copied())
    }
}

/// A mapped result shared between the session cache and pending deferred loads.
///
/// Deferred loads assign into the object after the owning query finished
/// mapping it, so rows are held behind a lock rather than copied.
#[derive(Clone)]
pub struct ResultObject(Arc<RwLock<Value>>);

impl ResultObject {
    pub fn new(value: Value) -> Self {
        Self(Arc::new(RwLock::new(value)))
    }

    /// A copy of the current value.
    pub fn snapshot(&self) -> Value {
        self.0.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn get_property(&self, path: &str) -> Option<Value> {
        let guard = self.0.read().unwrap_or_else(PoisonError::into_inner);
        get_property(&guard, path).cloned()
    }

    pub fn set_property(&self, path: &str, value: Value) -> Result<()> {
        let mut guard = self.0.write().unwrap_or_else(PoisonError::into_inner);
        set_property(&mut guard, path, value)
    }

    /// Replace the whole value.
    pub fn replace(&self, value: Value) {
        *self.0.write().unwrap_or_else(PoisonError::into_inner) = value;
    }

    /// Do both handles point at the same object?
    pub fn ptr_eq(&self, other: &ResultObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for ResultObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ResultObject").field(&self.snapshot()).finish()
    }
}

impl From<Value> for ResultObject {
    fn from(value: Value) -> Self {
        Self::new(value)
    }
}
