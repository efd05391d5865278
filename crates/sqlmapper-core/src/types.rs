//! Declared types for mapper method parameters and return values.

use crate::error::{Error, TypeError};
use crate::value::Value;
use crate::Result;
use std::fmt;

/// Scalar types a mapper method can declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    Bool,
    Int,
    Long,
    Double,
    Text,
    Bytes,
    /// Any value, passed through unchanged
    Any,
}

impl ScalarType {
    pub const fn name(self) -> &'static str {
        match self {
            ScalarType::Bool => "bool",
            ScalarType::Int => "i32",
            ScalarType::Long => "i64",
            ScalarType::Double => "f64",
            ScalarType::Text => "String",
            ScalarType::Bytes => "Vec<u8>",
            ScalarType::Any => "Value",
        }
    }

    /// Convert a value to this scalar type. NULL passes through.
    pub fn coerce(self, value: Value) -> Result<Value> {
        if value.is_null() {
            return Ok(value);
        }
        let converted = match self {
            ScalarType::Any => Some(value.clone()),
            ScalarType::Bool => value.as_bool().map(Value::Bool),
            ScalarType::Int => value
                .as_i64()
                .and_then(|v| i32::try_from(v).ok())
                .map(Value::Int),
            ScalarType::Long => value.as_i64().map(Value::BigInt),
            ScalarType::Double => value.as_f64().map(Value::Double),
            ScalarType::Text => match &value {
                Value::Text(_) => Some(value.clone()),
                v if v.is_scalar() => Some(Value::Text(v.to_string())),
                _ => None,
            },
            ScalarType::Bytes => value.as_bytes().map(|b| Value::Bytes(b.to_vec())),
        };
        converted.ok_or_else(|| {
            Error::Type(TypeError {
                expected: self.name(),
                actual: value.type_name().to_string(),
                column: None,
                rust_type: Some(self.name()),
            })
        })
    }
}

/// A declared type, standing in for the reflective return/parameter type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// No value (`()`).
    Unit,
    /// A non-nullable scalar. NULL cannot be represented.
    Primitive(ScalarType),
    /// A nullable scalar.
    Scalar(ScalarType),
    /// A registered record type, by name.
    Record(String),
    /// A property map.
    Map,
    /// A growable list.
    List(Box<TypeRef>),
    /// A fixed array.
    Array(Box<TypeRef>),
    /// A named collection type created through the object factory.
    Collection(String, Box<TypeRef>),
    /// A lazily consumed cursor.
    Cursor(Box<TypeRef>),
    /// An optional box.
    Optional(Box<TypeRef>),
}

impl TypeRef {
    pub fn list(element: TypeRef) -> Self {
        TypeRef::List(Box::new(element))
    }

    pub fn array(element: TypeRef) -> Self {
        TypeRef::Array(Box::new(element))
    }

    pub fn collection(name: impl Into<String>, element: TypeRef) -> Self {
        TypeRef::Collection(name.into(), Box::new(element))
    }

    pub fn cursor(element: TypeRef) -> Self {
        TypeRef::Cursor(Box::new(element))
    }

    pub fn optional(element: TypeRef) -> Self {
        TypeRef::Optional(Box::new(element))
    }

    pub fn record(name: impl Into<String>) -> Self {
        TypeRef::Record(name.into())
    }

    pub fn is_unit(&self) -> bool {
        matches!(self, TypeRef::Unit)
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, TypeRef::Primitive(_))
    }

    pub fn is_array(&self) -> bool {
        matches!(self, TypeRef::Array(_))
    }

    pub fn is_list(&self) -> bool {
        matches!(self, TypeRef::List(_))
    }

    pub fn is_cursor(&self) -> bool {
        matches!(self, TypeRef::Cursor(_))
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeRef::Optional(_))
    }

    pub fn is_map(&self) -> bool {
        matches!(self, TypeRef::Map)
    }

    /// Element type of a container, or the type itself.
    pub fn element_type(&self) -> &TypeRef {
        match self {
            TypeRef::List(e)
            | TypeRef::Array(e)
            | TypeRef::Collection(_, e)
            | TypeRef::Cursor(e)
            | TypeRef::Optional(e) => e,
            other => other,
        }
    }

    /// The scalar type carried by this type, if any.
    pub fn scalar(&self) -> Option<ScalarType> {
        match self {
            TypeRef::Primitive(s) | TypeRef::Scalar(s) => Some(*s),
            _ => None,
        }
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Unit => write!(f, "()"),
            TypeRef::Primitive(s) => write!(f, "{}", s.name()),
            TypeRef::Scalar(s) => write!(f, "Option<{}>", s.name()),
            TypeRef::Record(name) => write!(f, "{name}"),
            TypeRef::Map => write!(f, "Map"),
            TypeRef::List(e) => write!(f, "List<{e}>"),
            TypeRef::Array(e) => write!(f, "[{e}]"),
            TypeRef::Collection(name, e) => write!(f, "{name}<{e}>"),
            TypeRef::Cursor(e) => write!(f, "Cursor<{e}>"),
            TypeRef::Optional(e) => write!(f, "Optional<{e}>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerce_widens_and_narrows() {
        assert_eq!(ScalarType::Long.coerce(Value::Int(4)).unwrap(), Value::BigInt(4));
        assert_eq!(ScalarType::Int.coerce(Value::BigInt(4)).unwrap(), Value::Int(4));
        assert_eq!(ScalarType::Bool.coerce(Value::BigInt(0)).unwrap(), Value::Bool(false));
        assert_eq!(ScalarType::Text.coerce(Value::Int(9)).unwrap(), Value::from("9"));
        assert_eq!(ScalarType::Long.coerce(Value::Null).unwrap(), Value::Null);
        assert!(ScalarType::Long.coerce(Value::from("x")).is_err());
    }

    #[test]
    fn display_names() {
        let t = TypeRef::list(TypeRef::record("User"));
        assert_eq!(t.to_string(), "List<User>");
        assert_eq!(TypeRef::Primitive(ScalarType::Long).to_string(), "i64");
        assert_eq!(t.element_type(), &TypeRef::record("User"));
    }
}
