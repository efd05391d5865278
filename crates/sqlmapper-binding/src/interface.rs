//! Declared mapper interfaces.
//!
//! A mapper interface is described by data instead of reflection: its
//! qualified name, the interfaces it extends, and one [`MethodDecl`] per
//! method. Statement ids are formed as `<interface>.<method>`.

use crate::args::{Arg, MethodResult};
use crate::proxy::MapperProxy;
use sqlmapper_core::{Result, TypeRef};
use std::fmt;
use std::sync::Arc;

/// The declaring type of the methods every proxy answers itself.
pub const OBJECT_TYPE: &str = "Object";

/// A method body that runs on the proxy instead of a mapped statement.
pub type DefaultBody = Arc<dyn Fn(&MapperProxy, &mut [Arg]) -> Result<MethodResult> + Send + Sync>;

/// How an argument position is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    /// An ordinary value bound into the statement parameter.
    Value,
    /// Offset/limit for a query.
    RowBounds,
    /// A handler receiving rows one at a time.
    ResultHandler,
}

impl ParamKind {
    /// Special parameters are extracted by position and never named.
    pub fn is_special(self) -> bool {
        !matches!(self, ParamKind::Value)
    }

    pub fn type_name(self) -> &'static str {
        match self {
            ParamKind::Value => "Value",
            ParamKind::RowBounds => "RowBounds",
            ParamKind::ResultHandler => "ResultHandler",
        }
    }
}

/// One declared method parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParamDecl {
    /// The parameter's name in source, when known.
    pub source_name: Option<String>,
    /// An explicit name given with a `param` annotation.
    pub annotation: Option<String>,
    pub kind: ParamKind,
}

impl ParamDecl {
    /// An unnamed value parameter.
    pub fn value() -> Self {
        Self {
            source_name: None,
            annotation: None,
            kind: ParamKind::Value,
        }
    }

    /// A value parameter with its source-level name.
    pub fn named(source_name: impl Into<String>) -> Self {
        Self {
            source_name: Some(source_name.into()),
            ..Self::value()
        }
    }

    /// A value parameter with an explicit annotation.
    pub fn annotated(name: impl Into<String>) -> Self {
        Self {
            annotation: Some(name.into()),
            ..Self::value()
        }
    }

    pub fn row_bounds() -> Self {
        Self {
            kind: ParamKind::RowBounds,
            ..Self::value()
        }
    }

    pub fn result_handler() -> Self {
        Self {
            kind: ParamKind::ResultHandler,
            ..Self::value()
        }
    }

    /// Add an explicit annotation to this parameter.
    pub fn with_annotation(mut self, name: impl Into<String>) -> Self {
        self.annotation = Some(name.into());
        self
    }
}

/// One declared mapper method.
#[derive(Clone)]
pub struct MethodDecl {
    pub name: String,
    /// The interface that declares the method. Filled in by
    /// [`MapperInterface::method`] when left empty.
    pub declaring_type: String,
    pub params: Vec<ParamDecl>,
    pub return_type: TypeRef,
    /// Marked to flush buffered statements when no statement is bound.
    pub flush: bool,
    /// Property used as key when the method returns a map.
    pub map_key: Option<String>,
    pub default_body: Option<DefaultBody>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, return_type: TypeRef) -> Self {
        Self {
            name: name.into(),
            declaring_type: String::new(),
            params: Vec::new(),
            return_type,
            flush: false,
            map_key: None,
            default_body: None,
        }
    }

    pub fn param(mut self, param: ParamDecl) -> Self {
        self.params.push(param);
        self
    }

    pub fn declared_by(mut self, declaring_type: impl Into<String>) -> Self {
        self.declaring_type = declaring_type.into();
        self
    }

    pub fn flush(mut self) -> Self {
        self.flush = true;
        self
    }

    pub fn map_key(mut self, property: impl Into<String>) -> Self {
        self.map_key = Some(property.into());
        self
    }

    pub fn default_body(
        mut self,
        body: impl Fn(&MapperProxy, &mut [Arg]) -> Result<MethodResult> + Send + Sync + 'static,
    ) -> Self {
        self.default_body = Some(Arc::new(body));
        self
    }

    pub fn is_default(&self) -> bool {
        self.default_body.is_some()
    }

    /// Identity used to memoize resolved methods.
    pub fn key(&self) -> MethodKey {
        MethodKey {
            declaring_type: self.declaring_type.clone(),
            name: self.name.clone(),
        }
    }
}

impl fmt::Debug for MethodDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDecl")
            .field("name", &self.name)
            .field("declaring_type", &self.declaring_type)
            .field("params", &self.params)
            .field("return_type", &self.return_type)
            .field("flush", &self.flush)
            .field("map_key", &self.map_key)
            .field("default_body", &self.default_body.is_some())
            .finish()
    }
}

/// Identity of a declared method.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MethodKey {
    pub declaring_type: String,
    pub name: String,
}

/// A mapper interface and the interfaces it extends.
#[derive(Debug, Clone)]
pub struct MapperInterface {
    name: String,
    supers: Vec<Arc<MapperInterface>>,
    methods: Vec<Arc<MethodDecl>>,
}

impl MapperInterface {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            supers: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn extends(mut self, parent: Arc<MapperInterface>) -> Self {
        self.supers.push(parent);
        self
    }

    /// Declare a method on this interface.
    pub fn method(mut self, mut method: MethodDecl) -> Self {
        if method.declaring_type.is_empty() {
            method.declaring_type.clone_from(&self.name);
        }
        self.methods.push(Arc::new(method));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn supers(&self) -> &[Arc<MapperInterface>] {
        &self.supers
    }

    pub fn methods(&self) -> &[Arc<MethodDecl>] {
        &self.methods
    }

    /// Find a method by name, searching this interface before its parents.
    pub fn find_method(&self, name: &str) -> Option<Arc<MethodDecl>> {
        self.methods
            .iter()
            .find(|m| m.name == name)
            .cloned()
            .or_else(|| self.supers.iter().find_map(|s| s.find_method(name)))
    }

    /// Is this interface `type_name` or one of its descendants?
    pub fn is_subtype_of(&self, type_name: &str) -> bool {
        self.name == type_name || self.supers.iter().any(|s| s.is_subtype_of(type_name))
    }
}

/// Methods every proxy answers without a statement.
pub(crate) fn object_method(name: &str) -> Option<MethodDecl> {
    let decl = match name {
        "to_string" => MethodDecl::new(name, TypeRef::Scalar(sqlmapper_core::ScalarType::Text)),
        "hash_code" => MethodDecl::new(name, TypeRef::Primitive(sqlmapper_core::ScalarType::Long)),
        "equals" => MethodDecl::new(name, TypeRef::Primitive(sqlmapper_core::ScalarType::Bool))
            .param(ParamDecl::value()),
        _ => return None,
    };
    Some(decl.declared_by(OBJECT_TYPE))
}
