//! Resolves mapper argument positions to parameter names.
//!
//! Each non-special parameter gets one logical name:
//!
//! 1. its explicit annotation, if any
//! 2. its source-level name, when `use_actual_param_name` is enabled
//! 3. its zero-based order among the parameters named so far
//!
//! Row bounds and result handlers are skipped; they are extracted by
//! position instead.

use crate::args::Arg;
use crate::interface::MethodDecl;
use sqlmapper_core::{
    BindingErrorKind, Configuration, Error, MappedStatement, ParameterMode, Result, Value,
};
use std::collections::BTreeMap;

/// Prefix of the positional names added next to the logical ones.
pub const GENERIC_NAME_PREFIX: &str = "param";

/// A named parameter object whose lookups fail loudly.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamMap(BTreeMap<String, Value>);

impl ParamMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        self.0.insert(name.into(), value);
    }

    /// Look up a parameter, listing the available names when it is missing.
    pub fn get(&self, name: &str) -> Result<&Value> {
        self.0
            .get(name)
            .ok_or_else(|| Error::parameter_not_found(name, self.0.keys().map(String::as_str)))
    }

    /// Check that every input placeholder of `statement` starts with a
    /// parameter of this map.
    pub fn require(&self, statement: &MappedStatement) -> Result<()> {
        for mapping in statement.sql_source().parameter_mappings() {
            if mapping.mode == ParameterMode::Out {
                continue;
            }
            let root = mapping.property.split('.').next().unwrap_or(&mapping.property);
            self.get(root)?;
        }
        Ok(())
    }

    pub fn into_value(self) -> Value {
        Value::Map(self.0)
    }
}

/// The statement parameter object built for one call.
#[derive(Debug, Clone, PartialEq)]
pub enum BoundParams {
    /// The caller's own value, passed through as is. Absent map keys read
    /// as NULL.
    Object(Value),
    /// Arguments under their resolved names.
    Named(ParamMap),
}

impl BoundParams {
    /// Fail with `ParameterNotFound` when a named parameter object lacks a
    /// placeholder of `statement`.
    pub fn require(&self, statement: &MappedStatement) -> Result<()> {
        match self {
            Self::Object(_) => Ok(()),
            Self::Named(params) => params.require(statement),
        }
    }

    pub fn into_value(self) -> Value {
        match self {
            Self::Object(value) => value,
            Self::Named(params) => params.into_value(),
        }
    }
}

/// Parameter names of one mapper method.
#[derive(Debug, Clone)]
pub struct ParamNameResolver {
    /// Argument position to logical name, in position order.
    names: BTreeMap<usize, String>,
    has_param_annotation: bool,
}

impl ParamNameResolver {
    pub fn new(config: &Configuration, method: &MethodDecl) -> Result<Self> {
        let use_actual_name = config.settings().use_actual_param_name;
        let mut names: BTreeMap<usize, String> = BTreeMap::new();
        let mut has_param_annotation = false;

        for (index, param) in method.params.iter().enumerate() {
            if param.kind.is_special() {
                continue;
            }
            let name = match (&param.annotation, &param.source_name) {
                (Some(annotation), _) => {
                    has_param_annotation = true;
                    annotation.clone()
                }
                (None, Some(source)) if use_actual_name => source.clone(),
                _ => names.len().to_string(),
            };
            if names.values().any(|existing| *existing == name) {
                return Err(Error::binding(
                    BindingErrorKind::DuplicateParameterName,
                    format!(
                        "Mapper method '{}.{}' declares the parameter name '{}' more than once",
                        method.declaring_type, method.name, name
                    ),
                ));
            }
            tracing::trace!(method = %method.name, index, name = %name, "Resolved parameter name");
            names.insert(index, name);
        }

        Ok(Self {
            names,
            has_param_annotation,
        })
    }

    /// Logical names in argument order.
    pub fn names(&self) -> Vec<&str> {
        self.names.values().map(String::as_str).collect()
    }

    pub fn has_param_annotation(&self) -> bool {
        self.has_param_annotation
    }

    fn single_unnamed(&self) -> Option<usize> {
        if !self.has_param_annotation && self.names.len() == 1 {
            self.names.keys().next().copied()
        } else {
            None
        }
    }

    fn argument<'a>(args: &'a [Arg], index: usize) -> Result<&'a Value> {
        args.get(index).and_then(Arg::as_value).ok_or_else(|| {
            Error::binding(
                BindingErrorKind::InvalidArgument,
                format!("Argument {index} must be a value"),
            )
        })
    }

    /// Build the statement parameter object for one call.
    ///
    /// No parameters bind NULL. A single parameter without annotations is
    /// passed through as is. Otherwise every argument appears under its
    /// logical name and under `param1`, `param2`, ... unless a logical
    /// name already uses that generic name.
    pub fn named_params(&self, args: &[Arg]) -> Result<BoundParams> {
        if self.names.is_empty() {
            return Ok(BoundParams::Object(Value::Null));
        }
        if let Some(index) = self.single_unnamed() {
            return Self::argument(args, index).cloned().map(BoundParams::Object);
        }
        let mut params = ParamMap::new();
        for (i, (index, name)) in self.names.iter().enumerate() {
            let value = Self::argument(args, *index)?;
            params.insert(name.clone(), value.clone());
            let generic = format!("{GENERIC_NAME_PREFIX}{}", i + 1);
            if !self.names.values().any(|n| *n == generic) {
                params.insert(generic, value.clone());
            }
        }
        Ok(BoundParams::Named(params))
    }

    /// Copy values written into the parameter object (generated keys,
    /// output parameters) back into the argument list.
    pub fn write_back(&self, param: Value, args: &mut [Arg]) {
        if let Some(index) = self.single_unnamed() {
            if let Some(slot) = args.get_mut(index) {
                *slot = Arg::Value(param);
            }
            return;
        }
        let Value::Map(mut map) = param else {
            return;
        };
        for (index, name) in &self.names {
            if let (Some(value), Some(slot)) = (map.remove(name), args.get_mut(*index)) {
                *slot = Arg::Value(value);
            }
        }
    }
}
