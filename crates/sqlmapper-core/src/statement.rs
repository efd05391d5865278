//! Registered statements and their rendered form.
//!
//! A statement's SQL is a template with `#{property}` placeholders. Parsing
//! replaces each placeholder with `?` and records an ordered
//! [`ParameterMapping`]; rendering against a parameter object yields a
//! [`BoundSql`] from which positional values are extracted.

use crate::error::{ConfigError, Error};
use crate::property::get_property;
use crate::result_map::ResultMap;
use crate::value::Value;
use crate::Result;
use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

/// The SQL operation a statement performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlCommandType {
    Unknown,
    Insert,
    Update,
    Delete,
    Select,
    Flush,
}

impl SqlCommandType {
    pub const fn is_select(self) -> bool {
        matches!(self, SqlCommandType::Select)
    }
}

impl fmt::Display for SqlCommandType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SqlCommandType::Unknown => "UNKNOWN",
            SqlCommandType::Insert => "INSERT",
            SqlCommandType::Update => "UPDATE",
            SqlCommandType::Delete => "DELETE",
            SqlCommandType::Select => "SELECT",
            SqlCommandType::Flush => "FLUSH",
        };
        f.write_str(s)
    }
}

/// How the backend statement is issued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatementType {
    /// Plain, unprepared text
    Statement,
    /// A prepared statement with positional parameters
    #[default]
    Prepared,
    /// A stored-procedure call with IN/OUT parameters
    Callable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ParameterMode {
    #[default]
    In,
    Out,
    InOut,
}

impl ParameterMode {
    /// Does the backend write this parameter back?
    pub const fn is_output(self) -> bool {
        matches!(self, ParameterMode::Out | ParameterMode::InOut)
    }
}

/// One `#{...}` placeholder, in SQL order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterMapping {
    pub property: String,
    pub mode: ParameterMode,
}

impl ParameterMapping {
    pub fn new(property: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            mode: ParameterMode::In,
        }
    }
}

/// The compiled `#{...}` placeholder pattern, shared for the program lifetime.
fn placeholder_regex() -> Result<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"#\{([^}]*)\}").ok())
        .as_ref()
        .ok_or_else(|| config_error("placeholder pattern failed to compile".to_string()))
}

/// A parsed statement template.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlSource {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
}

impl SqlSource {
    /// Parse a template, replacing `#{property, mode=OUT}` placeholders with `?`.
    pub fn parse(template: &str) -> Result<Self> {
        let mut mappings = Vec::new();
        let mut error = None;
        let sql = placeholder_regex()?.replace_all(template, |caps: &regex::Captures<'_>| {
            match parse_placeholder(&caps[1]) {
                Ok(mapping) => mappings.push(mapping),
                Err(e) => {
                    error.get_or_insert(e);
                }
            }
            "?"
        });
        if let Some(e) = error {
            return Err(e);
        }
        Ok(Self {
            sql: sql.into_owned(),
            parameter_mappings: mappings,
        })
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }
}

fn parse_placeholder(content: &str) -> Result<ParameterMapping> {
    let mut parts = content.split(',').map(str::trim);
    let property = parts.next().unwrap_or_default();
    if property.is_empty() {
        return Err(config_error(format!(
            "Empty parameter placeholder '#{{{content}}}'"
        )));
    }
    let mut mapping = ParameterMapping::new(property);
    for attr in parts {
        let Some((key, value)) = attr.split_once('=') else {
            return Err(config_error(format!(
                "Malformed parameter attribute '{attr}' in '#{{{content}}}'"
            )));
        };
        if key.trim().eq_ignore_ascii_case("mode") {
            mapping.mode = match value.trim().to_ascii_uppercase().as_str() {
                "IN" => ParameterMode::In,
                "OUT" => ParameterMode::Out,
                "INOUT" => ParameterMode::InOut,
                other => {
                    return Err(config_error(format!("Unknown parameter mode '{other}'")));
                }
            };
        } else {
            tracing::trace!(attribute = %key.trim(), property, "Ignoring parameter attribute");
        }
    }
    Ok(mapping)
}

fn config_error(message: String) -> Error {
    Error::Config(ConfigError {
        message,
        source: None,
    })
}

/// A statement rendered against one parameter object.
#[derive(Debug, Clone)]
pub struct BoundSql {
    sql: String,
    parameter_mappings: Vec<ParameterMapping>,
    parameter_object: Value,
    additional_parameters: BTreeMap<String, Value>,
}

impl BoundSql {
    pub fn new(
        sql: impl Into<String>,
        parameter_mappings: Vec<ParameterMapping>,
        parameter_object: Value,
    ) -> Self {
        Self {
            sql: sql.into(),
            parameter_mappings,
            parameter_object,
            additional_parameters: BTreeMap::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn parameter_mappings(&self) -> &[ParameterMapping] {
        &self.parameter_mappings
    }

    pub fn parameter_object(&self) -> &Value {
        &self.parameter_object
    }

    /// Attach a parameter that takes precedence over the parameter object.
    pub fn set_additional_parameter(&mut self, name: impl Into<String>, value: Value) {
        self.additional_parameters.insert(name.into(), value);
    }

    pub fn has_additional_parameter(&self, path: &str) -> bool {
        let root = path.split('.').next().unwrap_or(path);
        self.additional_parameters.contains_key(root)
    }

    /// Resolve the value bound to a placeholder property.
    ///
    /// A scalar parameter object binds itself to every placeholder. Paths
    /// missing from a map parameter read as NULL.
    pub fn parameter_value(&self, property: &str) -> Value {
        let root = property.split('.').next().unwrap_or(property);
        if let Some(value) = self.additional_parameters.get(root) {
            return if root == property {
                value.clone()
            } else {
                let rest = &property[root.len() + 1..];
                get_property(value, rest).cloned().unwrap_or(Value::Null)
            };
        }
        match &self.parameter_object {
            Value::Map(_) => get_property(&self.parameter_object, property)
                .cloned()
                .unwrap_or(Value::Null),
            other => other.clone(),
        }
    }

    /// Positional values for every placeholder, in SQL order. Pure OUT
    /// parameters bind as NULL.
    pub fn parameter_values(&self) -> Vec<Value> {
        self.parameter_mappings
            .iter()
            .map(|m| {
                if m.mode == ParameterMode::Out {
                    Value::Null
                } else {
                    self.parameter_value(&m.property)
                }
            })
            .collect()
    }
}

/// A registered, named statement.
#[derive(Debug, Clone)]
pub struct MappedStatement {
    id: String,
    command_type: SqlCommandType,
    statement_type: StatementType,
    sql_source: SqlSource,
    result_map: Option<Arc<ResultMap>>,
    flush_cache_required: bool,
    use_cache: bool,
    dirty_select: bool,
    timeout: Option<u64>,
    key_property: Option<String>,
    resource: Option<String>,
}

impl MappedStatement {
    /// Start building a statement from an id, command type and SQL template.
    pub fn builder(
        id: impl Into<String>,
        command_type: SqlCommandType,
        sql: impl Into<String>,
    ) -> MappedStatementBuilder {
        let is_select = command_type.is_select();
        MappedStatementBuilder {
            id: id.into(),
            command_type,
            sql: sql.into(),
            statement_type: StatementType::default(),
            result_map: None,
            flush_cache_required: !is_select,
            use_cache: is_select,
            dirty_select: false,
            timeout: None,
            key_property: None,
            resource: None,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command_type(&self) -> SqlCommandType {
        self.command_type
    }

    pub fn statement_type(&self) -> StatementType {
        self.statement_type
    }

    pub fn sql_source(&self) -> &SqlSource {
        &self.sql_source
    }

    pub fn result_map(&self) -> Option<&Arc<ResultMap>> {
        self.result_map.as_ref()
    }

    /// Must the session cache be cleared before this statement runs?
    pub fn is_flush_cache_required(&self) -> bool {
        self.flush_cache_required
    }

    pub fn is_use_cache(&self) -> bool {
        self.use_cache
    }

    /// Does running this select mark the session dirty?
    pub fn is_dirty_select(&self) -> bool {
        self.dirty_select
    }

    pub fn timeout(&self) -> Option<u64> {
        self.timeout
    }

    /// Property receiving the generated key of an INSERT.
    pub fn key_property(&self) -> Option<&str> {
        self.key_property.as_deref()
    }

    /// Where this statement was declared.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    pub fn bound_sql(&self, parameter: &Value) -> BoundSql {
        BoundSql::new(
            self.sql_source.sql(),
            self.sql_source.parameter_mappings().to_vec(),
            parameter.clone(),
        )
    }
}

/// Builder for [`MappedStatement`].
#[derive(Debug)]
pub struct MappedStatementBuilder {
    id: String,
    command_type: SqlCommandType,
    sql: String,
    statement_type: StatementType,
    result_map: Option<Arc<ResultMap>>,
    flush_cache_required: bool,
    use_cache: bool,
    dirty_select: bool,
    timeout: Option<u64>,
    key_property: Option<String>,
    resource: Option<String>,
}

impl MappedStatementBuilder {
    pub fn statement_type(mut self, statement_type: StatementType) -> Self {
        self.statement_type = statement_type;
        self
    }

    pub fn result_map(mut self, result_map: ResultMap) -> Self {
        self.result_map = Some(Arc::new(result_map));
        self
    }

    pub fn flush_cache(mut self, required: bool) -> Self {
        self.flush_cache_required = required;
        self
    }

    pub fn use_cache(mut self, enabled: bool) -> Self {
        self.use_cache = enabled;
        self
    }

    pub fn dirty_select(mut self, dirty: bool) -> Self {
        self.dirty_select = dirty;
        self
    }

    pub fn timeout(mut self, seconds: u64) -> Self {
        self.timeout = Some(seconds);
        self
    }

    pub fn key_property(mut self, property: impl Into<String>) -> Self {
        self.key_property = Some(property.into());
        self
    }

    pub fn resource(mut self, resource: impl Into<String>) -> Self {
        self.resource = Some(resource.into());
        self
    }

    pub fn build(self) -> Result<MappedStatement> {
        let sql_source = SqlSource::parse(&self.sql)?;
        Ok(MappedStatement {
            id: self.id,
            command_type: self.command_type,
            statement_type: self.statement_type,
            sql_source,
            result_map: self.result_map,
            flush_cache_required: self.flush_cache_required,
            use_cache: self.use_cache,
            dirty_select: self.dirty_select,
            timeout: self.timeout,
            key_property: self.key_property,
            resource: self.resource,
        })
    }
}
