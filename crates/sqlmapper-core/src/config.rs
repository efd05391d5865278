//! Engine settings and the statement registry.

use crate::error::{ConfigError, Error};
use crate::property::{Mapped, RecordType};
use crate::statement::MappedStatement;
use crate::types::TypeRef;
use crate::value::Value;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Lifetime of session-cache entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalCacheScope {
    /// Entries live until the session commits, rolls back, updates or closes.
    #[default]
    Session,
    /// Entries are cleared after every top-level query.
    Statement,
}

/// Statement execution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutorType {
    /// A fresh statement per call
    #[default]
    Simple,
    /// Prepared statements reused by SQL text
    Reuse,
    /// Updates buffered until flush
    Batch,
}

impl fmt::Display for ExecutorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ExecutorType::Simple => "SIMPLE",
            ExecutorType::Reuse => "REUSE",
            ExecutorType::Batch => "BATCH",
        })
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub local_cache_scope: LocalCacheScope,
    /// Name parameters after their declared source names when unannotated.
    pub use_actual_param_name: bool,
    pub default_executor_type: ExecutorType,
    /// Statement timeout in seconds applied when a statement declares none.
    pub default_statement_timeout: Option<u64>,
    /// Map `user_name` columns onto `userName` properties.
    pub map_underscore_to_camel_case: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            local_cache_scope: LocalCacheScope::Session,
            use_actual_param_name: true,
            default_executor_type: ExecutorType::Simple,
            default_statement_timeout: None,
            map_underscore_to_camel_case: false,
        }
    }
}

impl Settings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse settings from JSON. Missing fields keep their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::Config(ConfigError {
                message: format!("invalid settings: {e}"),
                source: Some(Box::new(e)),
            })
        })
    }

    pub fn local_cache_scope(mut self, scope: LocalCacheScope) -> Self {
        self.local_cache_scope = scope;
        self
    }

    pub fn use_actual_param_name(mut self, enabled: bool) -> Self {
        self.use_actual_param_name = enabled;
        self
    }

    pub fn default_executor_type(mut self, executor_type: ExecutorType) -> Self {
        self.default_executor_type = executor_type;
        self
    }

    pub fn default_statement_timeout(mut self, seconds: u64) -> Self {
        self.default_statement_timeout = Some(seconds);
        self
    }

    pub fn map_underscore_to_camel_case(mut self, enabled: bool) -> Self {
        self.map_underscore_to_camel_case = enabled;
        self
    }
}

/// The environment a configuration is bound to. Its id participates in cache keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    pub id: String,
}

impl Environment {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

/// Creates container objects for declared types.
pub trait ObjectFactory: Send + Sync {
    /// Is this type a collection the factory can fill?
    fn is_collection(&self, ty: &TypeRef) -> bool;

    /// Create an empty instance.
    fn create(&self, ty: &TypeRef) -> Value;
}

/// Creates arrays for collection types, maps for map types and
/// NULL-initialized instances for registered records.
#[derive(Debug, Clone, Default)]
pub struct DefaultObjectFactory {
    records: HashMap<String, RecordType>,
}

impl DefaultObjectFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: HashMap<String, RecordType>) -> Self {
        Self { records }
    }
}

impl ObjectFactory for DefaultObjectFactory {
    fn is_collection(&self, ty: &TypeRef) -> bool {
        matches!(
            ty,
            TypeRef::List(_) | TypeRef::Array(_) | TypeRef::Collection(..)
        )
    }

    fn create(&self, ty: &TypeRef) -> Value {
        match ty {
            TypeRef::List(_) | TypeRef::Array(_) | TypeRef::Collection(..) => {
                Value::Array(Vec::new())
            }
            TypeRef::Map => Value::map(),
            TypeRef::Record(name) => self
                .records
                .get(name)
                .map_or_else(Value::map, RecordType::instantiate),
            _ => Value::Null,
        }
    }
}

/// The statement registry plus settings shared by every session.
pub struct Configuration {
    settings: Settings,
    environment: Option<Environment>,
    statements: HashMap<String, Arc<MappedStatement>>,
    records: HashMap<String, RecordType>,
    object_factory: Option<Arc<dyn ObjectFactory>>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl Configuration {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            environment: None,
            statements: HashMap::new(),
            records: HashMap::new(),
            object_factory: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = Some(environment);
    }

    /// Replace the object factory. Registered records are then the custom
    /// factory's concern.
    pub fn set_object_factory(&mut self, factory: Arc<dyn ObjectFactory>) {
        self.object_factory = Some(factory);
    }

    pub fn object_factory(&self) -> Arc<dyn ObjectFactory> {
        match &self.object_factory {
            Some(factory) => Arc::clone(factory),
            None => Arc::new(DefaultObjectFactory::with_records(self.records.clone())),
        }
    }

    /// Register a statement. A later registration under the same id wins.
    pub fn add_statement(&mut self, statement: MappedStatement) {
        let id = statement.id().to_string();
        if self.statements.contains_key(&id) {
            tracing::warn!(statement = %id, "Replacing mapped statement");
        } else {
            tracing::debug!(statement = %id, command = %statement.command_type(), "Registering mapped statement");
        }
        self.statements.insert(id, Arc::new(statement));
    }

    pub fn has_statement(&self, id: &str) -> bool {
        self.statements.contains_key(id)
    }

    pub fn mapped_statement(&self, id: &str) -> Result<Arc<MappedStatement>> {
        self.statements
            .get(id)
            .cloned()
            .ok_or_else(|| Error::statement_not_found(id))
    }

    pub fn statement_ids(&self) -> impl Iterator<Item = &str> {
        self.statements.keys().map(String::as_str)
    }

    /// Register a mapped record type by its type name.
    pub fn register_record<T: Mapped>(&mut self) -> RecordType {
        let record = T::record_type();
        self.add_record(record.clone());
        record
    }

    pub fn add_record(&mut self, record: RecordType) {
        self.records.insert(record.name.clone(), record);
    }

    pub fn record(&self, name: &str) -> Option<&RecordType> {
        self.records.get(name)
    }
}

impl fmt::Debug for Configuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Configuration")
            .field("settings", &self.settings)
            .field("environment", &self.environment)
            .field("statements", &self.statements.len())
            .field("records", &self.records.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::statement::SqlCommandType;

    #[test]
    fn settings_from_partial_json() {
        let settings = Settings::from_json(
            r#"{"local_cache_scope": "statement", "default_executor_type": "batch"}"#,
        )
        .unwrap();
        assert_eq!(settings.local_cache_scope, LocalCacheScope::Statement);
        assert_eq!(settings.default_executor_type, ExecutorType::Batch);
        assert!(settings.use_actual_param_name);

        assert!(Settings::from_json("{not json").is_err());
    }

    #[test]
    fn missing_statement_is_a_binding_error() {
        let mut config = Configuration::default();
        config.add_statement(
            MappedStatement::builder("UserMapper.count", SqlCommandType::Select, "SELECT 1")
                .build()
                .unwrap(),
        );
        assert!(config.has_statement("UserMapper.count"));
        let err = config.mapped_statement("UserMapper.missing").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Mapped statements collection does not contain value for UserMapper.missing"
        );
    }

    #[test]
    fn default_factory_builds_containers_and_records() {
        let mut config = Configuration::default();
        config.add_record(RecordType::new("User", ["id", "name"]));
        let factory = config.object_factory();

        let list = TypeRef::list(TypeRef::record("User"));
        assert!(factory.is_collection(&list));
        assert_eq!(factory.create(&list), Value::Array(Vec::new()));
        assert_eq!(
            factory.create(&TypeRef::record("User")),
            Value::from_pairs([("id", Value::Null), ("name", Value::Null)])
        );
        assert!(!factory.is_collection(&TypeRef::Map));
    }
}
