//! Dispatch of mapper method calls.
//!
//! A [`MapperProxy`] stands in for an implementation of a mapper interface.
//! Each call is routed one of three ways:
//!
//! - methods declared on [`OBJECT_TYPE`] are answered by the proxy itself
//! - methods with a default body run that body with the proxy as receiver
//! - everything else resolves to a [`MapperMethod`] and runs on the session
//!
//! Resolved methods are memoized per proxy instance.

use crate::args::{Arg, MethodResult};
use crate::interface::{MapperInterface, MethodDecl, MethodKey, OBJECT_TYPE, object_method};
use crate::method::MapperMethod;
use crate::session::SqlSession;
use sqlmapper_core::{BindingErrorKind, Error, Result, Value};
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

static NEXT_PROXY_ID: AtomicU64 = AtomicU64::new(1);

/// Mapper interfaces known to a session factory.
#[derive(Debug, Clone, Default)]
pub struct MapperRegistry {
    known: HashMap<String, Arc<MapperInterface>>,
}

impl MapperRegistry {
    pub fn add(&mut self, interface: MapperInterface) -> Result<()> {
        if self.known.contains_key(interface.name()) {
            return Err(Error::binding(
                BindingErrorKind::UnknownMapper,
                format!("Type {} is already known to the MapperRegistry.", interface.name()),
            ));
        }
        tracing::debug!(mapper = %interface.name(), methods = interface.methods().len(), "Registered mapper");
        self.known.insert(interface.name().to_string(), Arc::new(interface));
        Ok(())
    }

    pub fn has_mapper(&self, name: &str) -> bool {
        self.known.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Result<Arc<MapperInterface>> {
        self.known.get(name).cloned().ok_or_else(|| {
            Error::binding(
                BindingErrorKind::UnknownMapper,
                format!("Type {name} is not known to the MapperRegistry."),
            )
        })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.known.keys().map(String::as_str)
    }
}

/// A session-bound implementation of one mapper interface.
pub struct MapperProxy {
    id: u64,
    session: Arc<SqlSession>,
    interface: Arc<MapperInterface>,
    method_cache: Mutex<HashMap<MethodKey, Arc<MapperMethod>>>,
}

impl MapperProxy {
    pub fn new(session: Arc<SqlSession>, interface: Arc<MapperInterface>) -> Self {
        Self {
            id: NEXT_PROXY_ID.fetch_add(1, Ordering::Relaxed),
            session,
            interface,
            method_cache: Mutex::new(HashMap::new()),
        }
    }

    pub fn interface(&self) -> &Arc<MapperInterface> {
        &self.interface
    }

    pub fn session(&self) -> &Arc<SqlSession> {
        &self.session
    }

    /// Number of methods resolved so far.
    pub fn cached_methods(&self) -> usize {
        self.method_cache
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Call a method by name.
    ///
    /// Generated keys and output parameters written by the statement are
    /// copied back into `args`.
    pub fn invoke(&self, method: &str, args: &mut [Arg]) -> Result<MethodResult> {
        let decl = self
            .interface
            .find_method(method)
            .or_else(|| object_method(method).map(Arc::new))
            .ok_or_else(|| {
                Error::binding(
                    BindingErrorKind::MethodNotFound,
                    format!("Method '{}' is not declared on {}", method, self.interface.name()),
                )
            })?;

        if decl.declaring_type == OBJECT_TYPE {
            return Ok(self.invoke_object_method(&decl, args));
        }
        if let Some(body) = &decl.default_body {
            tracing::trace!(method = %decl.name, "Invoking default method");
            return body(self, args);
        }
        self.cached_mapper_method(&decl)?.execute(&self.session, args)
    }

    /// Shorthand for [`invoke`](Self::invoke) with owned arguments.
    pub fn call(&self, method: &str, mut args: Vec<Arg>) -> Result<MethodResult> {
        self.invoke(method, &mut args)
    }

    fn cached_mapper_method(&self, decl: &MethodDecl) -> Result<Arc<MapperMethod>> {
        let mut cache = self.method_cache.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(method) = cache.get(&decl.key()) {
            return Ok(Arc::clone(method));
        }
        let method = Arc::new(MapperMethod::new(
            self.session.configuration(),
            &self.interface,
            decl,
        )?);
        cache.insert(decl.key(), Arc::clone(&method));
        Ok(method)
    }

    fn invoke_object_method(&self, decl: &MethodDecl, args: &[Arg]) -> MethodResult {
        let identity = Value::BigInt(self.id as i64);
        match decl.name.as_str() {
            "to_string" => MethodResult::Value(Value::Text(self.to_string())),
            "hash_code" => MethodResult::Value(identity),
            _ => MethodResult::Value(Value::Bool(
                args.first().and_then(Arg::as_value) == Some(&identity),
            )),
        }
    }
}

impl PartialEq for MapperProxy {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for MapperProxy {}

impl Hash for MapperProxy {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for MapperProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MapperProxy<{}>@{}", self.interface.name(), self.id)
    }
}

impl fmt::Debug for MapperProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MapperProxy")
            .field("id", &self.id)
            .field("interface", &self.interface.name())
            .field("cached_methods", &self.cached_methods())
            .finish_non_exhaustive()
    }
}
