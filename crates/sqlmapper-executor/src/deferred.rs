//! Deferred assignment of nested query results.

use crate::cache::CacheEntry;
use crate::cache_key::CacheKey;
use crate::result_set::extract_object_from_list;
use sqlmapper_core::{ObjectFactory, Result, ResultObject, TypeRef};
use std::fmt;
use std::sync::Arc;

/// A pending `owner.property = <cached rows for key>` assignment.
pub struct DeferredLoad {
    owner: ResultObject,
    property: String,
    key: CacheKey,
    target: TypeRef,
    factory: Arc<dyn ObjectFactory>,
}

impl DeferredLoad {
    pub fn new(
        owner: ResultObject,
        property: impl Into<String>,
        key: CacheKey,
        target: TypeRef,
        factory: Arc<dyn ObjectFactory>,
    ) -> Self {
        Self {
            owner,
            property: property.into(),
            key,
            target,
            factory,
        }
    }

    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    pub fn property(&self) -> &str {
        &self.property
    }

    /// Only finished results can be assigned.
    pub fn can_load(entry: &CacheEntry) -> bool {
        entry.is_present()
    }

    /// Assign the cached rows. Entries that are not present are skipped.
    pub fn load(&self, entry: &CacheEntry) -> Result<()> {
        let CacheEntry::Present(rows) = entry else {
            tracing::trace!(property = %self.property, key = %self.key, "Nothing cached; skipping deferred load");
            return Ok(());
        };
        let rows = rows.iter().map(ResultObject::snapshot).collect();
        let value = extract_object_from_list(rows, &self.target, self.factory.as_ref())?;
        tracing::debug!(property = %self.property, "Resolved deferred load");
        self.owner.set_property(&self.property, value)
    }
}

impl fmt::Debug for DeferredLoad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredLoad")
            .field("property", &self.property)
            .field("key", &self.key)
            .field("target", &self.target)
            .finish_non_exhaustive()
    }
}
