//! Session-scoped result cache.
//!
//! Entries are tagged so a key whose query is still running can be told
//! apart from a missing key. Nested selects consult that distinction to
//! break cycles: a `Pending` hit means the owning query will finish first.

use crate::cache_key::CacheKey;
use sqlmapper_core::{ResultObject, Value};
use std::collections::HashMap;

/// The state of one cache key.
#[derive(Debug, Clone)]
pub enum CacheEntry {
    /// Never cached.
    Absent,
    /// A query for this key is in flight.
    Pending,
    /// A finished query's mapped rows.
    Present(Vec<ResultObject>),
}

impl CacheEntry {
    pub fn is_absent(&self) -> bool {
        matches!(self, CacheEntry::Absent)
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, CacheEntry::Pending)
    }

    pub fn is_present(&self) -> bool {
        matches!(self, CacheEntry::Present(_))
    }
}

/// An unbounded map from [`CacheKey`] to [`CacheEntry`].
#[derive(Debug, Default)]
pub struct PerpetualCache {
    id: String,
    entries: HashMap<CacheKey, CacheEntry>,
}

impl PerpetualCache {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entries: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// The entry for a key. Missing keys read as [`CacheEntry::Absent`].
    pub fn lookup(&self, key: &CacheKey) -> CacheEntry {
        self.entries.get(key).cloned().unwrap_or(CacheEntry::Absent)
    }

    pub fn put_pending(&mut self, key: CacheKey) {
        self.entries.insert(key, CacheEntry::Pending);
    }

    pub fn put(&mut self, key: CacheKey, rows: Vec<ResultObject>) {
        self.entries.insert(key, CacheEntry::Present(rows));
    }

    pub fn remove(&mut self, key: &CacheKey) -> Option<CacheEntry> {
        self.entries.remove(key)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Output-parameter snapshots of callable statements, keyed like results.
#[derive(Debug, Default)]
pub struct OutputParameterCache {
    entries: HashMap<CacheKey, Value>,
}

impl OutputParameterCache {
    pub fn get(&self, key: &CacheKey) -> Option<&Value> {
        self.entries.get(key)
    }

    pub fn put(&mut self, key: CacheKey, parameter: Value) {
        self.entries.insert(key, parameter);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(n: i32) -> CacheKey {
        CacheKey::from_parts([Value::from("M.find"), Value::Int(n)])
    }

    #[test]
    fn entries_move_from_absent_to_present() {
        let mut cache = PerpetualCache::new("LocalCache");
        assert!(cache.lookup(&key(1)).is_absent());

        cache.put_pending(key(1));
        assert!(cache.lookup(&key(1)).is_pending());

        cache.put(key(1), vec![ResultObject::new(Value::Int(9))]);
        match cache.lookup(&key(1)) {
            CacheEntry::Present(rows) => assert_eq!(rows[0].snapshot(), Value::Int(9)),
            other => panic!("unexpected entry {other:?}"),
        }
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_and_remove() {
        let mut cache = PerpetualCache::new("LocalCache");
        cache.put_pending(key(1));
        cache.put(key(2), Vec::new());
        assert!(cache.remove(&key(1)).is_some());
        assert!(cache.lookup(&key(1)).is_absent());
        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn cached_rows_share_objects() {
        let mut cache = PerpetualCache::new("LocalCache");
        let row = ResultObject::new(Value::map());
        cache.put(key(1), vec![row.clone()]);
        row.set_property("name", Value::from("x")).unwrap();
        let CacheEntry::Present(rows) = cache.lookup(&key(1)) else {
            panic!("expected a present entry");
        };
        assert_eq!(rows[0].get_property("name"), Some(Value::from("x")));
    }
}
