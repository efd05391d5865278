//! Composite cache keys.
//!
//! A [`CacheKey`] accumulates a running multiplicative hash and an additive
//! checksum over an ordered list of components. Equality compares the
//! summaries first and then every component, so distinct component lists
//! with colliding hashes still compare unequal.

use sqlmapper_core::Value;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

const MULTIPLIER: i32 = 37;
const INITIAL_HASHCODE: i32 = 17;

/// An identity for one (statement, bounds, SQL, parameters, environment) tuple.
#[derive(Debug, Clone)]
pub struct CacheKey {
    hashcode: i32,
    checksum: i64,
    count: usize,
    parts: Vec<Value>,
}

impl Default for CacheKey {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheKey {
    pub fn new() -> Self {
        Self {
            hashcode: INITIAL_HASHCODE,
            checksum: 0,
            count: 0,
            parts: Vec::new(),
        }
    }

    /// Build a key from components in order.
    pub fn from_parts(parts: impl IntoIterator<Item = Value>) -> Self {
        let mut key = Self::new();
        key.update_all(parts);
        key
    }

    /// Fold one component into the key.
    pub fn update(&mut self, value: impl Into<Value>) {
        let value = value.into();
        let mut base = value_hash(&value);
        self.count += 1;
        self.checksum += i64::from(base);
        base = base.wrapping_mul(self.count as i32);
        self.hashcode = MULTIPLIER.wrapping_mul(self.hashcode).wrapping_add(base);
        self.parts.push(value);
    }

    pub fn update_all(&mut self, values: impl IntoIterator<Item = Value>) {
        for value in values {
            self.update(value);
        }
    }

    pub fn hashcode(&self) -> i32 {
        self.hashcode
    }

    pub fn checksum(&self) -> i64 {
        self.checksum
    }

    /// Number of components folded in.
    pub fn update_count(&self) -> usize {
        self.count
    }

    pub fn parts(&self) -> &[Value] {
        &self.parts
    }
}

/// 32-bit hash of one component. NULL hashes to 1.
fn value_hash(value: &Value) -> i32 {
    if value.is_null() {
        return 1;
    }
    let mut hasher = DefaultHasher::new();
    hash_value(value, &mut hasher);
    let h = hasher.finish();
    (h ^ (h >> 32)) as i32
}

fn hash_value(value: &Value, hasher: &mut impl Hasher) {
    match value {
        Value::Null => 0u8.hash(hasher),
        Value::Bool(b) => {
            1u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Int(i) => {
            2u8.hash(hasher);
            i.hash(hasher);
        }
        Value::BigInt(i) => {
            3u8.hash(hasher);
            i.hash(hasher);
        }
        Value::Double(f) => {
            4u8.hash(hasher);
            f.to_bits().hash(hasher);
        }
        Value::Decimal(s) => {
            5u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Text(s) => {
            6u8.hash(hasher);
            s.hash(hasher);
        }
        Value::Bytes(b) => {
            7u8.hash(hasher);
            b.hash(hasher);
        }
        Value::Timestamp(t) => {
            8u8.hash(hasher);
            t.hash(hasher);
        }
        Value::Json(j) => {
            9u8.hash(hasher);
            j.to_string().hash(hasher);
        }
        Value::Array(items) => {
            10u8.hash(hasher);
            items.len().hash(hasher);
            for item in items {
                hash_value(item, hasher);
            }
        }
        Value::Map(map) => {
            11u8.hash(hasher);
            map.len().hash(hasher);
            for (k, v) in map {
                k.hash(hasher);
                hash_value(v, hasher);
            }
        }
    }
}

/// Exact component equality. Floats compare by bit pattern so NaN keys match.
fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Double(x), Value::Double(y)) => x.to_bits() == y.to_bits(),
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| value_eq(x, y))
        }
        (Value::Map(xs), Value::Map(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .zip(ys)
                    .all(|((kx, vx), (ky, vy))| kx == ky && value_eq(vx, vy))
        }
        _ => a == b,
    }
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        if self.hashcode != other.hashcode
            || self.checksum != other.checksum
            || self.count != other.count
        {
            return false;
        }
        self.parts
            .iter()
            .zip(&other.parts)
            .all(|(a, b)| value_eq(a, b))
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hashcode.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for part in &self.parts {
            write!(f, ":{part}")?;
        }
        Ok(())
    }
}
