//! Attribute sets: canonical, order-independent label identities.
//!
//! An [`AttributeSet`] is the aggregation key for one series of an instrument.
//! Canonicalization sorts pairs by key and keeps the last value written for a
//! duplicated key, so any permutation of the same pairs yields an equal set.
//! The hash is computed once at construction; equality compares that hash
//! before walking the entries, keeping both operations O(n). Sets of zero or
//! one pair are stored inline.

use std::borrow::Cow;
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use smallvec::SmallVec;

/// Scalar attribute value.
#[derive(Debug, Clone)]
pub enum Value {
    String(Cow<'static, str>),
    I64(i64),
    /// Compared and hashed by bit pattern, so `NaN == NaN` here.
    F64(f64),
    Bool(bool),
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::String(a), Value::String(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a.to_bits() == b.to_bits(),
            (Value::Bool(a), Value::Bool(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            Value::String(s) => {
                state.write_u8(0);
                s.hash(state);
            }
            Value::I64(v) => {
                state.write_u8(1);
                v.hash(state);
            }
            Value::F64(v) => {
                state.write_u8(2);
                v.to_bits().hash(state);
            }
            Value::Bool(v) => {
                state.write_u8(3);
                v.hash(state);
            }
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => f.write_str(s),
            Value::I64(v) => write!(f, "{v}"),
            Value::F64(v) => write!(f, "{v}"),
            Value::Bool(v) => write!(f, "{v}"),
        }
    }
}

impl From<&'static str> for Value {
    fn from(v: &'static str) -> Self {
        Value::String(Cow::Borrowed(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(Cow::Owned(v))
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::I64(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::I64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::F64(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

/// One attribute pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct KeyValue {
    pub key: Cow<'static, str>,
    pub value: Value,
}

impl KeyValue {
    pub fn new(key: impl Into<Cow<'static, str>>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

type Entries = SmallVec<[KeyValue; 1]>;

/// Immutable, canonical attribute set used as an aggregation key.
#[derive(Debug, Clone)]
pub struct AttributeSet {
    entries: Entries,
    hash: u64,
}

impl AttributeSet {
    /// The empty set. Does not allocate.
    pub fn empty() -> Self {
        Self::from_canonical(Entries::new())
    }

    /// Canonicalize a borrowed slice of pairs (the shape `add` receives).
    /// Zero or one pair is stored inline, so a set built from `'static`
    /// pairs does not allocate.
    pub fn from_slice(pairs: &[KeyValue]) -> Self {
        match pairs {
            [] => Self::empty(),
            [one] => {
                let mut entries = Entries::new();
                entries.push(one.clone());
                Self::from_canonical(entries)
            }
            many => Self::canonicalize(many.iter().cloned().collect()),
        }
    }

    fn canonicalize(mut entries: Entries) -> Self {
        if entries.len() > 1 {
            // Stable sort keeps insertion order among equal keys; dedup then
            // swaps the later value into the retained slot (last write wins).
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            entries.dedup_by(|later, kept| {
                if later.key == kept.key {
                    std::mem::swap(later, kept);
                    true
                } else {
                    false
                }
            });
        }
        Self::from_canonical(entries)
    }

    fn from_canonical(entries: Entries) -> Self {
        let mut h = DefaultHasher::new();
        entries.len().hash(&mut h);
        for kv in &entries {
            kv.hash(&mut h);
        }
        Self {
            entries,
            hash: h.finish(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Pairs in canonical (key-sorted) order.
    pub fn iter(&self) -> impl Iterator<Item = &KeyValue> {
        self.entries.iter()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .binary_search_by(|kv| (*kv.key).cmp(key))
            .ok()
            .map(|i| &self.entries[i].value)
    }
}

impl Default for AttributeSet {
    fn default() -> Self {
        Self::empty()
    }
}

impl PartialEq for AttributeSet {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash && self.entries == other.entries
    }
}

impl Eq for AttributeSet {}

impl Hash for AttributeSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.hash);
    }
}

impl FromIterator<KeyValue> for AttributeSet {
    fn from_iter<I: IntoIterator<Item = KeyValue>>(iter: I) -> Self {
        Self::canonicalize(iter.into_iter().collect())
    }
}

impl From<&[KeyValue]> for AttributeSet {
    fn from(pairs: &[KeyValue]) -> Self {
        Self::from_slice(pairs)
    }
}
