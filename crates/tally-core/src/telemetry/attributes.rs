//! Attribute model shared by measurements, spans and resources
//!
//! Attribute values form a closed set of scalars. Anything else (arrays, objects,
//! null) is rejected at the JSON boundary with [`TallyError::UnsupportedAttribute`]
//! instead of being stringified.

use crate::error::{TallyError, TallyResult};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A single attribute value
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl AttributeValue {
    fn rank(&self) -> u8 {
        match self {
            Self::Bool(_) => 0,
            Self::Int(_) => 1,
            Self::Float(_) => 2,
            Self::String(_) => 3,
        }
    }

    /// A float attribute, with `-0.0` folded into `0.0`
    pub fn float(value: f64) -> Self {
        Self::Float(canonical_float(value))
    }

    /// Convert a JSON scalar, rejecting nested or null values
    pub fn from_json(key: &str, value: &serde_json::Value) -> TallyResult<Self> {
        use serde_json::Value;

        match value {
            Value::Bool(b) => Ok(Self::Bool(*b)),
            Value::String(s) => Ok(Self::String(s.clone())),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Ok(Self::Int(i))
                } else if let Some(f) = n.as_f64() {
                    Ok(Self::float(f))
                } else {
                    Err(TallyError::unsupported_attribute(
                        key,
                        format!("number {} is not representable", n),
                    ))
                }
            }
            Value::Null => Err(TallyError::unsupported_attribute(key, "null values are not allowed")),
            Value::Array(_) => Err(TallyError::unsupported_attribute(key, "arrays are not allowed")),
            Value::Object(_) => Err(TallyError::unsupported_attribute(key, "nested objects are not allowed")),
        }
    }
}

/// Both zeroes map to `0.0` so they key the same series.
fn canonical_float(value: f64) -> f64 {
    if value == 0.0 { 0.0 } else { value }
}

// Floats compare by bit pattern so that values can key a series map.
impl PartialEq for AttributeValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => canonical_float(*a).to_bits() == canonical_float(*b).to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for AttributeValue {}

impl Hash for AttributeValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => canonical_float(*f).to_bits().hash(state),
            Self::String(s) => s.hash(state),
        }
    }
}

impl PartialOrd for AttributeValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for AttributeValue {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int(a), Self::Int(b)) => a.cmp(b),
            (Self::Float(a), Self::Float(b)) => canonical_float(*a).total_cmp(&canonical_float(*b)),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl fmt::Display for AttributeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(v) => write!(f, "{}", v),
            Self::String(s) => write!(f, "{}", s),
        }
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for AttributeValue {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for AttributeValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

// values past i64::MAX keep their magnitude as a float
impl From<usize> for AttributeValue {
    fn from(value: usize) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Int)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::float(value)
    }
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// Sorted attribute map.
///
/// Two sets with the same key/value pairs are equal and hash identically no matter
/// the insertion order, which is what makes them usable as series identity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeSet(BTreeMap<String, AttributeValue>);

impl AttributeSet {
    /// Create an empty attribute set
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<AttributeValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert or replace an attribute
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<AttributeValue>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&AttributeValue> {
        self.0.get(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &AttributeValue)> {
        self.0.iter()
    }

    /// Merge another set into this one, the other set wins on conflicts
    pub fn extend(&mut self, other: AttributeSet) {
        self.0.extend(other.0);
    }

    /// Build a set from a JSON object of scalars
    pub fn from_json(value: &serde_json::Value) -> TallyResult<Self> {
        let object = value.as_object().ok_or_else(|| {
            TallyError::unsupported_attribute("<root>", "attributes must be a JSON object")
        })?;

        let mut set = Self::new();
        for (key, value) in object {
            set.0.insert(key.clone(), AttributeValue::from_json(key, value)?);
        }
        Ok(set)
    }
}

impl<K, V> FromIterator<(K, V)> for AttributeSet
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for AttributeSet
where
    K: Into<String>,
    V: Into<AttributeValue>,
{
    fn from(pairs: [(K, V); N]) -> Self {
        pairs.into_iter().collect()
    }
}

impl fmt::Display for AttributeSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", key, value)?;
        }
        write!(f, "}}")
    }
}
