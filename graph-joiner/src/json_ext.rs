//! JSON values flowing through resolution.
//!
//! Rows returned by adapters, resolved results and field arguments are all
//! [`Object`]s so that nested relationship values can be folded in without
//! any conversion.

use std::hash::Hash;
use std::hash::Hasher;

use serde::Serialize;
pub use serde_json_bytes::ByteString;
pub use serde_json_bytes::json;

/// A JSON value.
pub type Value = serde_json_bytes::Value;

/// A JSON object.
pub type Object = serde_json_bytes::Map<ByteString, Value>;

/// An ordered tuple of join-key values.
///
/// Two keys are equal when their values are structurally equal, position by
/// position. The `Hash` implementation is consistent with that equality so
/// keys can bucket child results in a hash map.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct JoinKey(Vec<Value>);

impl JoinKey {
    /// The key of the root relationship, which is never correlated to a row.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<Value> for JoinKey {
    fn from_iter<T: IntoIterator<Item = Value>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl PartialEq for JoinKey {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for JoinKey {}

impl Hash for JoinKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.len().hash(state);
        for value in &self.0 {
            hash_value(value, state);
        }
    }
}

fn hash_value<H: Hasher>(value: &Value, state: &mut H) {
    std::mem::discriminant(value).hash(state);
    match value {
        Value::Null => {}
        Value::Bool(b) => b.hash(state),
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                0u8.hash(state);
                u.hash(state);
            } else if let Some(i) = n.as_i64() {
                1u8.hash(state);
                i.hash(state);
            } else if let Some(f) = n.as_f64() {
                2u8.hash(state);
                // 0.0 and -0.0 compare equal
                let f = if f == 0.0 { 0.0f64 } else { f };
                f.to_bits().hash(state);
            }
        }
        Value::String(s) => s.as_str().hash(state),
        Value::Array(values) => {
            values.len().hash(state);
            for value in values {
                hash_value(value, state);
            }
        }
        // Object equality ignores key order, so only the size can take part.
        Value::Object(object) => object.len().hash(state),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of(key: &JoinKey) -> u64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        hasher.finish()
    }

    #[test]
    fn equal_keys_hash_the_same() {
        let left = JoinKey::new(vec![json!(1), json!("a"), json!({"x": 1, "y": [true]})]);
        let right = JoinKey::new(vec![json!(1), json!("a"), json!({"x": 1, "y": [true]})]);
        assert_eq!(left, right);
        assert_eq!(hash_of(&left), hash_of(&right));
    }

    #[test]
    fn keys_compare_position_by_position() {
        let left = JoinKey::new(vec![json!(1), json!(2)]);
        let right = JoinKey::new(vec![json!(2), json!(1)]);
        assert_ne!(left, right);
        assert_ne!(JoinKey::new(vec![json!(1)]), JoinKey::new(vec![json!("1")]));
    }

    #[test]
    fn empty_key_is_the_root_key() {
        assert!(JoinKey::empty().is_empty());
        assert_eq!(JoinKey::empty(), JoinKey::from_iter(Vec::new()));
    }
}
