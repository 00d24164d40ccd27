//! Attribute trees
//!
//! The host framework hands every lifecycle callback a dynamically typed tree.
//! Leaves are strings, integers or booleans; containers are lists and nested
//! records. JSON `null` never becomes a value: a null key is an absent key.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Record(AttributeTree),
}

impl Value {
    /// Human readable kind, used in validation messages
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Str(_) => "string",
            Value::List(_) => "list",
            Value::Record(_) => "block",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&AttributeTree> {
        match self {
            Value::Record(tree) => Some(tree),
            _ => None,
        }
    }

    /// Zero values count as "not set" for conflict and required-with checks
    pub fn is_zero(&self) -> bool {
        match self {
            Value::Bool(b) => !b,
            Value::Int(n) => *n == 0,
            Value::Str(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Record(tree) => tree.is_empty(),
        }
    }

    /// Convert a free-form JSON payload value. Integers stay exact; floats
    /// become their decimal text; nulls yield `None`.
    pub fn from_json(value: &JsonValue) -> Option<Value> {
        match value {
            JsonValue::Null => None,
            JsonValue::Bool(b) => Some(Value::Bool(*b)),
            JsonValue::Number(n) => Some(match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Str(n.to_string()),
            }),
            JsonValue::String(s) => Some(Value::Str(s.clone())),
            JsonValue::Array(items) => Some(Value::List(
                items.iter().filter_map(Value::from_json).collect(),
            )),
            JsonValue::Object(map) => Some(Value::Record(AttributeTree::from_json_map(map))),
        }
    }

    pub fn to_json(&self) -> JsonValue {
        match self {
            Value::Bool(b) => JsonValue::Bool(*b),
            Value::Int(n) => JsonValue::from(*n),
            Value::Str(s) => JsonValue::String(s.clone()),
            Value::List(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Value::Record(tree) => JsonValue::Object(tree.to_json_map()),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<AttributeTree> for Value {
    fn from(tree: AttributeTree) -> Self {
        Value::Record(tree)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<Vec<String>> for Value {
    fn from(items: Vec<String>) -> Self {
        Value::List(items.into_iter().map(Value::Str).collect())
    }
}

impl From<&[String]> for Value {
    fn from(items: &[String]) -> Self {
        Value::List(items.iter().cloned().map(Value::Str).collect())
    }
}

impl From<&[i64]> for Value {
    fn from(items: &[i64]) -> Self {
        Value::List(items.iter().copied().map(Value::Int).collect())
    }
}

/// Ordered mapping from field name to value
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AttributeTree(BTreeMap<String, Value>);

impl AttributeTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key)
    }

    /// Builder-style insert
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    /// Insert only when the value is present
    pub fn with_opt<V: Into<Value>>(mut self, key: impl Into<String>, value: Option<V>) -> Self {
        if let Some(value) = value {
            self.insert(key, value);
        }
        self
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// True when the key is present with a non-zero value
    pub fn is_populated(&self, key: &str) -> bool {
        self.get(key).is_some_and(|v| !v.is_zero())
    }

    /// Copy every key of `other` over this tree
    pub fn overlay(&mut self, other: AttributeTree) {
        self.0.extend(other.0);
    }

    /// A copy holding only the listed keys that are present
    pub fn project<'a>(&self, keys: impl IntoIterator<Item = &'a str>) -> AttributeTree {
        AttributeTree(
            keys.into_iter()
                .filter_map(|k| self.0.get(k).map(|v| (k.to_string(), v.clone())))
                .collect(),
        )
    }

    pub fn from_json_map(map: &serde_json::Map<String, JsonValue>) -> Self {
        AttributeTree(
            map.iter()
                .filter_map(|(k, v)| Value::from_json(v).map(|v| (k.clone(), v)))
                .collect(),
        )
    }

    pub fn to_json_map(&self) -> serde_json::Map<String, JsonValue> {
        self.0.iter().map(|(k, v)| (k.clone(), v.to_json())).collect()
    }
}

/// Decodes through `from_json`, so files and payloads agree on floats
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(deserializer)?;
        Value::from_json(&raw).ok_or_else(|| D::Error::custom("null is not an attribute value"))
    }
}

impl<'de> Deserialize<'de> for AttributeTree {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Option<Value>>::deserialize(deserializer)?;
        Ok(AttributeTree(
            raw.into_iter().filter_map(|(k, v)| v.map(|v| (k, v))).collect(),
        ))
    }
}

impl FromIterator<(String, Value)> for AttributeTree {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        AttributeTree(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_drops_null_keys() {
        let tree: AttributeTree = serde_json::from_value(json!({
            "name": "prod",
            "duration": 3600,
            "secret_key": null,
            "enabled": true,
            "resource_types": ["instance", "volume"],
        }))
        .unwrap();

        assert!(!tree.contains("secret_key"));
        assert_eq!(tree.get("duration"), Some(&Value::Int(3600)));
        assert_eq!(tree.get("enabled"), Some(&Value::Bool(true)));
        assert_eq!(
            tree.get("resource_types").and_then(Value::as_list).map(<[Value]>::len),
            Some(2)
        );
    }

    #[test]
    fn test_large_integer_ids_round_trip_exactly() {
        let id = 9_007_199_254_740_993_i64; // not representable as f64
        let value = Value::from_json(&json!(id)).unwrap();
        assert_eq!(value, Value::Int(id));
        assert_eq!(value.to_json(), json!(id));
    }

    #[test]
    fn test_deserialized_floats_match_from_json() {
        let value: Value = serde_json::from_str("1.5").unwrap();
        assert_eq!(value, Value::Str("1.5".to_string()));
        assert_eq!(Some(value), Value::from_json(&json!(1.5)));

        let tree: AttributeTree = serde_json::from_str(r#"{"threshold": 0.25, "tags": [1, 2.5, null]}"#).unwrap();
        assert_eq!(tree.get("threshold"), Some(&Value::Str("0.25".to_string())));
        assert_eq!(
            tree.get("tags"),
            Some(&Value::List(vec![Value::Int(1), Value::Str("2.5".to_string())]))
        );
        assert!(serde_json::from_str::<Value>("null").is_err());
    }

    #[test]
    fn test_float_json_becomes_text() {
        assert_eq!(Value::from_json(&json!(1.5)), Some(Value::Str("1.5".to_string())));
    }

    #[test]
    fn test_empty_string_is_present_but_zero() {
        let tree = AttributeTree::new().with("description", "");
        assert!(tree.contains("description"));
        assert!(!tree.is_populated("description"));
    }

    #[test]
    fn test_overlay_replaces_keys() {
        let mut base = AttributeTree::new().with("name", "old").with("api_key", "secret");
        base.overlay(AttributeTree::new().with("name", "new").with("status", "ok"));
        assert_eq!(base.get("name"), Some(&Value::from("new")));
        assert_eq!(base.get("api_key"), Some(&Value::from("secret")));
        assert_eq!(base.len(), 3);
    }
}
