//! Leaf codec
//!
//! Scalar conversion between tree values and Rust values. A kind mismatch is a
//! typed validation error; nothing is coerced. Defaults are only substituted
//! when the key is absent.

use crate::error::{ProviderError, Result};
use crate::schema::{AttributeTree, Value, ValueKind};

pub trait Leaf: Sized {
    const KIND: ValueKind;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

impl Leaf for String {
    const KIND: ValueKind = ValueKind::String;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }
}

impl Leaf for i64 {
    const KIND: ValueKind = ValueKind::Int;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_int()
    }

    fn into_value(self) -> Value {
        Value::Int(self)
    }
}

impl Leaf for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }
}

/// Decode one scalar for the API side
pub fn to_api<T: Leaf>(field: &str, value: &Value) -> Result<T> {
    T::from_value(value).ok_or_else(|| {
        ProviderError::validation(
            field,
            format!("expected {}, got {}", T::KIND.name(), value.kind_name()),
        )
    })
}

/// Encode one API scalar into the tree
pub fn from_api<T: Leaf>(value: T) -> Value {
    value.into_value()
}

impl AttributeTree {
    /// Typed lookup; `None` when the key is absent
    pub fn leaf<T: Leaf>(&self, key: &str) -> Result<Option<T>> {
        self.get(key).map(|v| to_api(key, v)).transpose()
    }

    /// Typed lookup with a declared default for an absent key
    pub fn leaf_or<T: Leaf>(&self, key: &str, default: T) -> Result<T> {
        Ok(self.leaf(key)?.unwrap_or(default))
    }

    pub fn leaf_or_default<T: Leaf + Default>(&self, key: &str) -> Result<T> {
        self.leaf_or(key, T::default())
    }

    pub fn required_leaf<T: Leaf>(&self, key: &str) -> Result<T> {
        self.leaf(key)?
            .ok_or_else(|| ProviderError::validation(key, "required field is not set"))
    }

    /// A list of scalars; an absent key is an empty list
    pub fn leaves<T: Leaf>(&self, key: &str) -> Result<Vec<T>> {
        let Some(value) = self.get(key) else {
            return Ok(Vec::new());
        };
        let Some(items) = value.as_list() else {
            return Err(ProviderError::validation(
                key,
                format!("expected list of {}, got {}", T::KIND.name(), value.kind_name()),
            ));
        };
        items
            .iter()
            .enumerate()
            .map(|(i, item)| to_api(&format!("{key}.{i}"), item))
            .collect()
    }

    pub fn strings(&self, key: &str) -> Result<Vec<String>> {
        self.leaves(key)
    }
}
