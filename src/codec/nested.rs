//! Nested-block codec
//!
//! `Expand` builds a fresh API value from a tree and either succeeds whole or
//! fails with a descriptive error; the caller's state is never touched.
//! `Flatten` cannot fail: anything the platform left out comes back as the
//! field's zero value so the host sees a stable shape on every read.

use crate::error::{ProviderError, Result};
use crate::schema::{AttributeTree, Value};
use serde_json::{Map, Value as JsonValue};

pub trait Expand: Sized {
    fn expand(tree: &AttributeTree) -> Result<Self>;
}

pub trait Flatten {
    fn flatten(&self) -> AttributeTree;
}

fn records<'a>(tree: &'a AttributeTree, key: &str) -> Result<Vec<&'a AttributeTree>> {
    let Some(value) = tree.get(key) else {
        return Ok(Vec::new());
    };
    let Some(items) = value.as_list() else {
        return Err(ProviderError::validation(
            key,
            format!("expected list of block, got {}", value.kind_name()),
        ));
    };
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_record().ok_or_else(|| {
                ProviderError::validation(
                    format!("{key}.{i}"),
                    format!("expected block, got {}", item.kind_name()),
                )
            })
        })
        .collect()
}

/// Expand a list-typed nested field, preserving order
pub fn expand_list<T: Expand>(tree: &AttributeTree, key: &str) -> Result<Vec<T>> {
    records(tree, key)?.into_iter().map(T::expand).collect()
}

/// Expand a set-typed nested field. Order carries no meaning and duplicates
/// are passed through for the platform to resolve.
pub fn expand_set<T: Expand>(tree: &AttributeTree, key: &str) -> Result<Vec<T>> {
    expand_list(tree, key)
}

/// Expand a set declared to hold exactly one record
pub fn expand_single<T: Expand>(tree: &AttributeTree, key: &str) -> Result<T> {
    expand_optional_single(tree, key)?.ok_or_else(|| ProviderError::missing_block(key))
}

pub fn expand_optional_single<T: Expand>(tree: &AttributeTree, key: &str) -> Result<Option<T>> {
    records(tree, key)?.into_iter().next().map(T::expand).transpose()
}

/// Free-form map field; `None` when absent
pub fn expand_map(tree: &AttributeTree, key: &str) -> Result<Option<Map<String, JsonValue>>> {
    match tree.get(key) {
        None => Ok(None),
        Some(Value::Record(map)) => Ok(Some(map.to_json_map())),
        Some(other) => Err(ProviderError::validation(
            key,
            format!("expected map, got {}", other.kind_name()),
        )),
    }
}

pub fn flatten_list<T: Flatten>(items: &[T]) -> Value {
    Value::List(items.iter().map(|i| Value::Record(i.flatten())).collect())
}

/// A single-element set; `None` flattens to an empty set
pub fn flatten_single<T: Flatten>(item: Option<&T>) -> Value {
    Value::List(item.map(|i| Value::Record(i.flatten())).into_iter().collect())
}

/// A nil map from the platform becomes an empty record, never an absent key
pub fn flatten_map_or_empty(map: Option<&Map<String, JsonValue>>) -> Value {
    Value::Record(map.map(AttributeTree::from_json_map).unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tag {
        key: String,
    }

    impl Expand for Tag {
        fn expand(tree: &AttributeTree) -> Result<Self> {
            Ok(Tag {
                key: tree.required_leaf("key")?,
            })
        }
    }

    impl Flatten for Tag {
        fn flatten(&self) -> AttributeTree {
            AttributeTree::new().with("key", self.key.clone())
        }
    }

    fn tag(key: &str) -> Value {
        Value::Record(AttributeTree::new().with("key", key))
    }

    #[test]
    fn test_expand_list_preserves_order() {
        let tree = AttributeTree::new().with("tags", Value::List(vec![tag("b"), tag("a"), tag("c")]));
        let tags: Vec<Tag> = expand_list(&tree, "tags").unwrap();
        let keys: Vec<_> = tags.iter().map(|t| t.key.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(flatten_list(&tags), tree.get("tags").cloned().unwrap());
    }

    #[test]
    fn test_expand_single_on_empty_set_fails_without_panic() {
        let tree = AttributeTree::new().with("api_credentials", Value::List(vec![]));
        let err = expand_single::<Tag>(&tree, "api_credentials").unwrap_err();
        assert!(matches!(err, ProviderError::MissingNestedBlock { ref field } if field == "api_credentials"));

        let err = expand_single::<Tag>(&AttributeTree::new(), "api_credentials").unwrap_err();
        assert!(matches!(err, ProviderError::MissingNestedBlock { .. }));
    }

    #[test]
    fn test_expand_rejects_scalar_elements() {
        let tree = AttributeTree::new().with("tags", Value::List(vec![Value::from("oops")]));
        let err = expand_list::<Tag>(&tree, "tags").unwrap_err();
        assert!(err.to_string().contains("tags.0"));
    }

    #[test]
    fn test_nil_map_flattens_to_empty_record() {
        assert_eq!(flatten_map_or_empty(None), Value::Record(AttributeTree::new()));
        assert_eq!(flatten_single::<Tag>(None), Value::List(vec![]));
    }

    #[test]
    fn test_expand_map() {
        let tree = AttributeTree::new().with(
            "config",
            AttributeTree::new().with("tag_key", "env").with("limit", 3_i64),
        );
        let map = expand_map(&tree, "config").unwrap().unwrap();
        assert_eq!(map["tag_key"], serde_json::json!("env"));
        assert_eq!(map["limit"], serde_json::json!(3));
        assert!(expand_map(&AttributeTree::new(), "config").unwrap().is_none());
    }
}
