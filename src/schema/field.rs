//! Field declarations
//!
//! A field is declared once in the embedded schema JSON and drives both
//! configuration checks and documentation output.

use super::block::BlockSchema;
use super::join_path;
use super::validate::Validator;
use super::value::Value;
use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    String,
    Int,
    Bool,
    /// Free-form string-keyed map (filter/action configuration)
    Map,
    /// Nested record described by its own block schema
    Block,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Int => "int",
            ValueKind::Bool => "bool",
            ValueKind::Map => "map",
            ValueKind::Block => "block",
        }
    }

    fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (ValueKind::String, Value::Str(_))
                | (ValueKind::Int, Value::Int(_))
                | (ValueKind::Bool, Value::Bool(_))
                | (ValueKind::Map, Value::Record(_))
                | (ValueKind::Block, Value::Record(_))
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cardinality {
    #[default]
    Single,
    /// Order is significant
    List,
    /// Order is irrelevant; duplicates are the platform's concern
    Set,
}

/// Mutability class. A field is never both required and computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    Required,
    Optional,
    Computed,
    OptionalComputed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    #[serde(rename = "type")]
    pub kind: ValueKind,
    #[serde(default)]
    pub cardinality: Cardinality,
    pub mode: Mode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default)]
    pub sensitive: bool,
    /// Accepted on write but never returned by the platform
    #[serde(default)]
    pub write_only: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub validators: Vec<Validator>,
    /// Sibling fields that must be set whenever this one is
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub required_with: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block: Option<BlockSchema>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl FieldSpec {
    /// Can the operator supply this field?
    pub fn is_settable(&self) -> bool {
        !matches!(self.mode, Mode::Computed)
    }

    pub fn is_computed(&self) -> bool {
        matches!(self.mode, Mode::Computed | Mode::OptionalComputed)
    }

    /// Check the declaration itself; run once when the registry loads
    pub fn check(&self, name: &str) -> std::result::Result<(), String> {
        if self.default.is_some() && self.mode != Mode::Optional {
            return Err(format!("{name}: only optional fields may declare a default"));
        }
        match (self.kind, &self.block) {
            (ValueKind::Block, None) => {
                return Err(format!("{name}: block field without a nested schema"))
            }
            (ValueKind::Block, Some(block)) => {
                if self.cardinality == Cardinality::Single {
                    return Err(format!("{name}: blocks must be declared as a list or set"));
                }
                block.check().map_err(|e| format!("{name}.{e}"))?;
            }
            (_, Some(_)) => return Err(format!("{name}: nested schema on a non-block field")),
            (_, None) => {}
        }
        if self.max_items.is_some() && self.cardinality == Cardinality::Single {
            return Err(format!("{name}: max_items needs a list or set"));
        }
        if let Some(default) = &self.default {
            self.check_value(name, default)
                .map_err(|e| format!("{name}: invalid default ({e})"))?;
        }
        Ok(())
    }

    /// Check one configured value and return its normalized form
    pub fn check_value(&self, path: &str, value: &Value) -> Result<Value> {
        match self.cardinality {
            Cardinality::Single => self.check_element(path, value),
            Cardinality::List | Cardinality::Set => {
                let Some(items) = value.as_list() else {
                    return Err(ProviderError::validation(
                        path,
                        format!("expected list of {}, got {}", self.kind.name(), value.kind_name()),
                    ));
                };
                if let Some(max) = self.max_items {
                    if items.len() > max {
                        return Err(ProviderError::validation(
                            path,
                            format!("at most {max} element(s) allowed, got {}", items.len()),
                        ));
                    }
                }
                items
                    .iter()
                    .enumerate()
                    .map(|(i, item)| self.check_element(&join_path(path, &i.to_string()), item))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::List)
            }
        }
    }

    fn check_element(&self, path: &str, value: &Value) -> Result<Value> {
        if !self.kind.accepts(value) {
            return Err(ProviderError::validation(
                path,
                format!("expected {}, got {}", self.kind.name(), value.kind_name()),
            ));
        }
        if let (ValueKind::Block, Some(block), Value::Record(tree)) = (self.kind, &self.block, value) {
            return block.validate_at(path, tree).map(Value::Record);
        }
        for validator in &self.validators {
            validator
                .validate(value)
                .map_err(|reason| ProviderError::validation(path, reason.0))?;
        }
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(json: serde_json::Value) -> FieldSpec {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_default_only_on_optional() {
        let computed = spec(serde_json::json!({"type": "string", "mode": "computed", "default": "x"}));
        assert!(computed.check("status").is_err());

        let optional = spec(serde_json::json!({"type": "bool", "mode": "optional", "default": false}));
        assert!(optional.check("console_access_denied").is_ok());
    }

    #[test]
    fn test_default_must_pass_validators() {
        let field = spec(serde_json::json!({
            "type": "string", "mode": "optional", "default": "XOR",
            "validators": [{"one_of": ["OR", "AND"]}]
        }));
        assert!(field.check("badge_scope_operator").is_err());
    }

    #[test]
    fn test_list_elements_are_validated_with_index_path() {
        let field = spec(serde_json::json!({
            "type": "int", "cardinality": "list", "mode": "optional",
            "validators": [{"int_between": {"min": 1, "max": 31}}]
        }));
        let err = field
            .check_value("exclude_days", &Value::List(vec![Value::Int(3), Value::Int(40)]))
            .unwrap_err();
        match err {
            ProviderError::ValidationFailed { field, .. } => assert_eq!(field, "exclude_days.1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_max_items_enforced() {
        let field = spec(serde_json::json!({
            "type": "block", "cardinality": "set", "mode": "optional", "max_items": 1,
            "block": {"fields": {"project_id": {"type": "string", "mode": "required"}}}
        }));
        let one = Value::Record(crate::schema::AttributeTree::new().with("project_id", "p"));
        assert!(field.check_value("api_credentials", &Value::List(vec![one.clone()])).is_ok());
        assert!(field
            .check_value("api_credentials", &Value::List(vec![one.clone(), one]))
            .is_err());
    }
}
