//! Block schemas
//!
//! A block is a set of named fields plus the cross-field rules that apply to
//! them: conflict groups (at most one may be populated) and required-with
//! links. Resources, data sources, the provider itself and every nested block
//! are described by one of these.

use super::field::{FieldSpec, Mode};
use super::join_path;
use super::value::AttributeTree;
use crate::error::{ProviderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Fields that only make sense together, exclusive of other groups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConflictGroup {
    pub name: String,
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockSchema {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub fields: BTreeMap<String, FieldSpec>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conflict_groups: Vec<ConflictGroup>,
}

impl BlockSchema {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.get(name)
    }

    /// Check the declarations of this block and every nested block
    pub fn check(&self) -> std::result::Result<(), String> {
        for (name, spec) in &self.fields {
            spec.check(name)?;
            for other in &spec.required_with {
                if !self.fields.contains_key(other) {
                    return Err(format!("{name}: required_with names unknown field {other}"));
                }
            }
        }
        for group in &self.conflict_groups {
            for name in &group.fields {
                if !self.fields.contains_key(name) {
                    return Err(format!("conflict group {} names unknown field {name}", group.name));
                }
            }
        }
        Ok(())
    }

    /// Validate operator configuration and return it with declared defaults
    /// substituted. Nothing here touches the network.
    pub fn validate_config(&self, config: &AttributeTree) -> Result<AttributeTree> {
        self.validate_at("", config)
    }

    pub(crate) fn validate_at(&self, path: &str, config: &AttributeTree) -> Result<AttributeTree> {
        if let Some(unknown) = config.keys().find(|k| !self.fields.contains_key(*k)) {
            return Err(ProviderError::validation(
                join_path(path, unknown),
                "unsupported argument",
            ));
        }

        let mut out = AttributeTree::new();
        for (name, spec) in &self.fields {
            let field_path = join_path(path, name);
            match config.get(name) {
                None => {
                    if let Some(default) = &spec.default {
                        out.insert(name.clone(), default.clone());
                    } else if spec.mode == Mode::Required {
                        return Err(ProviderError::validation(
                            field_path,
                            "required field is not set",
                        ));
                    }
                }
                Some(_) if spec.mode == Mode::Computed => {
                    return Err(ProviderError::validation(
                        field_path,
                        "value is computed by the platform and cannot be set",
                    ));
                }
                Some(value) => {
                    out.insert(name.clone(), spec.check_value(&field_path, value)?);
                }
            }
        }

        let populated = self.populated_groups(&out);
        if populated.len() > 1 {
            let names: Vec<&str> = populated.iter().map(|g| g.name.as_str()).collect();
            return Err(ProviderError::conflict(format!(
                "{} settings cannot be combined in one block{}",
                names.join(" and "),
                if path.is_empty() {
                    String::new()
                } else {
                    format!(" ({path})")
                }
            )));
        }

        for (name, spec) in &self.fields {
            if !out.is_populated(name) {
                continue;
            }
            if let Some(missing) = spec.required_with.iter().find(|o| !out.is_populated(o)) {
                return Err(ProviderError::validation(
                    join_path(path, name),
                    format!("\"{missing}\" must also be set"),
                ));
            }
        }

        Ok(out)
    }

    /// Conflict groups with at least one populated field
    pub fn populated_groups(&self, tree: &AttributeTree) -> Vec<&ConflictGroup> {
        self.conflict_groups
            .iter()
            .filter(|g| g.fields.iter().any(|f| tree.is_populated(f)))
            .collect()
    }

    /// Top-level operator-settable fields whose planned value differs from state.
    /// An omitted optional+computed field keeps whatever the platform reports.
    pub fn changed_fields(&self, prior: &AttributeTree, planned: &AttributeTree) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.is_settable())
            .filter(|(name, spec)| {
                let after = planned.get(name);
                if after.is_none() && spec.mode == Mode::OptionalComputed {
                    return false;
                }
                prior.get(name) != after
            })
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn write_only_fields(&self) -> impl Iterator<Item = &str> {
        self.fields
            .iter()
            .filter(|(_, spec)| spec.write_only)
            .map(|(name, _)| name.as_str())
    }
}
