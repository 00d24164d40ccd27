//! Schema Registry - Load resource schemas from JSON
//!
//! Every resource, data source and the provider block itself is declared in
//! an embedded JSON file. The files are merged and checked once, on first
//! access, and are read-only afterwards.

use crate::error::{ProviderError, Result};
use crate::schema::BlockSchema;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Embedded schema JSON files (compiled into the binary)
const SCHEMA_FILES: &[(&str, &str)] = &[
    ("provider.json", include_str!("../resources/provider.json")),
    ("cloud.json", include_str!("../resources/cloud.json")),
    ("user.json", include_str!("../resources/user.json")),
    ("bot.json", include_str!("../resources/bot.json")),
    ("insight.json", include_str!("../resources/insight.json")),
];

/// Root structure of resources/*.json
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaConfig {
    #[serde(default)]
    pub provider: Option<BlockSchema>,
    #[serde(default)]
    pub resources: BTreeMap<String, BlockSchema>,
    #[serde(default)]
    pub data_sources: BTreeMap<String, BlockSchema>,
}

impl SchemaConfig {
    fn merge(&mut self, file: &str, partial: SchemaConfig) {
        if let Some(provider) = partial.provider {
            if self.provider.replace(provider).is_some() {
                panic!("{file}: provider schema declared twice");
            }
        }
        for (name, schema) in partial.resources {
            if self.resources.insert(name.clone(), schema).is_some() {
                panic!("{file}: resource {name} declared twice");
            }
        }
        for (name, schema) in partial.data_sources {
            if self.data_sources.insert(name.clone(), schema).is_some() {
                panic!("{file}: data source {name} declared twice");
            }
        }
    }

    fn check(&self) -> std::result::Result<(), String> {
        let provider = self.provider.as_ref().ok_or("no provider schema declared")?;
        provider.check().map_err(|e| format!("provider: {e}"))?;
        for (name, schema) in self.resources.iter().chain(&self.data_sources) {
            schema.check().map_err(|e| format!("{name}: {e}"))?;
        }
        Ok(())
    }
}

/// Global registry loaded from JSON
static REGISTRY: OnceLock<SchemaConfig> = OnceLock::new();

/// Get the schema registry (loads from embedded JSON on first access).
/// The JSON ships inside the binary, so a malformed file is a build defect.
pub fn get_registry() -> &'static SchemaConfig {
    REGISTRY.get_or_init(|| {
        let mut final_config = SchemaConfig::default();

        for (file, content) in SCHEMA_FILES {
            let partial: SchemaConfig = serde_json::from_str(content)
                .unwrap_or_else(|e| panic!("Failed to parse embedded schema {}: {}", file, e));
            final_config.merge(file, partial);
        }

        if let Err(e) = final_config.check() {
            panic!("Invalid embedded schema: {}", e);
        }

        tracing::debug!(
            "schema registry loaded: {} resources, {} data sources",
            final_config.resources.len(),
            final_config.data_sources.len()
        );
        final_config
    })
}

pub fn provider_schema() -> &'static BlockSchema {
    static EMPTY: OnceLock<BlockSchema> = OnceLock::new();
    get_registry()
        .provider
        .as_ref()
        .unwrap_or_else(|| EMPTY.get_or_init(BlockSchema::default))
}

pub fn get_resource_schema(name: &str) -> Option<&'static BlockSchema> {
    get_registry().resources.get(name)
}

pub fn get_data_source_schema(name: &str) -> Option<&'static BlockSchema> {
    get_registry().data_sources.get(name)
}

/// Resource schema, or a validation error naming the unknown type
pub fn resource_schema(name: &str) -> Result<&'static BlockSchema> {
    get_resource_schema(name)
        .ok_or_else(|| ProviderError::validation("type", format!("unknown resource type {name}")))
}

pub fn data_source_schema(name: &str) -> Result<&'static BlockSchema> {
    get_data_source_schema(name)
        .ok_or_else(|| ProviderError::validation("type", format!("unknown data source type {name}")))
}

/// Get all resource type names, sorted
pub fn get_all_resource_types() -> Vec<&'static str> {
    get_registry().resources.keys().map(|s| s.as_str()).collect()
}

pub fn get_all_data_source_types() -> Vec<&'static str> {
    get_registry().data_sources.keys().map(|s| s.as_str()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Cardinality, Mode};

    #[test]
    fn test_registry_loads_successfully() {
        let registry = get_registry();
        assert!(!registry.resources.is_empty(), "Registry should have resources");
        assert!(registry.provider.is_some());
    }

    #[test]
    fn test_all_types_registered() {
        assert_eq!(
            get_all_resource_types(),
            vec![
                "insightcloudsec_bot",
                "insightcloudsec_cloud",
                "insightcloudsec_insight",
                "insightcloudsec_user"
            ]
        );
        assert_eq!(
            get_all_data_source_types(),
            vec![
                "insightcloudsec_bot",
                "insightcloudsec_cloud",
                "insightcloudsec_cloud_types",
                "insightcloudsec_users"
            ]
        );
    }

    #[test]
    fn test_unknown_type_is_validation_error() {
        let err = resource_schema("insightcloudsec_cloud_org").unwrap_err();
        assert!(matches!(err, ProviderError::ValidationFailed { ref field, .. } if field == "type"));
    }

    #[test]
    fn test_api_credentials_is_single_element_set() {
        let schema = resource_schema("insightcloudsec_cloud").unwrap();
        let creds = schema.field("api_credentials").unwrap();
        assert_eq!(creds.cardinality, Cardinality::Set);
        assert_eq!(creds.max_items, Some(1));
        let private_key = creds.block.as_ref().unwrap().field("private_key").unwrap();
        assert!(private_key.write_only && private_key.sensitive);
    }

    #[test]
    fn test_no_field_is_required_and_computed() {
        let registry = get_registry();
        for schema in registry.resources.values() {
            for spec in schema.fields.values() {
                assert!(!(spec.mode == Mode::Required && spec.is_computed()));
            }
        }
    }
}
