//! Configuration Management
//!
//! Resolves the console URL and API key the provider talks to. Explicit
//! provider settings win over the environment, which wins over the persisted
//! config file. Only the base URL is ever written to disk.

use crate::error::{ProviderError, Result};
use crate::resource::provider_schema;
use crate::schema::AttributeTree;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

pub const BASE_URL_ENV: &str = "INSIGHTCLOUDSEC_BASE_URL";
pub const API_KEY_ENV: &str = "INSIGHTCLOUDSEC_API_KEY";

/// Persisted operator settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct StoredConfig {
    /// Last configured console URL
    #[serde(default)]
    pub base_url: Option<String>,
}

impl StoredConfig {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("insightcloudsec").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        let Some(path) = Self::config_path() else {
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_default(),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> anyhow::Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Validate and persist a new base URL
    pub fn set_base_url(&mut self, url: &str) -> anyhow::Result<()> {
        parse_base_url(url)?;
        self.base_url = Some(url.to_string());
        self.save()
    }
}

fn parse_base_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw).map_err(|e| ProviderError::validation("url", e.to_string()))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(ProviderError::validation(
            "url",
            format!("expected an http or https URL, got scheme {other}"),
        )),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Immutable connection settings for one provider instance
#[derive(Clone, PartialEq)]
pub struct ProviderConfig {
    base_url: Url,
    api_key: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &"<redacted>")
            .finish()
    }
}

impl ProviderConfig {
    /// Build from already-resolved values, checking them against the provider schema
    pub fn new(url: &str, api_key: &str) -> Result<Self> {
        let tree = AttributeTree::new().with("url", url).with("apikey", api_key);
        provider_schema().validate_config(&tree)?;

        Ok(Self {
            base_url: parse_base_url(url)?,
            api_key: api_key.to_string(),
        })
    }

    /// Resolve from explicit settings, then the environment, then the stored file
    pub fn resolve(url: Option<String>, api_key: Option<String>) -> Result<Self> {
        Self::resolve_with(url, api_key, |key| std::env::var(key).ok(), &StoredConfig::load())
    }

    fn resolve_with(
        url: Option<String>,
        api_key: Option<String>,
        env: impl Fn(&str) -> Option<String>,
        stored: &StoredConfig,
    ) -> Result<Self> {
        let url = non_empty(url)
            .or_else(|| non_empty(env(BASE_URL_ENV)))
            .or_else(|| non_empty(stored.base_url.clone()))
            .ok_or_else(|| {
                ProviderError::validation(
                    "url",
                    format!("not set; use the provider block, {BASE_URL_ENV} or `configure --url`"),
                )
            })?;
        let api_key = non_empty(api_key)
            .or_else(|| non_empty(env(API_KEY_ENV)))
            .ok_or_else(|| {
                ProviderError::validation(
                    "apikey",
                    format!("not set; use the provider block or {API_KEY_ENV}"),
                )
            })?;

        tracing::debug!("resolved base URL {}", url);
        Self::new(&url, &api_key)
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }
}
