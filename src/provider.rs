//! Configured provider
//!
//! Holds the one platform client and routes every lifecycle call to the
//! adapter registered for the type name. Configuration is checked against
//! the schema before an adapter sees it.

use crate::api::{IcsClient, PlatformApi};
use crate::config::ProviderConfig;
use crate::error::{ProviderError, Result};
use crate::resource::{
    bot, cloud, data_source_schema, insight, resource_schema, user, ReadOutcome, RemoteIdentity,
    ResourceState,
};
use crate::schema::AttributeTree;
use std::sync::Arc;

/// Schema check plus the adapter's own cross-field rules. Returns the
/// configuration with declared defaults filled in.
pub fn validate_resource_config(type_name: &str, config: &AttributeTree) -> Result<AttributeTree> {
    let config = resource_schema(type_name)?.validate_config(config)?;
    match type_name {
        cloud::RESOURCE => cloud::validate(&config)?,
        bot::RESOURCE => bot::validate(&config)?,
        _ => {}
    }
    Ok(config)
}

pub fn validate_data_source_config(type_name: &str, config: &AttributeTree) -> Result<AttributeTree> {
    data_source_schema(type_name)?.validate_config(config)
}

fn unsupported(type_name: &str, what: &str) -> ProviderError {
    ProviderError::validation("type", format!("{type_name} does not support {what}"))
}

#[derive(Clone)]
pub struct Provider {
    config: ProviderConfig,
    api: Arc<dyn PlatformApi>,
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Provider {
    /// Provider backed by an explicit API implementation
    pub fn new(config: ProviderConfig, api: Arc<dyn PlatformApi>) -> Self {
        Self { config, api }
    }

    /// Provider talking to the configured InsightCloudSec console
    pub fn configure(config: ProviderConfig) -> Result<Self> {
        let client = IcsClient::new(&config)
            .map_err(|e| ProviderError::upstream("Error Configuring Provider", e))?;
        tracing::info!("provider configured for {}", config.base_url());
        Ok(Self::new(config, Arc::new(client)))
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    fn api(&self) -> &dyn PlatformApi {
        self.api.as_ref()
    }

    pub async fn create(&self, type_name: &str, config: &AttributeTree) -> Result<ResourceState> {
        let config = validate_resource_config(type_name, config)?;
        tracing::info!("create {}", type_name);
        let api = self.api();
        let state = match type_name {
            cloud::RESOURCE => cloud::create(api, &config).await,
            user::RESOURCE => user::create(api, &config).await,
            bot::RESOURCE => bot::create(api, &config).await,
            insight::RESOURCE => insight::create(api, &config).await,
            other => Err(unsupported(other, "create")),
        }?;
        tracing::info!("created {} {}", type_name, state.id);
        Ok(state)
    }

    pub async fn read(&self, type_name: &str, id: &str, prior: &AttributeTree) -> Result<ReadOutcome> {
        resource_schema(type_name)?;
        let id = RemoteIdentity::parse(id);
        tracing::debug!("read {} {}", type_name, id);
        let api = self.api();
        match type_name {
            cloud::RESOURCE => cloud::read(api, &id, prior).await,
            user::RESOURCE => user::read(api, &id, prior).await,
            bot::RESOURCE => bot::read(api, &id, prior).await,
            insight::RESOURCE => insight::read(api, &id, prior).await,
            other => Err(unsupported(other, "read")),
        }
    }

    pub async fn update(
        &self,
        type_name: &str,
        id: &str,
        prior: &AttributeTree,
        config: &AttributeTree,
    ) -> Result<ResourceState> {
        let config = validate_resource_config(type_name, config)?;
        let id = RemoteIdentity::parse(id);
        tracing::info!("update {} {}", type_name, id);
        let api = self.api();
        match type_name {
            cloud::RESOURCE => cloud::update(api, &id, prior, &config).await,
            user::RESOURCE => user::update(api, &id, prior, &config).await,
            bot::RESOURCE => bot::update(api, &id, prior, &config).await,
            insight::RESOURCE => insight::update(api, &id, prior, &config).await,
            other => Err(unsupported(other, "update")),
        }
    }

    pub async fn delete(&self, type_name: &str, id: &str, prior: &AttributeTree) -> Result<()> {
        resource_schema(type_name)?;
        let id = RemoteIdentity::parse(id);
        tracing::info!("delete {} {}", type_name, id);
        let api = self.api();
        match type_name {
            cloud::RESOURCE => cloud::delete(api, &id, prior).await,
            user::RESOURCE => user::delete(api, &id, prior).await,
            bot::RESOURCE => bot::delete(api, &id, prior).await,
            insight::RESOURCE => insight::delete(api, &id, prior).await,
            other => Err(unsupported(other, "delete")),
        }
    }

    /// Adopt an existing entity by id. Only users support import.
    pub async fn import(&self, type_name: &str, id: &str) -> Result<ReadOutcome> {
        resource_schema(type_name)?;
        match type_name {
            user::RESOURCE => user::import(self.api(), id).await,
            other => Err(unsupported(other, "import")),
        }
    }

    pub async fn read_data_source(&self, type_name: &str, config: &AttributeTree) -> Result<ResourceState> {
        let config = validate_data_source_config(type_name, config)?;
        tracing::debug!("read data source {}", type_name);
        let api = self.api();
        match type_name {
            cloud::DATA_SOURCE => cloud::read_by_name(api, &config).await,
            cloud::CLOUD_TYPES_DATA_SOURCE => cloud::read_cloud_types(api).await,
            user::USERS_DATA_SOURCE => user::read_users(api).await,
            bot::DATA_SOURCE => bot::read_by_resource_id(api, &config).await,
            other => Err(unsupported(other, "reads")),
        }
    }
}
