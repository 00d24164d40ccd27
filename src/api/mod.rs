//! InsightCloudSec API interaction module
//!
//! The lifecycle adapters only ever talk to [`PlatformApi`]: one async method
//! per remote operation, no pagination, batching or retry. [`client::IcsClient`]
//! is the reqwest-backed implementation.
//!
//! # Module Structure
//!
//! - [`client`] - Endpoint paths and the `PlatformApi` implementation
//! - [`http`] - HTTP utilities for REST calls (auth header, status mapping)
//! - [`types`] - Request/response payloads
//!
//! # Example
//!
//! ```ignore
//! use insightcloudsec::api::{client::IcsClient, PlatformApi};
//!
//! async fn example(config: &ProviderConfig) -> Result<(), ApiError> {
//!     let client = IcsClient::new(config)?;
//!     let cloud = client.get_cloud_by_name("production").await?;
//!     Ok(())
//! }
//! ```

pub mod client;
#[cfg(test)]
pub(crate) mod fake;
pub mod http;
pub mod types;

pub use client::IcsClient;

use async_trait::async_trait;
use thiserror::Error;
use types::{
    Bot, BotDefinition, Cloud, CloudAccountParameters, CloudType, Insight, NewUser, User, UserList,
};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("resource not found ({path})")]
    NotFound { path: String },

    #[error("API request failed: {status} - {message}")]
    Status { status: u16, message: String },

    #[error("failed to send request: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("failed to parse response JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid request URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// One method per remote operation the provider needs
#[async_trait]
pub trait PlatformApi: Send + Sync {
    // Clouds
    async fn add_aws_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud>;
    async fn add_azure_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud>;
    async fn add_gcp_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud>;
    async fn list_clouds(&self) -> ApiResult<Vec<Cloud>>;
    async fn update_cloud(&self, id: i64, params: &CloudAccountParameters) -> ApiResult<Cloud>;
    async fn delete_cloud(&self, resource_id: &str) -> ApiResult<()>;
    async fn list_cloud_types(&self) -> ApiResult<Vec<CloudType>>;

    /// The platform has no get-by-id for clouds; filter the listing
    async fn get_cloud_by_id(&self, id: i64) -> ApiResult<Cloud> {
        self.list_clouds()
            .await?
            .into_iter()
            .find(|c| c.id == id)
            .ok_or_else(|| ApiError::NotFound {
                path: format!("cloud id {id}"),
            })
    }

    async fn get_cloud_by_name(&self, name: &str) -> ApiResult<Cloud> {
        self.list_clouds()
            .await?
            .into_iter()
            .find(|c| c.name == name)
            .ok_or_else(|| ApiError::NotFound {
                path: format!("cloud named {name}"),
            })
    }

    // Users
    async fn create_user(&self, user: &NewUser) -> ApiResult<User>;
    async fn get_user_by_id(&self, id: i64) -> ApiResult<User>;
    async fn list_users(&self) -> ApiResult<UserList>;
    async fn update_user_info(&self, id: i64, user: &NewUser) -> ApiResult<User>;
    async fn edit_access_level(&self, id: i64, current: &str, desired: &str) -> ApiResult<()>;
    async fn set_console_access(&self, id: i64, denied: bool) -> ApiResult<()>;
    async fn disable_two_factor(&self, id: i64) -> ApiResult<()>;
    async fn delete_user(&self, resource_id: &str) -> ApiResult<()>;

    // Bots
    async fn create_bot(&self, bot: &BotDefinition) -> ApiResult<Bot>;
    async fn get_bot(&self, resource_id: &str) -> ApiResult<Bot>;
    async fn update_bot(&self, resource_id: &str, bot: &BotDefinition) -> ApiResult<Bot>;
    async fn pause_bot(&self, resource_id: &str) -> ApiResult<()>;
    async fn resume_bot(&self, resource_id: &str) -> ApiResult<()>;
    async fn archive_bot(&self, resource_id: &str) -> ApiResult<()>;

    // Insights
    async fn create_insight(&self, insight: &Insight) -> ApiResult<Insight>;
    async fn get_insight(&self, id: i64, source: &str) -> ApiResult<Insight>;
    async fn edit_insight(&self, insight: &Insight) -> ApiResult<Insight>;
    async fn delete_insight(&self, id: i64) -> ApiResult<()>;
}
