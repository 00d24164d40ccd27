//! InsightCloudSec Client
//!
//! Endpoint paths for every operation the provider uses, combined with the
//! HTTP wrapper into a [`PlatformApi`] implementation.

use super::http::IcsHttpClient;
use super::types::{
    Bot, BotDefinition, Cloud, CloudAccountParameters, CloudList, CloudType, CloudTypeList,
    Insight, NewUser, User, UserList,
};
use super::{ApiResult, PlatformApi};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use serde_json::{json, Value};

/// Insight source for operator-defined insights
pub const CUSTOM_INSIGHT_SOURCE: &str = "custom";

/// Main InsightCloudSec client
#[derive(Clone, Debug)]
pub struct IcsClient {
    pub http: IcsHttpClient,
}

impl IcsClient {
    /// Create a new client from provider configuration
    pub fn new(config: &ProviderConfig) -> ApiResult<Self> {
        let http = IcsHttpClient::new(config.base_url().clone(), config.api_key())?;
        Ok(Self { http })
    }

    // =========================================================================
    // Cloud API helpers
    // =========================================================================

    fn cloud_path(&self, path: &str) -> String {
        format!("v2/prototype/cloud/{}", path)
    }

    fn clouds_path(&self, path: &str) -> String {
        format!("v2/public/clouds/{}", path)
    }

    async fn add_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        let body = json!({ "creation_params": params });
        self.http.post_json(&self.cloud_path("add"), Some(&body)).await
    }

    // =========================================================================
    // User API helpers
    // =========================================================================

    fn user_path(&self, path: &str) -> String {
        format!("v2/public/user/{}", path)
    }

    fn users_path(&self, path: &str) -> String {
        format!("v2/public/users/{}", path)
    }

    // =========================================================================
    // Bot API helpers
    // =========================================================================

    /// Bot resource ids contain ':' and must be escaped inside a path
    fn bot_path(&self, resource_id: &str, action: &str) -> String {
        format!(
            "v2/public/botfactory/{}/{}",
            urlencoding::encode(resource_id),
            action
        )
    }

    // =========================================================================
    // Insight API helpers
    // =========================================================================

    fn insights_path(&self, path: &str) -> String {
        format!("v2/public/insights/{}", path)
    }
}

/// Action endpoints answer with an empty or irrelevant body
fn discard(_: Value) {}

#[async_trait]
impl PlatformApi for IcsClient {
    async fn add_aws_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        self.add_cloud(params).await
    }

    async fn add_azure_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        self.add_cloud(params).await
    }

    async fn add_gcp_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        self.add_cloud(params).await
    }

    async fn list_clouds(&self) -> ApiResult<Vec<Cloud>> {
        let list: CloudList = self
            .http
            .post_json(&self.clouds_path("list"), Some(&json!({})))
            .await?;
        Ok(list.clouds)
    }

    async fn update_cloud(&self, id: i64, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        let body = json!({ "creation_params": params });
        self.http
            .post_json(&self.cloud_path(&format!("{}/update", id)), Some(&body))
            .await
    }

    async fn delete_cloud(&self, resource_id: &str) -> ApiResult<()> {
        let path = self.cloud_path(&format!("{}/delete", urlencoding::encode(resource_id)));
        self.http.post(&path, None).await.map(discard)
    }

    async fn list_cloud_types(&self) -> ApiResult<Vec<CloudType>> {
        let list: CloudTypeList = self.http.get_json("v2/public/cloudtypes/list").await?;
        Ok(list.cloudtypes)
    }

    async fn create_user(&self, user: &NewUser) -> ApiResult<User> {
        let body = serde_json::to_value(user)?;
        self.http.post_json(&self.user_path("create"), Some(&body)).await
    }

    async fn get_user_by_id(&self, id: i64) -> ApiResult<User> {
        self.http.get_json(&self.users_path(&id.to_string())).await
    }

    async fn list_users(&self) -> ApiResult<UserList> {
        self.http
            .post_json(&self.users_path("list"), Some(&json!({})))
            .await
    }

    async fn update_user_info(&self, id: i64, user: &NewUser) -> ApiResult<User> {
        let body = serde_json::to_value(user)?;
        self.http
            .post_json(&self.user_path(&format!("{}/update", id)), Some(&body))
            .await
    }

    async fn edit_access_level(&self, id: i64, current: &str, desired: &str) -> ApiResult<()> {
        let body = json!({ "current_access_level": current, "desired_access_level": desired });
        let path = format!("v2/prototype/user/{}/access_level/update", id);
        self.http.post(&path, Some(&body)).await.map(discard)
    }

    async fn set_console_access(&self, id: i64, denied: bool) -> ApiResult<()> {
        let body = json!({ "console_access_denied": denied });
        let path = self.user_path(&format!("{}/console_access", id));
        self.http.post(&path, Some(&body)).await.map(discard)
    }

    async fn disable_two_factor(&self, id: i64) -> ApiResult<()> {
        let path = self.user_path(&format!("{}/tfa_disable", id));
        self.http.post(&path, None).await.map(discard)
    }

    async fn delete_user(&self, resource_id: &str) -> ApiResult<()> {
        let path = self.user_path(&format!("{}/delete", urlencoding::encode(resource_id)));
        self.http.post(&path, None).await.map(discard)
    }

    async fn create_bot(&self, bot: &BotDefinition) -> ApiResult<Bot> {
        let body = serde_json::to_value(bot)?;
        self.http
            .post_json("v2/public/botfactory/bot/create", Some(&body))
            .await
    }

    async fn get_bot(&self, resource_id: &str) -> ApiResult<Bot> {
        self.http.get_json(&self.bot_path(resource_id, "get")).await
    }

    async fn update_bot(&self, resource_id: &str, bot: &BotDefinition) -> ApiResult<Bot> {
        let body = serde_json::to_value(bot)?;
        self.http
            .post_json(&self.bot_path(resource_id, "update"), Some(&body))
            .await
    }

    async fn pause_bot(&self, resource_id: &str) -> ApiResult<()> {
        self.http.post(&self.bot_path(resource_id, "pause"), None).await.map(discard)
    }

    async fn resume_bot(&self, resource_id: &str) -> ApiResult<()> {
        self.http.post(&self.bot_path(resource_id, "resume"), None).await.map(discard)
    }

    async fn archive_bot(&self, resource_id: &str) -> ApiResult<()> {
        self.http.post(&self.bot_path(resource_id, "archive"), None).await.map(discard)
    }

    async fn create_insight(&self, insight: &Insight) -> ApiResult<Insight> {
        let body = serde_json::to_value(insight)?;
        self.http
            .post_json(&self.insights_path("create"), Some(&body))
            .await
    }

    async fn get_insight(&self, id: i64, source: &str) -> ApiResult<Insight> {
        self.http
            .get_json(&self.insights_path(&format!("{}/{}", id, source)))
            .await
    }

    async fn edit_insight(&self, insight: &Insight) -> ApiResult<Insight> {
        let body = serde_json::to_value(insight)?;
        self.http
            .post_json(&self.insights_path(&format!("{}/edit", insight.id)), Some(&body))
            .await
    }

    async fn delete_insight(&self, id: i64) -> ApiResult<()> {
        self.http.delete(&self.insights_path(&format!("{}/delete", id))).await.map(discard)
    }
}
