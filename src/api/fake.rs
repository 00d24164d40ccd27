//! In-memory platform used by unit tests
//!
//! Keeps entities in a mutex-guarded store, records every call by operation
//! name and can be told to fail a named operation with an HTTP status.

use super::types::{
    Bot, BotDefinition, Cloud, CloudAccountParameters, CloudType, Insight, NewUser, User, UserList,
};
use super::{ApiError, ApiResult, PlatformApi};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct Store {
    next_id: i64,
    clouds: Vec<Cloud>,
    cloud_types: Vec<CloudType>,
    users: Vec<User>,
    bots: BTreeMap<String, Bot>,
    insights: BTreeMap<i64, Insight>,
    calls: Vec<String>,
    failures: BTreeMap<String, u16>,
}

impl Store {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn user_mut(&mut self, id: i64) -> ApiResult<&mut User> {
        self.users
            .iter_mut()
            .find(|u| u.id == id)
            .ok_or_else(|| missing(format!("users/{id}")))
    }

    fn bot_mut(&mut self, resource_id: &str) -> ApiResult<&mut Bot> {
        self.bots
            .get_mut(resource_id)
            .ok_or_else(|| missing(format!("botfactory/{resource_id}")))
    }
}

fn missing(path: String) -> ApiError {
    ApiError::NotFound { path }
}

fn apply_access_level(user: &mut User, level: &str) {
    user.domain_admin = level == "DOMAIN_ADMIN";
    user.organization_admin = level == "ORGANIZATION_ADMIN";
    user.domain_viewer = level == "DOMAIN_VIEWER";
}

#[derive(Default)]
pub(crate) struct FakeApi {
    store: Mutex<Store>,
}

impl FakeApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Store> {
        self.store.lock().unwrap()
    }

    /// Record `op` and return the store, or the configured failure
    fn call(&self, op: &str) -> ApiResult<MutexGuard<'_, Store>> {
        let mut store = self.lock();
        store.calls.push(op.to_string());
        if let Some(status) = store.failures.get(op) {
            return Err(ApiError::Status {
                status: *status,
                message: super::http::describe_status(*status).to_string(),
            });
        }
        Ok(store)
    }

    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn fail(&self, op: &str, status: u16) {
        self.lock().failures.insert(op.to_string(), status);
    }

    pub fn insert_cloud(&self, mut cloud: Cloud) -> Cloud {
        let mut store = self.lock();
        if cloud.id == 0 {
            cloud.id = store.next_id();
        }
        store.clouds.push(cloud.clone());
        cloud
    }

    pub fn insert_cloud_type(&self, cloud_type: CloudType) {
        self.lock().cloud_types.push(cloud_type);
    }

    pub fn insert_user(&self, mut user: User) -> User {
        let mut store = self.lock();
        if user.id == 0 {
            user.id = store.next_id();
        }
        store.users.push(user.clone());
        user
    }

    pub fn insert_bot(&self, bot: Bot) {
        self.lock().bots.insert(bot.resource_id.clone(), bot);
    }

    pub fn cloud(&self, id: i64) -> Option<Cloud> {
        self.lock().clouds.iter().find(|c| c.id == id).cloned()
    }

    pub fn user(&self, id: i64) -> Option<User> {
        self.lock().users.iter().find(|u| u.id == id).cloned()
    }

    pub fn bot(&self, resource_id: &str) -> Option<Bot> {
        self.lock().bots.get(resource_id).cloned()
    }

    pub fn insight(&self, id: i64) -> Option<Insight> {
        self.lock().insights.get(&id).cloned()
    }

    pub fn remove_insight(&self, id: i64) {
        self.lock().insights.remove(&id);
    }

    fn add_cloud(&self, op: &str, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        let mut store = self.call(op)?;
        let id = store.next_id();
        let account_id = [&params.account_number, &params.subscription_id, &params.project]
            .into_iter()
            .find(|s| !s.is_empty())
            .cloned()
            .unwrap_or_default();
        let cloud = Cloud {
            id,
            name: params.name.clone(),
            cloud_type_id: params.cloud_type.clone(),
            account_id,
            creation_time: "2024-01-01 00:00:00".to_string(),
            status: "DEFAULT".to_string(),
            resource_id: format!("divvyorganizationservice:{id}"),
            group_resource_id: format!("resourcegroup:{id}:"),
            strategy_id: 1,
            ..Default::default()
        };
        store.clouds.push(cloud.clone());
        Ok(cloud)
    }
}

#[async_trait]
impl PlatformApi for FakeApi {
    async fn add_aws_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        self.add_cloud("add_aws_cloud", params)
    }

    async fn add_azure_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        self.add_cloud("add_azure_cloud", params)
    }

    async fn add_gcp_cloud(&self, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        self.add_cloud("add_gcp_cloud", params)
    }

    async fn list_clouds(&self) -> ApiResult<Vec<Cloud>> {
        Ok(self.call("list_clouds")?.clouds.clone())
    }

    async fn update_cloud(&self, id: i64, params: &CloudAccountParameters) -> ApiResult<Cloud> {
        let mut store = self.call("update_cloud")?;
        let cloud = store
            .clouds
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| missing(format!("cloud/{id}")))?;
        cloud.name = params.name.clone();
        Ok(cloud.clone())
    }

    async fn delete_cloud(&self, resource_id: &str) -> ApiResult<()> {
        let mut store = self.call("delete_cloud")?;
        let before = store.clouds.len();
        store.clouds.retain(|c| c.resource_id != resource_id);
        if store.clouds.len() == before {
            return Err(missing(format!("cloud/{resource_id}")));
        }
        Ok(())
    }

    async fn list_cloud_types(&self) -> ApiResult<Vec<CloudType>> {
        Ok(self.call("list_cloud_types")?.cloud_types.clone())
    }

    async fn create_user(&self, new: &NewUser) -> ApiResult<User> {
        let mut store = self.call("create_user")?;
        let id = store.next_id();
        let mut user = User {
            id,
            resource_id: format!("divvyuser:{id}:"),
            name: new.name.clone(),
            username: new.username.clone(),
            email_address: new.email.clone(),
            organization_id: 1,
            organization_name: "Default Organization".to_string(),
            temporary_pw: Some("Temp-Pa55word!".to_string()),
            temp_pw_expiration: Some("2024-01-08 00:00:00".to_string()),
            ..Default::default()
        };
        apply_access_level(&mut user, &new.access_level);
        store.users.push(user.clone());
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> ApiResult<User> {
        let mut store = self.call("get_user_by_id")?;
        let mut user = store.user_mut(id)?.clone();
        user.temporary_pw = None;
        user.temp_pw_expiration = None;
        Ok(user)
    }

    async fn list_users(&self) -> ApiResult<UserList> {
        let store = self.call("list_users")?;
        Ok(UserList {
            users: store.users.clone(),
            total_count: store.users.len() as i64,
        })
    }

    async fn update_user_info(&self, id: i64, new: &NewUser) -> ApiResult<User> {
        let mut store = self.call("update_user_info")?;
        let user = store.user_mut(id)?;
        user.name = new.name.clone();
        user.username = new.username.clone();
        user.email_address = new.email.clone();
        apply_access_level(user, &new.access_level);
        Ok(user.clone())
    }

    async fn edit_access_level(&self, id: i64, _current: &str, desired: &str) -> ApiResult<()> {
        let mut store = self.call("edit_access_level")?;
        apply_access_level(store.user_mut(id)?, desired);
        Ok(())
    }

    async fn set_console_access(&self, id: i64, denied: bool) -> ApiResult<()> {
        let mut store = self.call("set_console_access")?;
        store.user_mut(id)?.console_access_denied = denied;
        Ok(())
    }

    async fn disable_two_factor(&self, id: i64) -> ApiResult<()> {
        let mut store = self.call("disable_two_factor")?;
        store.user_mut(id)?.two_factor_enabled = false;
        Ok(())
    }

    async fn delete_user(&self, resource_id: &str) -> ApiResult<()> {
        let mut store = self.call("delete_user")?;
        let before = store.users.len();
        store.users.retain(|u| u.resource_id != resource_id);
        if store.users.len() == before {
            return Err(missing(format!("user/{resource_id}")));
        }
        Ok(())
    }

    async fn create_bot(&self, definition: &BotDefinition) -> ApiResult<Bot> {
        let mut store = self.call("create_bot")?;
        let id = store.next_id();
        let bot = Bot {
            resource_id: format!("divvybot:1:{id}"),
            owner: "divvyuser:1:".to_string(),
            owner_name: "Terraform".to_string(),
            source: "custom".to_string(),
            date_created: "2024-01-01 00:00:00".to_string(),
            date_modified: "2024-01-01 00:00:00".to_string(),
            // New bots always start paused
            definition: BotDefinition {
                state: "paused".to_string(),
                ..definition.clone()
            },
            ..Default::default()
        };
        store.bots.insert(bot.resource_id.clone(), bot.clone());
        Ok(bot)
    }

    async fn get_bot(&self, resource_id: &str) -> ApiResult<Bot> {
        let mut store = self.call("get_bot")?;
        Ok(store.bot_mut(resource_id)?.clone())
    }

    async fn update_bot(&self, resource_id: &str, definition: &BotDefinition) -> ApiResult<Bot> {
        let mut store = self.call("update_bot")?;
        let bot = store.bot_mut(resource_id)?;
        let state = std::mem::take(&mut bot.definition.state);
        bot.definition = BotDefinition {
            state,
            ..definition.clone()
        };
        bot.date_modified = "2024-01-02 00:00:00".to_string();
        Ok(bot.clone())
    }

    async fn pause_bot(&self, resource_id: &str) -> ApiResult<()> {
        let mut store = self.call("pause_bot")?;
        store.bot_mut(resource_id)?.definition.state = "paused".to_string();
        Ok(())
    }

    async fn resume_bot(&self, resource_id: &str) -> ApiResult<()> {
        let mut store = self.call("resume_bot")?;
        store.bot_mut(resource_id)?.definition.state = "running".to_string();
        Ok(())
    }

    async fn archive_bot(&self, resource_id: &str) -> ApiResult<()> {
        let mut store = self.call("archive_bot")?;
        if store.bot_mut(resource_id)?.definition.state == "archived" {
            return Err(missing(format!("botfactory/{resource_id}")));
        }
        store.bot_mut(resource_id)?.definition.state = "archived".to_string();
        Ok(())
    }

    async fn create_insight(&self, insight: &Insight) -> ApiResult<Insight> {
        let mut store = self.call("create_insight")?;
        let id = store.next_id();
        let created = Insight {
            id,
            ..insight.clone()
        };
        store.insights.insert(id, created.clone());
        Ok(created)
    }

    async fn get_insight(&self, id: i64, _source: &str) -> ApiResult<Insight> {
        let store = self.call("get_insight")?;
        store
            .insights
            .get(&id)
            .cloned()
            .ok_or_else(|| missing(format!("insights/{id}")))
    }

    async fn edit_insight(&self, insight: &Insight) -> ApiResult<Insight> {
        let mut store = self.call("edit_insight")?;
        let existing = store
            .insights
            .get_mut(&insight.id)
            .ok_or_else(|| missing(format!("insights/{}", insight.id)))?;
        *existing = insight.clone();
        Ok(insight.clone())
    }

    async fn delete_insight(&self, id: i64) -> ApiResult<()> {
        let mut store = self.call("delete_insight")?;
        store
            .insights
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| missing(format!("insights/{id}")))
    }
}
