//! Users
//!
//! The platform splits a user update across several endpoints. Each changed
//! field group goes through the narrowest call that covers it, in a fixed
//! order, and a failure stops the sequence.

use super::{
    done_if_missing, gone_if_missing, planned, refresh, settle, timestamp_id, ChangeSet,
    ReadOutcome, RemoteIdentity, ResourceState,
};
use crate::api::types::{NewUser, User};
use crate::api::PlatformApi;
use crate::codec::{Expand, Flatten};
use crate::error::{ProviderError, Result};
use crate::schema::{AttributeTree, Value};

pub const RESOURCE: &str = "insightcloudsec_user";
pub const USERS_DATA_SOURCE: &str = "insightcloudsec_users";

const KIND: &str = "User";

const INFO_FIELDS: &[&str] = &["name", "email_address", "username"];

/// Levels the info endpoint can grant; the others need the access-level call
fn set_by_info_update(level: &str) -> bool {
    matches!(level, "BASIC_USER" | "ORGANIZATION_ADMIN")
}

impl Expand for NewUser {
    fn expand(config: &AttributeTree) -> Result<Self> {
        Ok(NewUser {
            name: config.required_leaf("name")?,
            username: config.required_leaf("username")?,
            email: config.required_leaf("email_address")?,
            access_level: config.required_leaf("access_level")?,
        })
    }
}

impl Flatten for User {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("name", self.name.clone())
            .with("email_address", self.email_address.clone())
            .with("username", self.username.clone())
            .with("access_level", self.access_level())
            .with("console_access_denied", self.console_access_denied)
            .with("two_factor_enabled", self.two_factor_enabled)
            .with("resource_id", self.resource_id.clone())
            .with("organization_id", self.organization_id)
            .with("organization_name", self.organization_name.clone())
            .with_opt("temporary_pw", self.temporary_pw.clone())
            .with_opt("temp_pw_expiration", self.temp_pw_expiration.clone())
    }
}

/// Row of the user listing
fn summary(user: &User) -> Value {
    Value::Record(
        AttributeTree::new()
            .with("resource_id", user.resource_id.clone())
            .with("name", user.name.clone())
            .with("user_id", user.id)
            .with("organization_admin", user.organization_admin)
            .with("domain_admin", user.domain_admin)
            .with("domain_viewer", user.domain_viewer)
            .with("email_address", user.email_address.clone())
            .with("username", user.username.clone())
            .with("organization_name", user.organization_name.clone())
            .with("organization_id", user.organization_id)
            .with("two_factor_enabled", user.two_factor_enabled)
            .with("two_factor_required", user.two_factor_required)
            .with("groups", user.groups)
            .with("owned_resources", user.owned_resources)
            .with("consecutive_failed_login_attempts", user.consecutive_failed_login_attempts)
            .with("suspended", user.suspended)
            .with("last_login_time", user.last_login_time.clone())
            .with("navigation_blacklist", user.navigation_blacklist.as_slice())
            .with("require_pw_reset", user.require_pw_reset)
            .with("console_access_denied", user.console_access_denied)
            .with("active_api_key_present", user.active_api_key_present)
            .with("create_date", user.create_date.clone()),
    )
}

/// Two-factor can be switched off here but never on
pub fn validate_update(prior: &AttributeTree, config: &AttributeTree) -> Result<()> {
    let was = prior.leaf_or_default::<bool>("two_factor_enabled")?;
    let wants = config.leaf::<bool>("two_factor_enabled")?;
    if wants == Some(true) && !was {
        return Err(ProviderError::validation(
            "two_factor_enabled",
            "two-factor authentication can only be enabled by the user; it can only be disabled here",
        ));
    }
    Ok(())
}

pub async fn create(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
    // A new user starts without two-factor, so asking for it is the same as enabling it
    validate_update(&AttributeTree::new(), config)?;
    let new_user = NewUser::expand(config)?;
    tracing::info!("creating user {}", new_user.username);

    let created = api
        .create_user(&new_user)
        .await
        .map_err(|e| ProviderError::upstream("Error Creating User", e))?;
    let id = RemoteIdentity::Numeric(created.id);

    if config.leaf_or_default::<bool>("console_access_denied")? {
        api.set_console_access(created.id, true)
            .await
            .map_err(|e| ProviderError::from_api("Error Setting Console Access", KIND, &id, e))?;
    }

    let written = refresh(config, created.flatten());
    let read_back = read(api, &id, &written).await;
    Ok(settle(KIND, id, written, read_back))
}

pub async fn read(api: &dyn PlatformApi, id: &RemoteIdentity, prior: &AttributeTree) -> Result<ReadOutcome> {
    let numeric = id.numeric(KIND)?;
    let result = api
        .get_user_by_id(numeric)
        .await
        .map(|user| ResourceState::new(id.clone(), refresh(prior, user.flatten())))
        .map_err(|e| ProviderError::from_api("Error Reading User", KIND, id, e));
    gone_if_missing(KIND, id, result)
}

/// Import passthrough: the import id is the numeric user id
pub async fn import(api: &dyn PlatformApi, id: &str) -> Result<ReadOutcome> {
    let id = RemoteIdentity::parse(id);
    id.numeric(KIND)?;
    read(api, &id, &AttributeTree::new()).await
}

pub async fn update(
    api: &dyn PlatformApi,
    id: &RemoteIdentity,
    prior: &AttributeTree,
    config: &AttributeTree,
) -> Result<ResourceState> {
    let numeric = id.numeric(KIND)?;
    validate_update(prior, config)?;
    let changes = ChangeSet::between(RESOURCE, prior, config)?;
    let user = NewUser::expand(config)?;
    let wrap = |e| ProviderError::from_api("Error Updating User", KIND, id, e);

    let level_changed = changes.has("access_level");
    if changes.any(INFO_FIELDS) || (level_changed && set_by_info_update(&user.access_level)) {
        tracing::info!("updating info for user {}", numeric);
        api.update_user_info(numeric, &user).await.map_err(wrap)?;
    }

    if level_changed && !set_by_info_update(&user.access_level) {
        let current: String = prior.leaf_or("access_level", "BASIC_USER".to_string())?;
        tracing::info!(
            "changing access level of user {} from {} to {}",
            numeric,
            current,
            user.access_level
        );
        api.edit_access_level(numeric, &current, &user.access_level)
            .await
            .map_err(wrap)?;
    }

    if changes.has("console_access_denied") {
        let denied = config.leaf_or_default::<bool>("console_access_denied")?;
        api.set_console_access(numeric, denied).await.map_err(wrap)?;
    }

    if changes.has("two_factor_enabled") && config.leaf::<bool>("two_factor_enabled")? == Some(false) {
        tracing::info!("disabling two-factor authentication for user {}", numeric);
        api.disable_two_factor(numeric).await.map_err(wrap)?;
    }

    let written = planned(RESOURCE, prior, config)?;
    let read_back = read(api, id, &written).await;
    Ok(settle(KIND, id.clone(), written, read_back))
}

pub async fn delete(api: &dyn PlatformApi, id: &RemoteIdentity, prior: &AttributeTree) -> Result<()> {
    let mut resource_id: String = prior.leaf_or_default("resource_id")?;
    if resource_id.is_empty() {
        let lookup = api
            .get_user_by_id(id.numeric(KIND)?)
            .await
            .map_err(|e| ProviderError::from_api("Error Deleting User", KIND, id, e));
        match lookup {
            Ok(user) => resource_id = user.resource_id,
            Err(e) => return done_if_missing(KIND, id, Err(e)),
        }
    }

    tracing::info!("deleting user {} ({})", id, resource_id);
    let result = api
        .delete_user(&resource_id)
        .await
        .map_err(|e| ProviderError::from_api("Error Deleting User", KIND, id, e));
    done_if_missing(KIND, id, result)
}

/// Data source: every user visible to the API key
pub async fn read_users(api: &dyn PlatformApi) -> Result<ResourceState> {
    let list = api
        .list_users()
        .await
        .map_err(|e| ProviderError::upstream("Error Reading Users", e))?;
    tracing::debug!("{} users returned", list.users.len());
    Ok(ResourceState::new(
        timestamp_id(),
        AttributeTree::new()
            .with("total_count", list.total_count)
            .with("users", Value::List(list.users.iter().map(summary).collect())),
    ))
}
