//! InsightCloudSec payloads
//!
//! Field names follow the platform's JSON. Every response struct defaults
//! missing keys so a sparse response still decodes.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub type JsonMap = Map<String, Value>;

fn is_zero(n: &i64) -> bool {
    *n == 0
}

// =============================================================================
// Clouds
// =============================================================================

/// Cloud account as listed by the platform
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cloud {
    pub id: i64,
    pub name: String,
    pub cloud_type_id: String,
    pub account_id: String,
    pub creation_time: String,
    pub status: String,
    pub resource_id: String,
    pub group_resource_id: String,
    pub org_resource_id: String,
    pub cloud_organization_id: String,
    pub strategy_id: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CloudList {
    pub clouds: Vec<Cloud>,
}

/// Creation/update parameters for a cloud account
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CloudAccountParameters {
    pub cloud_type: String,
    pub authentication_type: String,
    pub name: String,
    #[serde(rename = "api_key_or_cert", skip_serializing_if = "String::is_empty", default)]
    pub api_key_or_cert: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub secret_key: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub account_number: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub role_arn: String,
    #[serde(skip_serializing_if = "is_zero", default)]
    pub duration: i64,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub session_name: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub external_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub tenant_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub app_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub subscription_id: String,
    #[serde(skip_serializing_if = "String::is_empty", default)]
    pub project: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub gcp_auth: Option<GcpCredentials>,
}

/// Service account key material for GCE clouds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GcpCredentials {
    #[serde(rename = "type")]
    pub kind: String,
    pub project_id: String,
    pub private_key_id: String,
    pub private_key: String,
    pub client_email: String,
    pub client_id: String,
    pub auth_uri: String,
    pub token_uri: String,
    pub auth_provider_x509_cert_url: String,
    pub client_x509_cert_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CloudType {
    #[serde(rename = "cloud_type_id")]
    pub id: String,
    pub name: String,
    #[serde(rename = "cloud_access")]
    pub access: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub(crate) struct CloudTypeList {
    pub cloudtypes: Vec<CloudType>,
}

// =============================================================================
// Users
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "user_id")]
    pub id: i64,
    pub resource_id: String,
    pub name: String,
    pub username: String,
    pub email_address: String,
    pub organization_name: String,
    pub organization_id: i64,
    pub organization_admin: bool,
    pub domain_admin: bool,
    pub domain_viewer: bool,
    pub two_factor_enabled: bool,
    pub two_factor_required: bool,
    pub groups: i64,
    pub owned_resources: i64,
    pub consecutive_failed_login_attempts: i64,
    pub suspended: bool,
    pub last_login_time: String,
    pub navigation_blacklist: Vec<String>,
    pub require_pw_reset: bool,
    pub console_access_denied: bool,
    pub active_api_key_present: bool,
    pub create_date: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temporary_pw: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temp_pw_expiration: Option<String>,
}

impl User {
    /// Access level derived from the role flags, most privileged first
    pub fn access_level(&self) -> &'static str {
        if self.domain_admin {
            "DOMAIN_ADMIN"
        } else if self.organization_admin {
            "ORGANIZATION_ADMIN"
        } else if self.domain_viewer {
            "DOMAIN_VIEWER"
        } else {
            "BASIC_USER"
        }
    }
}

/// Body for user creation and info updates
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: String,
    pub username: String,
    pub email: String,
    pub access_level: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserList {
    pub users: Vec<User>,
    pub total_count: i64,
}

// =============================================================================
// Bots and insights
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Badge {
    pub key: String,
    pub value: String,
}

/// Writable part of a bot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotDefinition {
    pub name: String,
    pub description: String,
    pub notes: String,
    pub state: String,
    pub badge_scope_operator: String,
    pub category: String,
    pub severity: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insight_id: Option<String>,
    pub instructions: BotInstructions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Bot {
    pub resource_id: String,
    pub owner: String,
    pub owner_name: String,
    pub source: String,
    pub insight_name: String,
    pub insight_severity: String,
    pub date_created: String,
    pub date_modified: String,
    #[serde(flatten)]
    pub definition: BotDefinition,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotInstructions {
    pub resource_types: Vec<String>,
    pub groups: Vec<String>,
    pub badges: Vec<Badge>,
    pub filters: Vec<BotFilter>,
    pub actions: Vec<BotAction>,
    pub hookpoints: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schedule: Option<BotSchedule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotFilter {
    pub name: String,
    pub config: Option<JsonMap>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotAction {
    pub name: String,
    pub config: Option<JsonMap>,
    /// Actions run on a positive match unless told otherwise
    #[serde(default = "default_true")]
    pub run_when_result_is: bool,
}

impl Default for BotAction {
    fn default() -> Self {
        Self {
            name: String::new(),
            config: None,
            run_when_result_is: true,
        }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BotSchedule {
    #[serde(rename = "_type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_of_day: Option<TimeOfDay>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub day_of_month: Option<i64>,
    pub exclude_days: Vec<i64>,
}

pub const TIME_OF_DAY_TYPE: &str = "datetime.time";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeOfDay {
    #[serde(rename = "_type")]
    pub kind: String,
    pub hour: i64,
    pub minute: i64,
    pub second: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Insight {
    #[serde(skip_serializing_if = "is_zero")]
    pub id: i64,
    pub name: String,
    pub description: String,
    pub severity: i64,
    pub resource_types: Vec<String>,
    pub filters: Vec<InsightFilter>,
    pub scopes: Vec<String>,
    pub tags: Vec<String>,
    pub badges: Vec<Badge>,
    pub badge_filter_operator: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InsightFilter {
    pub name: String,
    pub config: Option<JsonMap>,
    pub collections: Option<JsonMap>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sparse_cloud_decodes() {
        let cloud: Cloud = serde_json::from_value(json!({"id": 7, "name": "prod"})).unwrap();
        assert_eq!(cloud.id, 7);
        assert!(cloud.resource_id.is_empty());
    }

    #[test]
    fn test_access_level_prefers_most_privileged_flag() {
        let user = User {
            organization_admin: true,
            domain_admin: true,
            ..Default::default()
        };
        assert_eq!(user.access_level(), "DOMAIN_ADMIN");
        assert_eq!(User::default().access_level(), "BASIC_USER");
    }

    #[test]
    fn test_bot_flattens_definition_fields() {
        let bot: Bot = serde_json::from_value(json!({
            "resource_id": "divvybot:1:42",
            "name": "Stop public buckets",
            "state": "paused",
            "instructions": {"resource_types": ["storagecontainer"]}
        }))
        .unwrap();
        assert_eq!(bot.definition.name, "Stop public buckets");
        assert_eq!(bot.definition.instructions.resource_types, vec!["storagecontainer"]);
    }

    #[test]
    fn test_bot_action_runs_on_match_by_default() {
        let action: BotAction = serde_json::from_value(json!({"name": "divvy.action.stop_instance"})).unwrap();
        assert!(action.run_when_result_is);
        assert!(action.config.is_none());

        let action: BotAction =
            serde_json::from_value(json!({"name": "divvy.action.stop_instance", "run_when_result_is": false}))
                .unwrap();
        assert!(!action.run_when_result_is);
    }

    #[test]
    fn test_cloud_params_skip_empty_fields() {
        let params = CloudAccountParameters {
            cloud_type: "AWS".to_string(),
            authentication_type: "instance_assume_role".to_string(),
            name: "prod".to_string(),
            role_arn: "arn:aws:iam::123:role/x".to_string(),
            ..Default::default()
        };
        let body = serde_json::to_value(&params).unwrap();
        assert!(body.get("secret_key").is_none());
        assert!(body.get("duration").is_none());
        assert_eq!(body["role_arn"], "arn:aws:iam::123:role/x");
    }
}
