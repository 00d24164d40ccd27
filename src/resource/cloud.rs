//! Cloud accounts
//!
//! One resource covers all three providers. `cloud_type` picks which group of
//! settings applies; fields of the other groups must stay unset.

use super::{
    done_if_missing, gone_if_missing, planned, refresh, resource_schema, settle, timestamp_id,
    ReadOutcome, RemoteIdentity, ResourceState,
};
use crate::api::types::{Cloud, CloudAccountParameters, CloudType, GcpCredentials};
use crate::api::PlatformApi;
use crate::codec::{expand_single, flatten_list, Expand, Flatten};
use crate::error::{ProviderError, Result};
use crate::schema::{AttributeTree, Value};

pub const RESOURCE: &str = "insightcloudsec_cloud";
pub const DATA_SOURCE: &str = "insightcloudsec_cloud";
pub const CLOUD_TYPES_DATA_SOURCE: &str = "insightcloudsec_cloud_types";

const KIND: &str = "Cloud";

/// RFC 850 timestamp, e.g. `Monday, 02-Jan-06 15:04:05 UTC`
const LAST_UPDATED_FORMAT: &str = "%A, %d-%b-%y %H:%M:%S %Z";

const AWS: &str = "AWS";
const AZURE: &str = "AZURE_ARM";
const GCE: &str = "GCE";

const ASSUME_ROLE: &str = "assume_role";

/// Rules that depend on the value of `cloud_type`. Runs after the schema check.
pub fn validate(config: &AttributeTree) -> Result<()> {
    let schema = resource_schema(RESOURCE)?;
    let cloud_type: String = config.required_leaf("cloud_type")?;

    if let Some(group) = schema
        .populated_groups(config)
        .into_iter()
        .find(|g| g.name != cloud_type)
    {
        return Err(ProviderError::conflict(format!(
            "{} settings ({}) cannot be used with cloud_type {}",
            group.name,
            group.fields.join(", "),
            cloud_type
        )));
    }

    match cloud_type.as_str() {
        AWS => {
            let auth: String = config.leaf_or_default("authentication_type")?;
            if auth.is_empty() {
                return Err(ProviderError::validation(
                    "authentication_type",
                    "required when cloud_type is AWS",
                ));
            }
            if auth == ASSUME_ROLE {
                for key in ["api_key", "secret_key"] {
                    if !config.is_populated(key) {
                        return Err(ProviderError::validation(
                            key,
                            "required for assume_role authentication",
                        ));
                    }
                }
            }
        }
        AZURE => {
            if !config.is_populated("tenant_id") {
                return Err(ProviderError::validation(
                    "tenant_id",
                    "required when cloud_type is AZURE_ARM",
                ));
            }
        }
        GCE => {
            if !config.is_populated("api_credentials") {
                return Err(ProviderError::missing_block("api_credentials"));
            }
        }
        other => {
            return Err(ProviderError::validation(
                "cloud_type",
                format!("unsupported cloud type {other}"),
            ))
        }
    }
    Ok(())
}

impl Expand for GcpCredentials {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(GcpCredentials {
            kind: tree.leaf_or("type", "service_account".to_string())?,
            project_id: tree.required_leaf("project_id")?,
            private_key_id: tree.required_leaf("private_key_id")?,
            private_key: tree.required_leaf("private_key")?,
            client_email: tree.required_leaf("client_email")?,
            client_id: tree.leaf_or_default("client_id")?,
            auth_uri: tree.leaf_or_default("auth_uri")?,
            token_uri: tree.leaf_or_default("token_uri")?,
            auth_provider_x509_cert_url: tree.leaf_or_default("auth_provider_x509_cert_url")?,
            client_x509_cert_url: tree.leaf_or_default("client_x509_cert_url")?,
        })
    }
}

impl Expand for CloudAccountParameters {
    fn expand(config: &AttributeTree) -> Result<Self> {
        let cloud_type: String = config.required_leaf("cloud_type")?;
        let mut params = CloudAccountParameters {
            name: config.required_leaf("name")?,
            cloud_type: cloud_type.clone(),
            ..Default::default()
        };

        match cloud_type.as_str() {
            AZURE => {
                params.authentication_type = "standard".to_string();
                params.tenant_id = config.leaf_or_default("tenant_id")?;
                params.app_id = config.leaf_or_default("app_id")?;
                params.subscription_id = config.leaf_or_default("subscription_id")?;
                params.api_key_or_cert = config.leaf_or_default("api_key")?;
            }
            AWS => {
                let auth: String = config.required_leaf("authentication_type")?;
                params.account_number = config.leaf_or_default("account")?;
                params.role_arn = config.leaf_or_default("role_arn")?;
                params.duration = config.leaf_or_default("duration")?;
                params.session_name = config.leaf_or_default("session_name")?;
                params.external_id = config.leaf_or_default("external_id")?;
                // Instance assume role authenticates with the harvester's own credentials
                if auth == ASSUME_ROLE {
                    params.api_key_or_cert = config.leaf_or_default("api_key")?;
                    params.secret_key = config.leaf_or_default("secret_key")?;
                }
                params.authentication_type = auth;
            }
            GCE => {
                params.project = config.leaf_or_default("project")?;
                params.gcp_auth = Some(expand_single(config, "api_credentials")?);
            }
            other => {
                return Err(ProviderError::validation(
                    "cloud_type",
                    format!("unsupported cloud type {other}"),
                ))
            }
        }
        Ok(params)
    }
}

impl Flatten for Cloud {
    fn flatten(&self) -> AttributeTree {
        let tree = AttributeTree::new()
            .with("name", self.name.clone())
            .with("cloud_type", self.cloud_type_id.clone())
            .with("creation_time", self.creation_time.clone())
            .with("status", self.status.clone())
            .with("resource_id", self.resource_id.clone())
            .with("group_resource_id", self.group_resource_id.clone())
            .with("org_resource_id", self.org_resource_id.clone())
            .with("strategy_id", self.strategy_id);
        // account_id holds the subscription or project for non-AWS clouds
        if self.cloud_type_id == AWS && !self.account_id.is_empty() {
            tree.with("account", self.account_id.clone())
        } else {
            tree
        }
    }
}

impl Flatten for CloudType {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("cloud_type", self.id.clone())
            .with("name", self.name.clone())
            .with("cloud_access", self.access.clone())
    }
}

fn lookup_attributes(cloud: &Cloud) -> AttributeTree {
    AttributeTree::new()
        .with("name", cloud.name.clone())
        .with("cloud_type", cloud.cloud_type_id.clone())
        .with("account_id", cloud.account_id.clone())
        .with("resource_id", cloud.resource_id.clone())
        .with("strategy_id", cloud.strategy_id)
        .with("cloud_organization_id", cloud.cloud_organization_id.clone())
        .with("group_resource_id", cloud.group_resource_id.clone())
}

pub async fn create(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
    let params = CloudAccountParameters::expand(config)?;
    tracing::info!("adding {} cloud {}", params.cloud_type, params.name);

    let added = match params.cloud_type.as_str() {
        AWS => api.add_aws_cloud(&params).await.map_err(|e| {
            ProviderError::upstream_with_hint(
                "Error Adding AWS Cloud",
                Some(
                    "An error was returned when attempting to add an AWS Cloud to InsightCloudSec.\n\
                     This could be the result of an incorrect role_arn, api_key, secret_key, etc.",
                ),
                e,
            )
        }),
        AZURE => api.add_azure_cloud(&params).await.map_err(|e| {
            ProviderError::upstream_with_hint(
                "Error Adding Azure Cloud",
                Some(
                    "An error was returned when attempting to add an Azure Cloud to InsightCloudSec.\n\
                     This could be the result of an incorrect tenant_id, subscription_id or app_id.",
                ),
                e,
            )
        }),
        _ => api.add_gcp_cloud(&params).await.map_err(|e| {
            ProviderError::upstream_with_hint(
                "Error Adding GCP Cloud",
                Some(
                    "An error was returned when attempting to add a GCP Cloud to InsightCloudSec.\n\
                     This could be the result of incorrect credentials or project settings.",
                ),
                e,
            )
        }),
    }?;
    tracing::debug!("cloud added: id={} resource_id={}", added.id, added.resource_id);

    let id = RemoteIdentity::Numeric(added.id);
    let written = refresh(config, added.flatten());
    let read_back = read(api, &id, &written).await;
    Ok(settle(KIND, id, written, read_back))
}

pub async fn read(api: &dyn PlatformApi, id: &RemoteIdentity, prior: &AttributeTree) -> Result<ReadOutcome> {
    let numeric = id.numeric(KIND)?;
    let result = api
        .get_cloud_by_id(numeric)
        .await
        .map(|cloud| ResourceState::new(id.clone(), refresh(prior, cloud.flatten())))
        .map_err(|e| ProviderError::from_api("Error Reading Cloud", KIND, id, e));
    gone_if_missing(KIND, id, result)
}

pub async fn update(
    api: &dyn PlatformApi,
    id: &RemoteIdentity,
    prior: &AttributeTree,
    config: &AttributeTree,
) -> Result<ResourceState> {
    let numeric = id.numeric(KIND)?;
    let params = CloudAccountParameters::expand(config)?;
    tracing::info!("updating cloud {}", numeric);

    api.update_cloud(numeric, &params)
        .await
        .map_err(|e| ProviderError::from_api("Error Updating Cloud", KIND, id, e))?;

    let mut written = planned(RESOURCE, prior, config)?;
    let stamp = chrono::Utc::now().format(LAST_UPDATED_FORMAT).to_string();
    written.insert("last_updated", stamp);

    let read_back = read(api, id, &written).await;
    Ok(settle(KIND, id.clone(), written, read_back))
}

pub async fn delete(api: &dyn PlatformApi, id: &RemoteIdentity, prior: &AttributeTree) -> Result<()> {
    let mut resource_id: String = prior.leaf_or_default("resource_id")?;
    if resource_id.is_empty() {
        let lookup = api
            .get_cloud_by_id(id.numeric(KIND)?)
            .await
            .map_err(|e| ProviderError::from_api("Error Deleting Cloud", KIND, id, e));
        match lookup {
            Ok(cloud) => resource_id = cloud.resource_id,
            Err(e) => return done_if_missing(KIND, id, Err(e)),
        }
    }

    tracing::info!("deleting cloud {} ({})", id, resource_id);
    let result = api
        .delete_cloud(&resource_id)
        .await
        .map_err(|e| ProviderError::from_api("Error Deleting Cloud", KIND, id, e));
    done_if_missing(KIND, id, result)
}

/// Data source: look a cloud up by its display name
pub async fn read_by_name(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
    let name: String = config.required_leaf("name")?;
    let cloud = api
        .get_cloud_by_name(&name)
        .await
        .map_err(|e| ProviderError::from_api("Error Reading Cloud", KIND, &name, e))?;
    tracing::debug!("cloud {} resolved to id {}", name, cloud.id);
    Ok(ResourceState::new(
        RemoteIdentity::Numeric(cloud.id),
        refresh(config, lookup_attributes(&cloud)),
    ))
}

/// Data source: every cloud type the platform supports
pub async fn read_cloud_types(api: &dyn PlatformApi) -> Result<ResourceState> {
    let types = api
        .list_cloud_types()
        .await
        .map_err(|e| ProviderError::upstream("Error Reading Cloud Types", e))?;
    Ok(ResourceState::new(
        timestamp_id(),
        AttributeTree::new().with("cloud_types", flatten_list(&types)),
    ))
}
