//! Custom insights

use super::{
    done_if_missing, gone_if_missing, planned, refresh, settle, ReadOutcome, RemoteIdentity,
    ResourceState,
};
use crate::api::client::CUSTOM_INSIGHT_SOURCE;
use crate::api::types::{Insight, InsightFilter};
use crate::api::PlatformApi;
use crate::codec::{expand_list, expand_map, flatten_list, flatten_map_or_empty, Expand, Flatten};
use crate::error::{ProviderError, Result};
use crate::schema::AttributeTree;

pub const RESOURCE: &str = "insightcloudsec_insight";

const KIND: &str = "Insight";

impl Expand for InsightFilter {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(InsightFilter {
            name: tree.required_leaf("name")?,
            config: expand_map(tree, "config")?,
            collections: expand_map(tree, "collections")?,
        })
    }
}

impl Flatten for InsightFilter {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("name", self.name.clone())
            .with("config", flatten_map_or_empty(self.config.as_ref()))
            .with("collections", flatten_map_or_empty(self.collections.as_ref()))
    }
}

impl Expand for Insight {
    fn expand(config: &AttributeTree) -> Result<Self> {
        Ok(Insight {
            id: 0,
            name: config.required_leaf("name")?,
            description: config.leaf_or_default("description")?,
            severity: config.required_leaf("severity")?,
            resource_types: config.strings("resource_types")?,
            filters: expand_list(config, "filter")?,
            scopes: config.strings("scopes")?,
            tags: config.strings("tags")?,
            badges: expand_list(config, "badges")?,
            badge_filter_operator: config.leaf_or_default("badge_filter_operator")?,
        })
    }
}

impl Flatten for Insight {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("severity", self.severity)
            .with("resource_types", self.resource_types.as_slice())
            .with("filter", flatten_list(&self.filters))
            .with("scopes", self.scopes.as_slice())
            .with("tags", self.tags.as_slice())
            .with("badges", flatten_list(&self.badges))
            .with("badge_filter_operator", self.badge_filter_operator.clone())
    }
}

pub async fn create(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
    let insight = Insight::expand(config)?;
    tracing::info!("creating insight {}", insight.name);

    let created = api
        .create_insight(&insight)
        .await
        .map_err(|e| ProviderError::upstream("Error Creating Insight", e))?;
    let id = RemoteIdentity::Numeric(created.id);

    let written = refresh(config, created.flatten());
    let read_back = read(api, &id, &written).await;
    Ok(settle(KIND, id, written, read_back))
}

pub async fn read(api: &dyn PlatformApi, id: &RemoteIdentity, prior: &AttributeTree) -> Result<ReadOutcome> {
    let numeric = id.numeric(KIND)?;
    let result = api
        .get_insight(numeric, CUSTOM_INSIGHT_SOURCE)
        .await
        .map(|insight| ResourceState::new(id.clone(), refresh(prior, insight.flatten())))
        .map_err(|e| ProviderError::from_api("Error Reading Insight", KIND, id, e));
    gone_if_missing(KIND, id, result)
}

pub async fn update(
    api: &dyn PlatformApi,
    id: &RemoteIdentity,
    prior: &AttributeTree,
    config: &AttributeTree,
) -> Result<ResourceState> {
    // An omitted badge_filter_operator keeps the value the platform last reported
    let written = planned(RESOURCE, prior, config)?;
    let insight = Insight {
        id: id.numeric(KIND)?,
        ..Insight::expand(&written)?
    };
    tracing::info!("editing insight {}", insight.id);

    api.edit_insight(&insight)
        .await
        .map_err(|e| ProviderError::from_api("Error Updating Insight", KIND, id, e))?;

    let read_back = read(api, id, &written).await;
    Ok(settle(KIND, id.clone(), written, read_back))
}

pub async fn delete(api: &dyn PlatformApi, id: &RemoteIdentity, _prior: &AttributeTree) -> Result<()> {
    let numeric = id.numeric(KIND)?;
    tracing::info!("deleting insight {}", numeric);
    let result = api
        .delete_insight(numeric)
        .await
        .map_err(|e| ProviderError::from_api("Error Deleting Insight", KIND, id, e));
    done_if_missing(KIND, id, result)
}
