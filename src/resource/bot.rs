//! Bots
//!
//! A bot is identified by its resource id (`divvybot:<org>:<n>`). Its state
//! is not part of the regular update payload: pausing, resuming and archiving
//! each have their own endpoint. Deleting a bot archives it.

use super::{
    done_if_missing, gone_if_missing, planned, refresh, settle, ReadOutcome, RemoteIdentity,
    ResourceState,
};
use crate::api::types::{
    Bot, BotAction, BotDefinition, BotFilter, BotInstructions, BotSchedule, TimeOfDay,
    TIME_OF_DAY_TYPE,
};
use crate::api::PlatformApi;
use crate::codec::{
    expand_list, expand_map, expand_optional_single, expand_single, flatten_list,
    flatten_map_or_empty, flatten_single, Expand, Flatten,
};
use crate::error::{ProviderError, Result};
use crate::schema::{AttributeTree, Value};

pub const RESOURCE: &str = "insightcloudsec_bot";
pub const DATA_SOURCE: &str = "insightcloudsec_bot";

const KIND: &str = "Bot";

const PAUSED: &str = "paused";
const RUNNING: &str = "running";
const ARCHIVED: &str = "archived";
const SCANNING: &str = "scanning";

/// Instruction fields reported by the bot data source
const LOOKUP_INSTRUCTION_FIELDS: [&str; 6] = [
    "resource_types",
    "groups",
    "hookpoints",
    "badges",
    "filters",
    "actions",
];

pub fn validate(config: &AttributeTree) -> Result<()> {
    if config.leaf::<String>("state")?.as_deref() == Some(SCANNING) {
        return Err(ProviderError::validation(
            "state",
            "scanning is reported by the platform and cannot be requested",
        ));
    }
    Ok(())
}

impl Expand for TimeOfDay {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(TimeOfDay {
            kind: TIME_OF_DAY_TYPE.to_string(),
            hour: tree.required_leaf("hour")?,
            minute: tree.required_leaf("minute")?,
            second: tree.required_leaf("second")?,
        })
    }
}

impl Flatten for TimeOfDay {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("hour", self.hour)
            .with("minute", self.minute)
            .with("second", self.second)
    }
}

impl Expand for BotSchedule {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(BotSchedule {
            kind: tree.required_leaf("_type")?,
            time_of_day: expand_optional_single(tree, "time_of_day")?,
            day_of_month: tree.leaf("day_of_month")?,
            exclude_days: tree.leaves("exclude_days")?,
        })
    }
}

impl Flatten for BotSchedule {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("_type", self.kind.clone())
            .with("time_of_day", flatten_single(self.time_of_day.as_ref()))
            .with_opt("day_of_month", self.day_of_month)
            .with("exclude_days", self.exclude_days.as_slice())
    }
}

impl Expand for BotFilter {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(BotFilter {
            name: tree.required_leaf("name")?,
            config: expand_map(tree, "config")?,
        })
    }
}

impl Flatten for BotFilter {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("name", self.name.clone())
            .with("config", flatten_map_or_empty(self.config.as_ref()))
    }
}

impl Expand for BotAction {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(BotAction {
            name: tree.required_leaf("name")?,
            config: expand_map(tree, "config")?,
            run_when_result_is: tree.leaf_or("run_when_result_is", true)?,
        })
    }
}

impl Flatten for BotAction {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("name", self.name.clone())
            .with("config", flatten_map_or_empty(self.config.as_ref()))
            .with("run_when_result_is", self.run_when_result_is)
    }
}

impl Expand for BotInstructions {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(BotInstructions {
            resource_types: tree.strings("resource_types")?,
            groups: tree.strings("groups")?,
            badges: expand_list(tree, "badges")?,
            filters: expand_list(tree, "filters")?,
            actions: expand_list(tree, "actions")?,
            hookpoints: tree.strings("hookpoints")?,
            schedule: expand_optional_single(tree, "schedule")?,
        })
    }
}

impl Flatten for BotInstructions {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("resource_types", self.resource_types.as_slice())
            .with("groups", self.groups.as_slice())
            .with("badges", flatten_list(&self.badges))
            .with("filters", flatten_list(&self.filters))
            .with("actions", flatten_list(&self.actions))
            .with("hookpoints", self.hookpoints.as_slice())
            .with("schedule", flatten_single(self.schedule.as_ref()))
    }
}

impl Expand for BotDefinition {
    fn expand(config: &AttributeTree) -> Result<Self> {
        Ok(BotDefinition {
            name: config.required_leaf("name")?,
            description: config.leaf_or_default("description")?,
            notes: config.leaf_or_default("notes")?,
            state: config.leaf_or("state", PAUSED.to_string())?,
            badge_scope_operator: config.leaf_or("badge_scope_operator", "OR".to_string())?,
            category: config.required_leaf("category")?,
            severity: config.required_leaf("severity")?,
            insight_id: config.leaf("insight_id")?,
            instructions: expand_single(config, "instructions")?,
        })
    }
}

impl Flatten for BotDefinition {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("name", self.name.clone())
            .with("description", self.description.clone())
            .with("notes", self.notes.clone())
            .with("state", self.state.clone())
            .with("badge_scope_operator", self.badge_scope_operator.clone())
            .with("category", self.category.clone())
            .with("severity", self.severity.clone())
            .with_opt("insight_id", self.insight_id.clone())
            .with("instructions", flatten_single(Some(&self.instructions)))
    }
}

impl Flatten for Bot {
    fn flatten(&self) -> AttributeTree {
        let mut tree = self.definition.flatten();
        tree.overlay(
            AttributeTree::new()
                .with("resource_id", self.resource_id.clone())
                .with("owner", self.owner.clone())
                .with("owner_name", self.owner_name.clone())
                .with("source", self.source.clone())
                .with("date_created", self.date_created.clone())
                .with("date_modified", self.date_modified.clone()),
        );
        tree
    }
}

fn lookup_attributes(bot: &Bot) -> AttributeTree {
    let instructions = bot
        .definition
        .instructions
        .flatten()
        .project(LOOKUP_INSTRUCTION_FIELDS);
    bot.flatten()
        .with("insight_name", bot.insight_name.clone())
        .with("insight_severity", bot.insight_severity.clone())
        .with("instructions", Value::List(vec![Value::Record(instructions)]))
}

/// Definition as the operator sees it, minus the state which has its own endpoints.
/// Flattening normalizes absent lists and maps so equal bots compare equal.
fn comparable(definition: &BotDefinition) -> AttributeTree {
    let mut tree = definition.flatten();
    tree.remove("state");
    tree
}

fn resource_id(id: &RemoteIdentity) -> Result<&str> {
    match id {
        RemoteIdentity::Resource(rid) => Ok(rid.as_str()),
        RemoteIdentity::Numeric(n) => Err(ProviderError::validation(
            "id",
            format!("bots are identified by resource id (divvybot:...), got {n}"),
        )),
    }
}

/// Move a bot into `desired` through the dedicated state endpoint
async fn transition(api: &dyn PlatformApi, id: &RemoteIdentity, desired: &str) -> Result<()> {
    let rid = resource_id(id)?;
    tracing::info!("moving bot {} to {}", rid, desired);
    let result = match desired {
        PAUSED => api.pause_bot(rid).await,
        RUNNING => api.resume_bot(rid).await,
        ARCHIVED => api.archive_bot(rid).await,
        other => {
            return Err(ProviderError::validation(
                "state",
                format!("cannot move a bot to {other}"),
            ))
        }
    };
    result.map_err(|e| ProviderError::from_api("Error Changing Bot State", KIND, id, e))
}

pub async fn create(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
    validate(config)?;
    let definition = BotDefinition::expand(config)?;
    tracing::info!("creating bot {}", definition.name);

    let created = api
        .create_bot(&definition)
        .await
        .map_err(|e| ProviderError::upstream("Error Creating Bot", e))?;
    let id = RemoteIdentity::Resource(created.resource_id.clone());

    if created.definition.state != definition.state {
        transition(api, &id, &definition.state).await?;
    }

    let written = refresh(config, created.flatten());
    let read_back = read(api, &id, &written).await;
    Ok(settle(KIND, id, written, read_back))
}

pub async fn read(api: &dyn PlatformApi, id: &RemoteIdentity, prior: &AttributeTree) -> Result<ReadOutcome> {
    let rid = resource_id(id)?;
    let result = api
        .get_bot(rid)
        .await
        .map(|bot| ResourceState::new(id.clone(), refresh(prior, bot.flatten())))
        .map_err(|e| ProviderError::from_api("Error Reading Bot", KIND, id, e));
    gone_if_missing(KIND, id, result)
}

pub async fn update(
    api: &dyn PlatformApi,
    id: &RemoteIdentity,
    prior: &AttributeTree,
    config: &AttributeTree,
) -> Result<ResourceState> {
    validate(config)?;
    let rid = resource_id(id)?;
    let definition = BotDefinition::expand(config)?;
    // Prior state from an import may not expand; treat everything as changed
    let before = BotDefinition::expand(prior).ok();

    let definition_changed = before
        .as_ref()
        .map_or(true, |b| comparable(b) != comparable(&definition));
    if definition_changed {
        tracing::info!("updating bot {}", rid);
        api.update_bot(rid, &definition)
            .await
            .map_err(|e| ProviderError::from_api("Error Updating Bot", KIND, id, e))?;
    }
    if before.map_or(true, |b| b.state != definition.state) {
        transition(api, id, &definition.state).await?;
    }

    let written = planned(RESOURCE, prior, config)?;
    let read_back = read(api, id, &written).await;
    Ok(settle(KIND, id.clone(), written, read_back))
}

/// Bots are never hard-deleted; they are archived
pub async fn delete(api: &dyn PlatformApi, id: &RemoteIdentity, _prior: &AttributeTree) -> Result<()> {
    done_if_missing(KIND, id, transition(api, id, ARCHIVED).await)
}

/// Data source: look a bot up by resource id
pub async fn read_by_resource_id(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
    let rid: String = config.required_leaf("resource_id")?;
    let bot = api
        .get_bot(&rid)
        .await
        .map_err(|e| ProviderError::from_api("Error Reading Bot", KIND, &rid, e))?;
    Ok(ResourceState::new(
        RemoteIdentity::Resource(rid),
        refresh(config, lookup_attributes(&bot)),
    ))
}
