//! Resource lifecycle layer
//!
//! Each resource kind is an adapter module exposing the same free functions:
//! `validate`, `create`, `read`, `update` and `delete`, plus the data-source
//! reads that share its payload types. Adapters take the validated
//! configuration tree, expand it into API payloads, call [`PlatformApi`] and
//! flatten the response back into state. Schemas come from [`registry`].
//!
//! # Architecture
//!
//! - [`registry`] - Loads and caches schemas from embedded JSON
//! - [`cloud`] - Cloud accounts (AWS, Azure, GCP) and cloud lookups
//! - [`user`] - Users and the user listing
//! - [`bot`] - Bots and the bot lookup
//! - [`insight`] - Custom insights
//!
//! # Example
//!
//! ```ignore
//! use insightcloudsec::resource::{cloud, resource_schema};
//!
//! async fn add(api: &dyn PlatformApi, config: &AttributeTree) -> Result<ResourceState> {
//!     let config = resource_schema(cloud::RESOURCE)?.validate_config(config)?;
//!     cloud::validate(&config)?;
//!     cloud::create(api, &config).await
//! }
//! ```

pub mod bot;
pub mod cloud;
pub mod insight;
mod registry;
pub mod user;

pub use registry::*;

use crate::api::types::Badge;
use crate::codec::{Expand, Flatten};
use crate::error::{Diagnostic, ProviderError, Result, Severity};
use crate::schema::AttributeTree;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;

/// How the platform identifies an entity: clouds, users and insights by
/// integer id, bots by their resource id string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteIdentity {
    Numeric(i64),
    Resource(String),
}

impl RemoteIdentity {
    /// Parse a stored id string; anything that is not an integer is a resource id
    pub fn parse(id: &str) -> Self {
        match id.parse::<i64>() {
            Ok(n) => RemoteIdentity::Numeric(n),
            Err(_) => RemoteIdentity::Resource(id.to_string()),
        }
    }

    /// The integer id, or a validation error naming the resource kind
    pub fn numeric(&self, kind: &str) -> Result<i64> {
        match self {
            RemoteIdentity::Numeric(n) => Ok(*n),
            RemoteIdentity::Resource(s) => Err(ProviderError::validation(
                "id",
                format!("{kind} ids are integers, got {s:?}"),
            )),
        }
    }
}

impl fmt::Display for RemoteIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemoteIdentity::Numeric(n) => write!(f, "{n}"),
            RemoteIdentity::Resource(s) => f.write_str(s),
        }
    }
}

impl Serialize for RemoteIdentity {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// What the host persists for one managed entity
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResourceState {
    pub id: RemoteIdentity,
    pub attributes: AttributeTree,
    /// Non-fatal problems met while producing this state; reported, never persisted
    #[serde(skip)]
    pub warnings: Vec<Diagnostic>,
}

impl ResourceState {
    pub fn new(id: RemoteIdentity, attributes: AttributeTree) -> Self {
        Self {
            id,
            attributes,
            warnings: Vec::new(),
        }
    }

    pub fn with_warning(mut self, warning: Diagnostic) -> Self {
        self.warnings.push(warning);
        self
    }
}

/// Result of a read: the entity, or a signal that it no longer exists and
/// the host should drop it from state
#[derive(Debug, Clone, PartialEq)]
pub enum ReadOutcome {
    Found(ResourceState),
    Gone,
}

impl ReadOutcome {
    pub fn found(self) -> Option<ResourceState> {
        match self {
            ReadOutcome::Found(state) => Some(state),
            ReadOutcome::Gone => None,
        }
    }
}

/// Settable top-level fields whose planned value differs from prior state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeSet(BTreeSet<String>);

impl ChangeSet {
    pub fn between(schema_name: &str, prior: &AttributeTree, planned: &AttributeTree) -> Result<Self> {
        Ok(ChangeSet(
            resource_schema(schema_name)?.changed_fields(prior, planned),
        ))
    }

    pub fn has(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn any(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.has(f))
    }

}

/// Turn a read that hit a missing entity into [`ReadOutcome::Gone`]
pub(crate) fn gone_if_missing(kind: &str, id: &RemoteIdentity, result: Result<ResourceState>) -> Result<ReadOutcome> {
    match result {
        Ok(state) => Ok(ReadOutcome::Found(state)),
        Err(e) if e.is_not_found() => {
            tracing::warn!("{} {} no longer exists, removing from state", kind, id);
            Ok(ReadOutcome::Gone)
        }
        Err(e) => Err(e),
    }
}

/// Deleting something already gone counts as success
pub(crate) fn done_if_missing(kind: &str, id: &RemoteIdentity, result: Result<()>) -> Result<()> {
    match result {
        Err(e) if e.is_not_found() => {
            tracing::info!("{} {} was already deleted", kind, id);
            Ok(())
        }
        other => other,
    }
}

/// Final state after a create or update. The read-back wins; when it fails
/// the written attributes are kept so the new id is never lost, and the
/// failure travels with the state as a warning.
pub(crate) fn settle(kind: &str, id: RemoteIdentity, written: AttributeTree, read_back: Result<ReadOutcome>) -> ResourceState {
    match read_back {
        Ok(ReadOutcome::Found(state)) => state,
        Ok(ReadOutcome::Gone) => {
            tracing::warn!("{} {} vanished right after being written", kind, id);
            let warning = Diagnostic::warning(
                format!("{kind} Not Found After Write"),
                format!("{kind} {id} was written but could not be read back; state holds the written values."),
            );
            ResourceState::new(id, written).with_warning(warning)
        }
        Err(e) => {
            tracing::warn!("reading back {} {} failed: {}", kind, id, e);
            let warning = Diagnostic {
                severity: Severity::Warning,
                ..Diagnostic::from(&e)
            };
            ResourceState::new(id, written).with_warning(warning)
        }
    }
}

/// Prior state with every freshly flattened field overlaid. Write-only
/// values the platform never returns survive from prior state.
pub(crate) fn refresh(prior: &AttributeTree, flattened: AttributeTree) -> AttributeTree {
    let mut attributes = prior.clone();
    attributes.overlay(flattened);
    attributes
}

/// Attributes to write for an update: the new configuration, plus the prior
/// value of every computed field the configuration leaves out
pub(crate) fn planned(schema_name: &str, prior: &AttributeTree, config: &AttributeTree) -> Result<AttributeTree> {
    let schema = resource_schema(schema_name)?;
    let mut out = config.clone();
    for (name, spec) in &schema.fields {
        if spec.is_computed() && !out.contains(name) {
            if let Some(value) = prior.get(name) {
                out.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(out)
}

/// The current unix time as a data-source id
pub(crate) fn timestamp_id() -> RemoteIdentity {
    RemoteIdentity::Numeric(chrono::Utc::now().timestamp())
}

impl Expand for Badge {
    fn expand(tree: &AttributeTree) -> Result<Self> {
        Ok(Badge {
            key: tree.required_leaf("key")?,
            value: tree.required_leaf("value")?,
        })
    }
}

impl Flatten for Badge {
    fn flatten(&self) -> AttributeTree {
        AttributeTree::new()
            .with("key", self.key.clone())
            .with("value", self.value.clone())
    }
}
