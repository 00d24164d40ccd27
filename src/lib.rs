//! InsightCloudSec Terraform provider core
//!
//! Maps the InsightCloudSec REST API (clouds, users, bots, insights) onto
//! declarative resources and data sources. The crate is organised the way the
//! provider is driven: a configuration tree arrives from the host framework, is
//! validated against an embedded schema, expanded into typed API payloads,
//! sent through the platform client, and the response is flattened back into
//! state.
//!
//! # Module Structure
//!
//! - [`schema`] - Attribute trees, field specs, validators and schema checks
//! - [`codec`] - Leaf and nested-block conversion between trees and API types
//! - [`api`] - Platform API façade and its reqwest implementation
//! - [`resource`] - Lifecycle adapters per resource kind and the schema registry
//! - [`provider`] - Configured provider that dispatches by type name
//! - [`config`] - Base URL and API key resolution
//! - [`error`] - Error taxonomy and operator-facing diagnostics

pub mod api;
pub mod codec;
pub mod config;
pub mod error;
pub mod provider;
pub mod resource;
pub mod schema;

pub use error::{Diagnostic, ProviderError, Result, Severity};
pub use provider::Provider;
pub use resource::{ReadOutcome, RemoteIdentity, ResourceState};
pub use schema::{AttributeTree, Value};

/// Version injected at compile time via ICS_PROVIDER_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("ICS_PROVIDER_VERSION") {
    Some(v) => v,
    None => "dev",
};
