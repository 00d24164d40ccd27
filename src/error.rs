//! Error taxonomy and diagnostics
//!
//! Every adapter failure lands in one of four categories. Validation and
//! conflict errors are raised before any remote call; upstream errors wrap the
//! API client failure with the resource-kind context the operator sees.

use crate::api::ApiError;
use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum ProviderError {
    /// Local pre-flight failure; never reaches the network
    #[error("invalid value for \"{field}\": {reason}")]
    ValidationFailed { field: String, reason: String },

    /// The remote entity does not exist
    #[error("{kind} {id} not found")]
    NotFound { kind: String, id: String },

    /// Mutually exclusive configuration groups are both populated
    #[error("conflicting configuration: {reason}")]
    Conflict { reason: String },

    /// A nested block the payload depends on was empty or absent
    #[error("missing nested block \"{field}\"")]
    MissingNestedBlock { field: String },

    /// Wrapped failure from the platform API client
    #[error("{summary}: {source}")]
    Upstream {
        summary: String,
        hint: Option<String>,
        #[source]
        source: ApiError,
    },
}

impl ProviderError {
    pub fn validation(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ValidationFailed {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    pub fn missing_block(field: impl Into<String>) -> Self {
        Self::MissingNestedBlock {
            field: field.into(),
        }
    }

    pub fn not_found(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Wrap an API failure. A remote "not found" keeps its own category so
    /// callers can drop state or treat deletes as done.
    pub fn upstream(summary: impl Into<String>, source: ApiError) -> Self {
        Self::upstream_with_hint(summary, None::<String>, source)
    }

    pub fn upstream_with_hint(
        summary: impl Into<String>,
        hint: Option<impl Into<String>>,
        source: ApiError,
    ) -> Self {
        Self::Upstream {
            summary: summary.into(),
            hint: hint.map(Into::into),
            source,
        }
    }

    /// Map an API error for an identified entity, turning remote 404s into `NotFound`
    pub fn from_api(
        summary: impl Into<String>,
        kind: &str,
        id: impl std::fmt::Display,
        source: ApiError,
    ) -> Self {
        if source.is_not_found() {
            return Self::not_found(kind, id.to_string());
        }
        Self::upstream(summary, source)
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True for errors raised before any network call was attempted
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed { .. } | Self::Conflict { .. } | Self::MissingNestedBlock { .. }
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Structured message reported back to the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub summary: String,
    pub detail: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    pub fn error(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            summary: summary.into(),
            detail: detail.into(),
            attribute: None,
        }
    }

    pub fn warning(summary: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(summary, detail)
        }
    }

    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }
}

impl From<&ProviderError> for Diagnostic {
    fn from(error: &ProviderError) -> Self {
        match error {
            ProviderError::ValidationFailed { field, reason } => {
                Diagnostic::error("Invalid Configuration", format!("{field}: {reason}"))
                    .with_attribute(field.clone())
            }
            ProviderError::NotFound { kind, id } => Diagnostic::error(
                format!("{kind} Not Found"),
                format!("{kind} {id} no longer exists in InsightCloudSec."),
            ),
            ProviderError::Conflict { reason } => {
                Diagnostic::error("Conflicting Configuration", reason.clone())
            }
            ProviderError::MissingNestedBlock { field } => Diagnostic::error(
                "Missing Configuration Block",
                format!("exactly one \"{field}\" block is required"),
            )
            .with_attribute(field.clone()),
            ProviderError::Upstream {
                summary,
                hint,
                source,
            } => {
                let mut detail = String::new();
                if let Some(hint) = hint {
                    detail.push_str(hint);
                    detail.push_str("\n\n");
                }
                detail.push_str("Error from API:\n");
                detail.push_str(&source.to_string());
                Diagnostic::error(summary.clone(), detail)
            }
        }
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(error: ProviderError) -> Self {
        Diagnostic::from(&error)
    }
}
