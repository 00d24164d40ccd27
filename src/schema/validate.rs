//! Field validators
//!
//! Pure predicates applied to leaf values before anything is sent to the
//! platform. Every validator is total: a value of the wrong kind is a
//! violation, never a panic.

use super::value::Value;
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Why a value was rejected
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ViolationReason(pub String);

/// Declared in schema JSON as `{"one_of": [...]}`, `{"int_between": {"min": 1, "max": 5}}`
/// or `{"matches": {"pattern": "...", "message": "..."}}`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Validator {
    OneOf(Vec<String>),
    IntBetween { min: i64, max: i64 },
    Matches { pattern: Pattern, message: String },
}

impl Validator {
    pub fn one_of(allowed: &[&str]) -> Self {
        Validator::OneOf(allowed.iter().map(|s| s.to_string()).collect())
    }

    pub fn int_between(min: i64, max: i64) -> Self {
        Validator::IntBetween { min, max }
    }

    pub fn matches(pattern: &str, message: &str) -> Result<Self, regex::Error> {
        Ok(Validator::Matches {
            pattern: Pattern(Regex::new(pattern)?),
            message: message.to_string(),
        })
    }

    pub fn validate(&self, value: &Value) -> Result<(), ViolationReason> {
        match self {
            Validator::OneOf(allowed) => {
                let Some(s) = value.as_str() else {
                    return Err(expected("string", value));
                };
                if allowed.iter().any(|a| a == s) {
                    Ok(())
                } else {
                    Err(ViolationReason(format!(
                        "expected to be one of [{}], got {s}",
                        allowed.join(", ")
                    )))
                }
            }
            Validator::IntBetween { min, max } => {
                let Some(n) = value.as_int() else {
                    return Err(expected("int", value));
                };
                if (*min..=*max).contains(&n) {
                    Ok(())
                } else {
                    Err(ViolationReason(format!(
                        "expected to be in the range ({min} - {max}), got {n}"
                    )))
                }
            }
            Validator::Matches { pattern, message } => {
                let Some(s) = value.as_str() else {
                    return Err(expected("string", value));
                };
                if pattern.0.is_match(s) {
                    Ok(())
                } else {
                    Err(ViolationReason(message.clone()))
                }
            }
        }
    }
}

fn expected(kind: &str, value: &Value) -> ViolationReason {
    ViolationReason(format!("expected {kind}, got {}", value.kind_name()))
}

/// Compiled regular expression that (de)serializes as its source text
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.0.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Regex::new(&source)
            .map(Pattern)
            .map_err(serde::de::Error::custom)
    }
}
