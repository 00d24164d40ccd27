//! Schema layer
//!
//! - [`value`] - The dynamically typed attribute tree handed over by the host
//! - [`field`] - Per-field declarations (kind, cardinality, mode, defaults)
//! - [`validate`] - Leaf validators (enum membership, integer range, regex)
//! - [`block`] - Whole-block configuration checks, conflict groups and diffs

pub mod block;
pub mod field;
pub mod validate;
pub mod value;

pub use block::{BlockSchema, ConflictGroup};
pub use field::{Cardinality, FieldSpec, Mode, ValueKind};
pub use validate::{Validator, ViolationReason};
pub use value::{AttributeTree, Value};

/// Join a parent attribute path and a child segment (`instructions.0.filters`)
pub(crate) fn join_path(parent: &str, child: &str) -> String {
    if parent.is_empty() {
        child.to_string()
    } else {
        format!("{parent}.{child}")
    }
}
