//! Attribute-tree codec
//!
//! Converts between operator-facing attribute trees and the typed payloads the
//! platform client speaks.
//!
//! - [`leaf`] - Scalar decode/encode with typed kind-mismatch errors
//! - [`nested`] - `Expand`/`Flatten` for nested record lists and sets

pub mod leaf;
pub mod nested;

pub use leaf::Leaf;
pub use nested::{
    expand_list, expand_map, expand_optional_single, expand_set, expand_single, flatten_list,
    flatten_map_or_empty, flatten_single, Expand, Flatten,
};
