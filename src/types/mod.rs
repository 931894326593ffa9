//! Data model for extracted workbook metadata.
//!
//! Every record serializes with camelCase keys. Empty optional fields are
//! omitted from JSON, and `#[serde(default)]` lets a document that omitted
//! them decode back into the same value.

mod cell;
mod image;
mod metadata;
mod sheet;
mod style;

pub use cell::*;
pub use image::*;
pub use metadata::*;
pub use sheet::*;
pub use style::*;

/// Helper for `skip_serializing_if` on integer ids and counters.
pub(crate) fn is_zero<T: Default + PartialEq>(v: &T) -> bool {
    *v == T::default()
}

/// Helper for `skip_serializing_if` on float fields that default to zero.
#[allow(clippy::float_cmp)]
pub(crate) fn is_zero_f64(v: &f64) -> bool {
    *v == 0.0
}

/// Helper for `skip_serializing_if` on boolean flags that default to false.
pub(crate) fn is_false(b: &bool) -> bool {
    !b
}
