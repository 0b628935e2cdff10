//! Error types for the inspector core.
//!
//! Data-shape problems never surface here: unknown values degrade to
//! `unknown`, cycles to `circular`, and excess depth is dropped. What remains
//! are contract violations between the caller and the parser or renderer.

use thiserror::Error;

/// All inspector errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XrayError {
    /// A type name outside the fixed descriptor taxonomy
    #[error("Unknown data type '{0}' encountered")]
    UnknownType(String),

    /// `parse_global_data`/`parse_page_data` called before `set_global_keys`
    #[error("Global keys must be set before parsing (call `set_global_keys` first)")]
    GlobalKeysNotSet,
}

pub type Result<T, E = XrayError> = std::result::Result<T, E>;
