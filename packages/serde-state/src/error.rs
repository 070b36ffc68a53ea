//! Error types for typed access.

use thiserror::Error;

/// Errors from typed reads and writes.
#[derive(Debug, Error)]
pub enum Error {
    /// The underlying state operation failed.
    #[error(transparent)]
    State(#[from] bgstate_core::Error),

    /// A value could not be deserialized into the requested type.
    #[error("decode error: {0}")]
    Decode(String),

    /// A value could not be serialized.
    #[error("encode error: {0}")]
    Encode(String),

    /// A patch serialized to something other than a map.
    #[error("expected a map to merge into the state, found {found}")]
    NotAMap { found: &'static str },
}

/// Result type alias for typed operations.
pub type Result<T> = std::result::Result<T, Error>;
