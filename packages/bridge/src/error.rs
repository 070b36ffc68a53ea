//! Error types for the bridge layer.

use thiserror::Error;

/// Errors raised while reaching the owner through the host bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeError {
    /// The host's messaging layer reported a failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The host went away before the owner published its handle.
    #[error("owner handle is no longer available")]
    OwnerUnavailable,

    /// A core precondition failed during the handshake.
    #[error(transparent)]
    State(#[from] bgstate_core::Error),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
