//! Error types for the core layer.

use thiserror::Error;

use crate::context::ContextKind;

/// Errors raised by the state owner and by handles forwarding to it.
///
/// Every variant except `CommitDropped` is a precondition violation: it is
/// returned immediately from the offending call and signals a call-ordering
/// mistake rather than a transient condition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum Error {
    /// An owner operation was called before `initialize` succeeded.
    #[error(
        "cannot call `{operation}` before the state owner is initialized; \
         call it after `initialize` has completed"
    )]
    NotInitialized { operation: &'static str },

    /// `initialize` was called a second time.
    #[error("state owner is already initialized; `initialize` may only be called once")]
    AlreadyInitialized,

    /// An operation was called from a context that may not perform it.
    #[error("cannot call `{operation}` from the {context} context")]
    WrongContext {
        operation: &'static str,
        context: ContextKind,
    },

    /// A connected handle was used before the handshake resolved.
    #[error(
        "cannot call `{operation}` before the connection is established; \
         call it after `connect` has resolved"
    )]
    NotConnected { operation: &'static str },

    /// The scheduler dropped a batch before it committed.
    #[error("pending commit was dropped before it completed")]
    CommitDropped,

    /// A scheduler could not be created.
    #[error("scheduler error: {message}")]
    Scheduler { message: String },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, Error>;
