//! The host bridge: the only channel between a non-owner context and the
//! owner context.

use async_trait::async_trait;
use bgstate_core::{EnvironmentProbe, OwnerHandle};

use crate::error::Result;

/// Host messaging primitives the connector relies on.
///
/// A bridge supplies environment facts for the local context (through
/// `EnvironmentProbe`) and a way to reach the owner's published handle.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn HostBridge>`.
#[async_trait]
pub trait HostBridge: EnvironmentProbe {
    /// Resolve the owner context's published handle.
    ///
    /// Requesting the handle starts the owner context if it is not running
    /// yet, then waits until it has initialized. There is no timeout: if the
    /// owner never initializes, the returned future never resolves.
    async fn owner_handle(&self) -> Result<OwnerHandle>;
}
