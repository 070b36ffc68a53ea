//! bgstate: shared reactive state for browser extensions.
//!
//! One context (the background page) owns the state. Every other privileged
//! context of the extension connects to it and reads, writes and subscribes
//! through the same `SharedState` interface.
//!
//! - `StateOwner` / `OwnerHandle`: the owner side, from `bgstate-core`
//! - `Connector` / `ConnectedHandle`: the remote side, from `bgstate-bridge`
//! - `TypedState`: serde-typed reads and writes, from `bgstate-serde`
//! - `SnapshotStore`: JSON persistence, from `bgstate-json-store`
//!
//! # Example
//!
//! ```rust,ignore
//! use bgstate::prelude::*;
//!
//! // background page
//! let owner = StateOwner::new(environment, TokioScheduler::current()?);
//! let handle = owner.initialize(state! { "apples" => 2 })?;
//!
//! // popup
//! let connector = Connector::new(Arc::new(bridge));
//! if let Some(remote) = connector.connect().await? {
//!     remote.update(|s| state! { "apples" => s["apples"].as_i64().unwrap_or(0) + 1 })?.await?;
//! }
//! ```

pub use bgstate_core::*;

pub use bgstate_bridge::{BridgeError, ConnectedHandle, Connector, HostBridge, InMemoryBridge};
pub use bgstate_json_store::{SnapshotError, SnapshotStore};
pub use bgstate_serde::TypedState;

/// Serde conversions between `Value` and Rust types.
pub mod convert {
    pub use bgstate_serde::convert::*;
}

/// The traits and types most code needs.
pub mod prelude {
    pub use bgstate_bridge::{ConnectedHandle, Connector};
    pub use bgstate_core::{
        state, Listener, OwnerHandle, Selector, SharedState, SharedStateExt, State, StateOwner,
        TokioScheduler, Update, Value,
    };
    pub use bgstate_serde::TypedState;
}
