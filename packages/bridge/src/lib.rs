//! bgstate bridge: reaching the owner from other contexts.
//!
//! - `HostBridge`: the host's messaging primitives, as a trait
//! - `InMemoryBridge`: a bridge for contexts sharing one process
//! - `Connector` / `ConnectedHandle`: the one-time handshake and the
//!   pass-through handle it produces
//!
//! # Example
//!
//! ```rust,ignore
//! use bgstate_bridge::{Connector, InMemoryBridge};
//! use bgstate_core::SharedStateExt;
//!
//! let connector = Connector::new(Arc::new(InMemoryBridge::new(broker, options_env)));
//! if let Some(handle) = connector.connect().await? {
//!     let apples = handle.get_key("apples")?;
//! }
//! ```

mod bridge;
mod connector;
mod error;
pub mod memory;

pub use bridge::HostBridge;
pub use connector::{ConnectedHandle, Connector};
pub use error::{BridgeError, Result};
pub use memory::InMemoryBridge;
