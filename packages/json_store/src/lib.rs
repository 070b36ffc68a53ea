//! JSON snapshot persistence for bgstate.
//!
//! A `SnapshotStore` loads the initial state for the owner and, registered as
//! a listener, writes every committed state back to disk.

mod error;
mod snapshot;

pub use error::{Result, SnapshotError};
pub use snapshot::SnapshotStore;
