//! Serde integration for bgstate.
//!
//! Typed reads and writes over any shared-state handle, owner or connected:
//!
//! ```rust,ignore
//! use bgstate_serde::TypedState;
//!
//! let zoom: Option<u32> = handle.get_as("zoom")?;
//! handle.set_key_as("zoom", &120)?;
//! ```
//!
//! The conversion helpers in `convert` are also usable on their own.

pub mod convert;
mod error;
mod typed;

pub use convert::{from_value, json_to_value, to_state, to_value, value_to_json};
pub use error::{Error, Result};
pub use typed::TypedState;
