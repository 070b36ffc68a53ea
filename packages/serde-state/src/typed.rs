//! Typed access to the shared state.

use bgstate_core::{PendingCommit, Selector, SharedState, State, Update, Value};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::convert::{from_value, to_state, to_value};
use crate::error::Result;

/// Typed reads and writes over any `SharedState`.
///
/// This trait is automatically implemented for all `SharedState` types.
///
/// # Example
///
/// ```rust,ignore
/// use bgstate_serde::TypedState;
///
/// #[derive(Serialize, Deserialize)]
/// struct Settings { theme: String, zoom: u32 }
///
/// handle.set_as(&Settings { theme: "dark".into(), zoom: 110 })?;
/// let zoom: Option<u32> = handle.get_as("zoom")?;
/// ```
pub trait TypedState: SharedState {
    /// Read one key and deserialize it.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(Selector::key(key))? {
            Some(value) => Ok(Some(from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Deserialize the full state.
    fn state_as<T: DeserializeOwned>(&self) -> Result<T> {
        from_value(Value::Map(self.state()?))
    }

    /// Serialize `data` to a partial state and merge it in the current batch.
    ///
    /// `data` must serialize to a map (a struct or a map type).
    fn set_as<T: Serialize>(&self, data: &T) -> Result<PendingCommit> {
        let patch = to_state(data)?;
        Ok(self.set(Update::Patch(patch))?)
    }

    /// Serialize `data` and store it under `key` in the current batch.
    fn set_key_as<T: Serialize>(&self, key: &str, data: &T) -> Result<PendingCommit> {
        let mut patch = State::new();
        patch.insert(key.to_string(), to_value(data)?);
        Ok(self.set(Update::Patch(patch))?)
    }
}

impl<S: SharedState + ?Sized> TypedState for S {}
