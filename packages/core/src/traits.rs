//! The shared-state contract, implemented by the owner and by connected
//! handles alike.

use std::sync::Arc;

use crate::error::Result;
use crate::listener::Listener;
use crate::owner::PendingCommit;
use crate::update::{Selector, Update};
use crate::value::{State, Value};

/// Read, write and subscribe to the shared state.
///
/// Every method returns its precondition failures immediately. `set` hands
/// back a `PendingCommit` that resolves once the batch it joined has been
/// committed.
///
/// # Object Safety
///
/// This trait is object-safe: you can use `Arc<dyn SharedState>`.
pub trait SharedState: Send + Sync {
    /// Read through a selector.
    ///
    /// # Returns
    ///
    /// * `Ok(None)` - The selected key does not exist.
    /// * `Ok(Some(value))` - A copy of the selected value.
    fn get(&self, selector: Selector) -> Result<Option<Value>>;

    /// A copy of the full state.
    fn state(&self) -> Result<State>;

    /// Add one step to the current batch, scheduling a commit if this is the
    /// first step of the batch.
    fn set(&self, update: Update) -> Result<PendingCommit>;

    /// Register a listener. Returns `false` if it was already registered.
    fn add_listener(&self, listener: &Listener) -> Result<bool>;

    /// Unregister a listener. Returns `false` if it was not registered.
    fn remove_listener(&self, listener: &Listener) -> Result<bool>;

    fn has_listener(&self, listener: &Listener) -> Result<bool>;

    fn has_listeners(&self) -> Result<bool>;

    /// Invoke every listener now with the current state.
    fn fire_listeners(&self) -> Result<()>;
}

/// Convenience methods over any `SharedState`.
pub trait SharedStateExt: SharedState {
    /// Read one key.
    fn get_key(&self, key: &str) -> Result<Option<Value>> {
        self.get(Selector::key(key))
    }

    /// Run `f` over a copy of the state and return whatever it returns.
    fn select<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(State) -> T,
    {
        Ok(f(self.state()?))
    }

    /// Merge a partial state in the current batch.
    fn patch(&self, patch: State) -> Result<PendingCommit> {
        self.set(Update::Patch(patch))
    }

    /// Merge the partial state computed from the candidate state.
    fn update<F>(&self, f: F) -> Result<PendingCommit>
    where
        F: FnOnce(State) -> State + Send + 'static,
    {
        self.set(Update::with(f))
    }
}

impl<S: SharedState + ?Sized> SharedStateExt for S {}

// Blanket implementations for references and shared pointers

impl<T: SharedState + ?Sized> SharedState for &T {
    fn get(&self, selector: Selector) -> Result<Option<Value>> {
        (**self).get(selector)
    }

    fn state(&self) -> Result<State> {
        (**self).state()
    }

    fn set(&self, update: Update) -> Result<PendingCommit> {
        (**self).set(update)
    }

    fn add_listener(&self, listener: &Listener) -> Result<bool> {
        (**self).add_listener(listener)
    }

    fn remove_listener(&self, listener: &Listener) -> Result<bool> {
        (**self).remove_listener(listener)
    }

    fn has_listener(&self, listener: &Listener) -> Result<bool> {
        (**self).has_listener(listener)
    }

    fn has_listeners(&self) -> Result<bool> {
        (**self).has_listeners()
    }

    fn fire_listeners(&self) -> Result<()> {
        (**self).fire_listeners()
    }
}

impl<T: SharedState + ?Sized> SharedState for Arc<T> {
    fn get(&self, selector: Selector) -> Result<Option<Value>> {
        self.as_ref().get(selector)
    }

    fn state(&self) -> Result<State> {
        self.as_ref().state()
    }

    fn set(&self, update: Update) -> Result<PendingCommit> {
        self.as_ref().set(update)
    }

    fn add_listener(&self, listener: &Listener) -> Result<bool> {
        self.as_ref().add_listener(listener)
    }

    fn remove_listener(&self, listener: &Listener) -> Result<bool> {
        self.as_ref().remove_listener(listener)
    }

    fn has_listener(&self, listener: &Listener) -> Result<bool> {
        self.as_ref().has_listener(listener)
    }

    fn has_listeners(&self) -> Result<bool> {
        self.as_ref().has_listeners()
    }

    fn fire_listeners(&self) -> Result<()> {
        self.as_ref().fire_listeners()
    }
}
