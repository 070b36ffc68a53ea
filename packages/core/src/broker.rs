//! Publish-once handle registry.
//!
//! The owner publishes its handle here when it initializes; connectors wait
//! on it. A broker is published to at most once and never cleared.

use std::fmt;
use std::sync::Arc;

use tokio::sync::watch;

/// A slot that is filled once and can be awaited by any number of waiters.
pub struct Broker<T> {
    slot: Arc<watch::Sender<Option<T>>>,
}

impl<T> Clone for Broker<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone + Send + Sync> Broker<T> {
    pub fn new() -> Self {
        let (slot, _) = watch::channel(None);
        Self {
            slot: Arc::new(slot),
        }
    }

    /// Fill the slot and wake every waiter.
    ///
    /// Returns `false`, leaving the slot untouched, if something was already
    /// published.
    pub fn publish(&self, value: T) -> bool {
        let mut published = false;
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(value);
            published = true;
            true
        });
        published
    }

    /// The published value, if any.
    pub fn get(&self) -> Option<T> {
        self.slot.borrow().clone()
    }

    pub fn is_published(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// Wait until a value is published.
    ///
    /// Waits forever if nothing is ever published. Returns `None` only if the
    /// slot itself went away, which cannot happen while `self` is alive.
    pub async fn wait(&self) -> Option<T> {
        let mut rx = self.slot.subscribe();
        let slot = rx.wait_for(Option::is_some).await.ok()?;
        (*slot).clone()
    }
}

impl<T: Clone + Send + Sync> Default for Broker<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> fmt::Debug for Broker<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broker")
            .field("published", &self.slot.borrow().is_some())
            .finish()
    }
}
