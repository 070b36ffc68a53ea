//! Change-notification callbacks and their registry.

use std::fmt;
use std::sync::Arc;

use crate::value::State;

/// A change-notification callback.
///
/// Listeners are compared by identity: two clones of the same `Listener`
/// are equal, two listeners built from identical closures are not.
#[derive(Clone)]
pub struct Listener(Arc<dyn Fn(State) + Send + Sync>);

impl Listener {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(State) + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// Invoke the callback with a state snapshot.
    pub fn call(&self, state: State) {
        (self.0)(state)
    }

    pub fn same(&self, other: &Listener) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.same(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Listener({:p})", Arc::as_ptr(&self.0) as *const ())
    }
}

/// Ordered set of listeners, unique by identity.
#[derive(Debug, Default, Clone)]
pub struct ListenerRegistry {
    listeners: Vec<Listener>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a listener. Returns `false` if it was already registered.
    pub fn add(&mut self, listener: &Listener) -> bool {
        if self.contains(listener) {
            return false;
        }
        self.listeners.push(listener.clone());
        true
    }

    /// Remove a listener. Returns `false` if it was not registered.
    pub fn remove(&mut self, listener: &Listener) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|l| !l.same(listener));
        self.listeners.len() != before
    }

    pub fn contains(&self, listener: &Listener) -> bool {
        self.listeners.iter().any(|l| l.same(listener))
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Listeners in registration order.
    pub fn iter(&self) -> impl Iterator<Item = &Listener> {
        self.listeners.iter()
    }

    /// Invoke every listener in registration order, each with its own copy.
    pub fn fire(&self, state: &State) {
        for listener in &self.listeners {
            listener.call(state.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn identity_not_structure() {
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
    }

    #[test]
    fn add_is_unique() {
        let mut registry = ListenerRegistry::new();
        let l = Listener::new(|_| {});
        assert!(registry.add(&l));
        assert!(!registry.add(&l.clone()));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn remove_by_identity() {
        let mut registry = ListenerRegistry::new();
        let a = Listener::new(|_| {});
        let b = Listener::new(|_| {});
        registry.add(&a);
        registry.add(&b);

        assert!(registry.remove(&a));
        assert!(!registry.remove(&a));
        assert!(!registry.contains(&a));
        assert!(registry.contains(&b));
    }

    #[test]
    fn fire_in_registration_order() {
        let seen = std::sync::Arc::new(Mutex::new(Vec::new()));
        let mut registry = ListenerRegistry::new();
        for name in ["first", "second", "third"] {
            let seen = seen.clone();
            registry.add(&Listener::new(move |_| seen.lock().unwrap().push(name)));
        }

        registry.fire(&State::new());
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second", "third"]);
    }
}
