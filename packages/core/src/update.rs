//! Call-boundary variants for reads and writes, and the pending mutation chain.

use std::fmt;

use crate::value::{merge, State, Value};

type SelectFn = Box<dyn FnOnce(State) -> Value + Send>;
type UpdateFn = Box<dyn FnOnce(State) -> State + Send>;

/// What a `get` call reads.
pub enum Selector {
    /// A copy of the full state, as a map value.
    All,
    /// A copy of the value stored under one key.
    Key(String),
    /// A function invoked with a copy of the state. Its result is returned
    /// as-is.
    With(SelectFn),
}

impl Selector {
    pub fn key(key: impl Into<String>) -> Self {
        Selector::Key(key.into())
    }

    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(State) -> Value + Send + 'static,
    {
        Selector::With(Box::new(f))
    }

    /// Evaluate the selector against a copy of the state.
    pub fn select(self, mut state: State) -> Option<Value> {
        match self {
            Selector::All => Some(Value::Map(state)),
            Selector::Key(key) => state.remove(&key),
            Selector::With(f) => Some(f(state)),
        }
    }
}

impl From<&str> for Selector {
    fn from(key: &str) -> Self {
        Selector::Key(key.to_string())
    }
}

impl From<String> for Selector {
    fn from(key: String) -> Self {
        Selector::Key(key)
    }
}

impl fmt::Debug for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::All => write!(f, "All"),
            Selector::Key(key) => f.debug_tuple("Key").field(key).finish(),
            Selector::With(_) => write!(f, "With(<fn>)"),
        }
    }
}

/// What a `set` call contributes to the pending batch.
pub enum Update {
    /// A partial state merged by key.
    Patch(State),
    /// A function from the candidate state to a partial state to merge.
    With(UpdateFn),
}

impl Update {
    pub fn patch(patch: State) -> Self {
        Update::Patch(patch)
    }

    pub fn with<F>(f: F) -> Self
    where
        F: FnOnce(State) -> State + Send + 'static,
    {
        Update::With(Box::new(f))
    }

    /// Apply this step to a candidate state.
    fn apply(self, mut candidate: State) -> State {
        let patch = match self {
            Update::Patch(patch) => patch,
            Update::With(f) => f(candidate.clone()),
        };
        merge(&mut candidate, patch);
        candidate
    }
}

impl From<State> for Update {
    fn from(patch: State) -> Self {
        Update::Patch(patch)
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Update::Patch(patch) => f.debug_tuple("Patch").field(patch).finish(),
            Update::With(_) => write!(f, "With(<fn>)"),
        }
    }
}

/// The composition of every update issued in one batch window.
///
/// Empty means identity. Steps run in the order they were pushed, each one
/// seeing the candidate state produced by the steps before it.
#[derive(Debug, Default)]
pub struct MutationChain {
    steps: Vec<Update>,
}

impl MutationChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, update: Update) {
        self.steps.push(update);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_identity(&self) -> bool {
        self.steps.is_empty()
    }

    /// Take the accumulated steps, leaving the identity chain behind.
    pub fn take(&mut self) -> MutationChain {
        std::mem::take(self)
    }

    /// Run every step over `state`, first pushed first.
    pub fn apply(self, state: State) -> State {
        self.steps
            .into_iter()
            .fold(state, |candidate, step| step.apply(candidate))
    }
}
