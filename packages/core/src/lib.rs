//! bgstate core: one owner, one state, many observers.
//!
//! This crate holds everything that lives in the owner context:
//! - `Value` / `State`: the tree values and the flat key map they live in
//! - `StateOwner`: the single writer, with batched commits and listeners
//! - `Broker`: where the owner publishes its handle for connectors
//! - `context`: classification of execution contexts
//! - `Scheduler`: the deferred-execution primitive commits are batched on
//!
//! Non-owner contexts reach the owner through `bgstate-bridge`.
//!
//! # Example
//!
//! ```rust
//! use bgstate_core::{state, Environment, Location, ManualScheduler, SharedStateExt, StateOwner, Value};
//!
//! let scheduler = ManualScheduler::new();
//! let env = Environment::new(Location::new(
//!     "chrome-extension",
//!     "/_generated_background_page.html",
//! ));
//! let owner = StateOwner::new(env, scheduler.clone());
//! let handle = owner.initialize(state! { "apples" => 2 }).unwrap();
//!
//! let mut pending = handle.patch(state! { "apples" => 3 }).unwrap();
//! scheduler.run_pending();
//! assert_eq!(pending.try_take().unwrap().unwrap()["apples"], Value::Integer(3));
//! ```

mod broker;
pub mod context;
mod error;
mod listener;
mod owner;
mod scheduler;
pub mod sync;
mod traits;
mod update;
mod value;

pub use broker::Broker;
pub use context::{
    classify, is_owner_context, is_page_context, ContextConfig, ContextKind, Environment,
    EnvironmentProbe, Location,
};
pub use error::{Error, Result};
pub use listener::{Listener, ListenerRegistry};
pub use owner::{OwnerHandle, PendingCommit, StateOwner};
pub use scheduler::{ManualScheduler, Scheduler, Task, TokioScheduler};
pub use traits::{SharedState, SharedStateExt};
pub use update::{MutationChain, Selector, Update};
pub use value::{merge, State, Value};
