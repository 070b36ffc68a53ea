//! The state owner.
//!
//! Exactly one owner holds the authoritative state. Writes are batched: the
//! first `set` of a batch window defers a commit on the scheduler, every
//! later `set` before that commit runs only extends the pending chain. A
//! commit applies the whole chain, merges the result into the state, fires
//! every listener once and resolves every `PendingCommit` of the window with
//! the same committed state.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use crate::broker::Broker;
use crate::context::{classify, ContextKind, EnvironmentProbe};
use crate::error::{Error, Result};
use crate::listener::{Listener, ListenerRegistry};
use crate::scheduler::Scheduler;
use crate::sync::lock;
use crate::traits::SharedState;
use crate::update::{MutationChain, Selector, Update};
use crate::value::{merge, State, Value};

/// Steps and waiters of the batch window currently open.
#[derive(Default)]
struct Batch {
    chain: MutationChain,
    waiters: Vec<oneshot::Sender<State>>,
    scheduled: bool,
}

struct Shared {
    probe: Arc<dyn EnvironmentProbe>,
    scheduler: Arc<dyn Scheduler>,
    broker: Broker<OwnerHandle>,
    ready: AtomicBool,
    state: Mutex<State>,
    batch: Mutex<Batch>,
    listeners: Mutex<ListenerRegistry>,
    /// Held for the duration of a commit so commits never interleave.
    committing: Mutex<()>,
}

impl Shared {
    fn ensure_ready(&self, operation: &'static str) -> Result<()> {
        if self.ready.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(Error::NotInitialized { operation })
        }
    }

    fn snapshot(&self) -> State {
        lock(&self.state).clone()
    }

    fn get(&self, selector: Selector) -> Result<Option<Value>> {
        self.ensure_ready("get")?;
        Ok(selector.select(self.snapshot()))
    }

    fn state(&self) -> Result<State> {
        self.ensure_ready("get")?;
        Ok(self.snapshot())
    }

    fn set(self: &Arc<Self>, update: Update) -> Result<PendingCommit> {
        self.ensure_ready("set")?;

        let (tx, rx) = oneshot::channel();
        let (schedule, steps) = {
            let mut batch = lock(&self.batch);
            batch.chain.push(update);
            batch.waiters.push(tx);
            let first = !std::mem::replace(&mut batch.scheduled, true);
            (first, batch.chain.len())
        };

        if schedule {
            debug!("opening batch, commit deferred");
            let task = CommitTask {
                shared: Some(Arc::clone(self)),
            };
            self.scheduler.defer(Box::new(move || task.run()));
        } else {
            trace!(steps, "joined open batch");
        }

        Ok(PendingCommit { rx })
    }

    fn commit(&self) {
        let _committing = lock(&self.committing);

        let (chain, waiters) = {
            let mut batch = lock(&self.batch);
            batch.scheduled = false;
            (batch.chain.take(), std::mem::take(&mut batch.waiters))
        };
        let steps = chain.len();

        // Update functions run without the state lock held: they may read
        // back through the owner.
        let next = chain.apply(self.snapshot());
        let committed = {
            let mut state = lock(&self.state);
            merge(&mut state, next);
            state.clone()
        };

        let listeners = self.fire(&committed);
        debug!(steps, listeners, "committed batch");

        for waiter in waiters {
            // The caller may have dropped its PendingCommit.
            let _ = waiter.send(committed.clone());
        }
    }

    /// Close a batch whose commit will never run. Its waiters resolve to
    /// `Error::CommitDropped`.
    fn abandon(&self) {
        let mut batch = lock(&self.batch);
        batch.scheduled = false;
        let dropped = batch.chain.take().len();
        batch.waiters.clear();
        warn!(steps = dropped, "scheduler dropped a pending commit");
    }

    /// Fire a snapshot of the registry. Returns how many listeners ran.
    fn fire(&self, state: &State) -> usize {
        let registry = lock(&self.listeners).clone();
        registry.fire(state);
        registry.len()
    }

    fn add_listener(&self, listener: &Listener) -> Result<bool> {
        self.ensure_ready("add_listener")?;
        let added = lock(&self.listeners).add(listener);
        trace!(?listener, added, "add listener");
        Ok(added)
    }

    fn remove_listener(&self, listener: &Listener) -> Result<bool> {
        self.ensure_ready("remove_listener")?;
        let removed = lock(&self.listeners).remove(listener);
        trace!(?listener, removed, "remove listener");
        Ok(removed)
    }

    fn has_listener(&self, listener: &Listener) -> Result<bool> {
        self.ensure_ready("has_listener")?;
        Ok(lock(&self.listeners).contains(listener))
    }

    fn has_listeners(&self) -> Result<bool> {
        self.ensure_ready("has_listeners")?;
        Ok(!lock(&self.listeners).is_empty())
    }

    fn fire_listeners(&self) -> Result<()> {
        self.ensure_ready("fire_listeners")?;
        self.fire(&self.snapshot());
        Ok(())
    }
}

/// The deferred commit of one batch window.
///
/// Dropping it unrun abandons the batch instead of leaving its waiters
/// pending forever.
struct CommitTask {
    shared: Option<Arc<Shared>>,
}

impl CommitTask {
    fn run(mut self) {
        if let Some(shared) = self.shared.take() {
            shared.commit();
        }
    }
}

impl Drop for CommitTask {
    fn drop(&mut self) {
        if let Some(shared) = self.shared.take() {
            shared.abandon();
        }
    }
}

/// The owner of the shared state.
///
/// Construct one per owner context, then call [`initialize`](Self::initialize)
/// exactly once. Until then every operation fails with
/// `Error::NotInitialized`.
///
/// # Example
///
/// ```rust,ignore
/// let owner = StateOwner::new(environment, TokioScheduler::current()?);
/// let handle = owner.initialize(state! { "apples" => 2 })?;
///
/// let committed = handle.patch(state! { "apples" => 3 })?.await?;
/// assert_eq!(committed["apples"], Value::Integer(3));
/// ```
#[derive(Clone)]
pub struct StateOwner {
    shared: Arc<Shared>,
}

impl StateOwner {
    /// Create an uninitialized owner.
    ///
    /// `probe` supplies the environment facts used to check that
    /// `initialize` runs in the owner context.
    pub fn new(
        probe: impl EnvironmentProbe + 'static,
        scheduler: impl Scheduler + 'static,
    ) -> Self {
        Self::from_parts(Arc::new(probe), Arc::new(scheduler))
    }

    pub fn from_parts(probe: Arc<dyn EnvironmentProbe>, scheduler: Arc<dyn Scheduler>) -> Self {
        Self {
            shared: Arc::new(Shared {
                probe,
                scheduler,
                broker: Broker::new(),
                ready: AtomicBool::new(false),
                state: Mutex::new(State::new()),
                batch: Mutex::new(Batch::default()),
                listeners: Mutex::new(ListenerRegistry::new()),
                committing: Mutex::new(()),
            }),
        }
    }

    /// The broker this owner publishes its handle to.
    ///
    /// Host bridges hold a clone so connectors can wait on it.
    pub fn broker(&self) -> Broker<OwnerHandle> {
        self.shared.broker.clone()
    }

    pub fn is_initialized(&self) -> bool {
        self.shared.ready.load(Ordering::Acquire)
    }

    /// Populate the state and make the owner available.
    ///
    /// Fails with `Error::AlreadyInitialized` on a second call and with
    /// `Error::WrongContext` outside the owner context. Neither failure
    /// touches the state.
    pub fn initialize(&self, initial: State) -> Result<OwnerHandle> {
        let environment = self.shared.probe.environment();
        {
            let mut state = lock(&self.shared.state);
            if self.shared.ready.load(Ordering::Acquire) {
                return Err(Error::AlreadyInitialized);
            }

            let context = classify(&environment);
            if context != ContextKind::Owner {
                return Err(Error::WrongContext {
                    operation: "initialize",
                    context,
                });
            }

            merge(&mut state, initial);
            self.shared.ready.store(true, Ordering::Release);
            debug!(keys = state.len(), "state owner initialized");
        }

        let handle = OwnerHandle {
            shared: Arc::clone(&self.shared),
        };
        if self.shared.broker.publish(handle.clone()) {
            debug!("owner handle published");
        }
        Ok(handle)
    }
}

impl fmt::Debug for StateOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateOwner")
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

/// The owner's public interface, as published to connectors.
#[derive(Clone)]
pub struct OwnerHandle {
    shared: Arc<Shared>,
}

impl OwnerHandle {
    /// True if both handles refer to the same owner.
    pub fn same_owner(&self, other: &OwnerHandle) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl fmt::Debug for OwnerHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OwnerHandle").finish_non_exhaustive()
    }
}

macro_rules! forward_shared_state {
    ($ty:ty) => {
        impl SharedState for $ty {
            fn get(&self, selector: Selector) -> Result<Option<Value>> {
                self.shared.get(selector)
            }

            fn state(&self) -> Result<State> {
                self.shared.state()
            }

            fn set(&self, update: Update) -> Result<PendingCommit> {
                self.shared.set(update)
            }

            fn add_listener(&self, listener: &Listener) -> Result<bool> {
                self.shared.add_listener(listener)
            }

            fn remove_listener(&self, listener: &Listener) -> Result<bool> {
                self.shared.remove_listener(listener)
            }

            fn has_listener(&self, listener: &Listener) -> Result<bool> {
                self.shared.has_listener(listener)
            }

            fn has_listeners(&self) -> Result<bool> {
                self.shared.has_listeners()
            }

            fn fire_listeners(&self) -> Result<()> {
                self.shared.fire_listeners()
            }
        }
    };
}

forward_shared_state!(StateOwner);
forward_shared_state!(OwnerHandle);

/// Resolves to the committed state once the batch a `set` joined commits.
#[derive(Debug)]
pub struct PendingCommit {
    rx: oneshot::Receiver<State>,
}

impl PendingCommit {
    /// Take the committed state without waiting.
    ///
    /// Returns `None` while the batch has not committed yet.
    pub fn try_take(&mut self) -> Option<Result<State>> {
        match self.rx.try_recv() {
            Ok(state) => Some(Ok(state)),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(Error::CommitDropped)),
        }
    }
}

impl Future for PendingCommit {
    type Output = Result<State>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.map_err(|_| Error::CommitDropped))
    }
}
