//! The remote connector.
//!
//! Non-owner contexts cannot touch the owner's state directly. A `Connector`
//! hands out a placeholder `ConnectedHandle` right away, performs the
//! handshake through the host bridge on `connect`, and from then on the
//! placeholder forwards every call to the owner.

use std::fmt;
use std::sync::{Arc, OnceLock};

use bgstate_core::{
    classify, ContextKind, Error as StateError, Listener, OwnerHandle, PendingCommit, Selector,
    SharedState, State, Update, Value,
};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::bridge::HostBridge;
use crate::error::Result;

/// A pass-through view of the owner's state.
///
/// Exists before the handshake; every operation fails with
/// `Error::NotConnected` until the connector has installed the owner's
/// handle. Clones share the same connection.
#[derive(Clone, Default)]
pub struct ConnectedHandle {
    owner: Arc<OnceLock<OwnerHandle>>,
}

impl ConnectedHandle {
    pub fn is_connected(&self) -> bool {
        self.owner.get().is_some()
    }

    fn install(&self, owner: OwnerHandle) {
        // Only the first handshake installs; OnceCell in the connector makes
        // sure there is only one.
        let _ = self.owner.set(owner);
    }

    fn connected(&self, operation: &'static str) -> std::result::Result<&OwnerHandle, StateError> {
        self.owner
            .get()
            .ok_or(StateError::NotConnected { operation })
    }
}

impl SharedState for ConnectedHandle {
    fn get(&self, selector: Selector) -> bgstate_core::Result<Option<Value>> {
        self.connected("get")?.get(selector)
    }

    fn state(&self) -> bgstate_core::Result<State> {
        self.connected("get")?.state()
    }

    fn set(&self, update: Update) -> bgstate_core::Result<PendingCommit> {
        self.connected("set")?.set(update)
    }

    fn add_listener(&self, listener: &Listener) -> bgstate_core::Result<bool> {
        self.connected("add_listener")?.add_listener(listener)
    }

    fn remove_listener(&self, listener: &Listener) -> bgstate_core::Result<bool> {
        self.connected("remove_listener")?.remove_listener(listener)
    }

    fn has_listener(&self, listener: &Listener) -> bgstate_core::Result<bool> {
        self.connected("has_listener")?.has_listener(listener)
    }

    fn has_listeners(&self) -> bgstate_core::Result<bool> {
        self.connected("has_listeners")?.has_listeners()
    }

    fn fire_listeners(&self) -> bgstate_core::Result<()> {
        self.connected("fire_listeners")?.fire_listeners()
    }
}

impl fmt::Debug for ConnectedHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectedHandle")
            .field("connected", &self.is_connected())
            .finish()
    }
}

/// Connects a non-owner context to the owner.
pub struct Connector {
    bridge: Arc<dyn HostBridge>,
    handle: ConnectedHandle,
    handshake: OnceCell<()>,
}

impl Connector {
    pub fn new(bridge: Arc<dyn HostBridge>) -> Self {
        Self {
            bridge,
            handle: ConnectedHandle::default(),
            handshake: OnceCell::new(),
        }
    }

    /// The placeholder handle. Usable as a reference right away; its
    /// operations succeed once `connect` has resolved.
    pub fn handle(&self) -> ConnectedHandle {
        self.handle.clone()
    }

    pub fn is_connected(&self) -> bool {
        self.handle.is_connected()
    }

    /// Connect to the owner.
    ///
    /// Returns `Ok(None)` from the owner context and from plain web pages,
    /// which never connect. From a privileged non-owner context, performs the
    /// handshake (once; later and concurrent calls share it) and returns the
    /// connected handle. A failed handshake is not memoized and not retried.
    pub async fn connect(&self) -> Result<Option<ConnectedHandle>> {
        let context = classify(&self.bridge.environment());
        if context != ContextKind::Privileged {
            warn!(%context, "connect called from a context that never connects");
            return Ok(None);
        }

        self.handshake
            .get_or_try_init(|| async {
                debug!("handshake started");
                let owner = self.bridge.owner_handle().await?;
                self.handle.install(owner);
                debug!("handshake complete");
                Ok::<(), crate::error::BridgeError>(())
            })
            .await?;

        Ok(Some(self.handle.clone()))
    }
}

impl fmt::Debug for Connector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connector")
            .field("connected", &self.is_connected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::BridgeError;
    use crate::memory::InMemoryBridge;
    use bgstate_core::{
        state, Environment, Location, ManualScheduler, SharedStateExt, StateOwner,
    };

    fn env(path: &str) -> Environment {
        Environment::new(Location::new("chrome-extension", path))
    }

    fn new_owner() -> (StateOwner, ManualScheduler) {
        let scheduler = ManualScheduler::new();
        (
            StateOwner::new(env("/_generated_background_page.html"), scheduler.clone()),
            scheduler,
        )
    }

    #[test]
    fn placeholder_fails_before_connect() {
        let (owner, _) = new_owner();
        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), env("/popup.html")));
        let connector = Connector::new(bridge);
        let handle = connector.handle();

        assert!(!handle.is_connected());
        assert_eq!(
            handle.get(Selector::All).unwrap_err(),
            StateError::NotConnected { operation: "get" }
        );
        assert_eq!(
            handle.set(Update::patch(State::new())).unwrap_err(),
            StateError::NotConnected { operation: "set" }
        );
        assert_eq!(
            handle.has_listeners().unwrap_err(),
            StateError::NotConnected {
                operation: "has_listeners"
            }
        );
        assert_eq!(
            handle.fire_listeners().unwrap_err(),
            StateError::NotConnected {
                operation: "fire_listeners"
            }
        );
    }

    #[tokio::test]
    async fn owner_context_never_connects() {
        let (owner, _) = new_owner();
        let bridge = Arc::new(InMemoryBridge::new(
            owner.broker(),
            env("/_generated_background_page.html"),
        ));
        let connector = Connector::new(bridge.clone());

        assert!(connector.connect().await.unwrap().is_none());
        assert_eq!(bridge.requests(), 0);
    }

    #[tokio::test]
    async fn page_context_never_connects() {
        let (owner, _) = new_owner();
        let page = Environment::new(Location::parse("https://example.com/").unwrap());
        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), page));
        let connector = Connector::new(bridge.clone());

        assert!(connector.connect().await.unwrap().is_none());
        assert_eq!(bridge.requests(), 0);
        assert!(!connector.is_connected());
    }

    #[tokio::test]
    async fn connect_forwards_to_owner() {
        let (owner, scheduler) = new_owner();
        owner.initialize(state! { "apples" => 2 }).unwrap();

        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), env("/options.html")));
        let connector = Connector::new(bridge);
        let placeholder = connector.handle();

        let handle = connector.connect().await.unwrap().unwrap();
        assert!(placeholder.is_connected());
        assert_eq!(handle.get_key("apples").unwrap(), Some(Value::Integer(2)));

        let mut pending = handle.patch(state! { "apples" => 3 }).unwrap();
        scheduler.run_pending();
        assert_eq!(pending.try_take().unwrap().unwrap(), state! { "apples" => 3 });
        assert_eq!(owner.get_key("apples").unwrap(), Some(Value::Integer(3)));
    }

    #[tokio::test]
    async fn handshake_is_memoized() {
        let (owner, _) = new_owner();
        owner.initialize(State::new()).unwrap();

        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), env("/options.html")));
        let connector = Connector::new(bridge.clone());

        connector.connect().await.unwrap();
        connector.connect().await.unwrap();
        assert_eq!(bridge.requests(), 1);
    }

    #[tokio::test]
    async fn concurrent_connects_share_one_handshake() {
        let (owner, _) = new_owner();
        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), env("/options.html")));
        let connector = Connector::new(bridge.clone());

        let (first, second, ()) = tokio::join!(connector.connect(), connector.connect(), async {
            tokio::task::yield_now().await;
            owner.initialize(state! { "apples" => 2 }).unwrap();
        });

        assert!(first.unwrap().is_some());
        assert!(second.unwrap().is_some());
        assert_eq!(bridge.requests(), 1);
        assert_eq!(
            connector.handle().get_key("apples").unwrap(),
            Some(Value::Integer(2))
        );
    }

    #[tokio::test]
    async fn transport_failure_is_not_memoized() {
        let (owner, _) = new_owner();
        owner.initialize(State::new()).unwrap();

        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), env("/options.html")));
        bridge.fail_with("receiving end does not exist");
        let connector = Connector::new(bridge.clone());

        assert_eq!(
            connector.connect().await.unwrap_err(),
            BridgeError::Transport("receiving end does not exist".to_string())
        );
        assert!(!connector.is_connected());

        bridge.clear_failure();
        assert!(connector.connect().await.unwrap().is_some());
        assert_eq!(bridge.requests(), 2);
    }

    #[tokio::test]
    async fn listeners_registered_remotely_fire_on_owner_commit() {
        let (owner, scheduler) = new_owner();
        owner.initialize(State::new()).unwrap();

        let bridge = Arc::new(InMemoryBridge::new(owner.broker(), env("/popup.html")));
        let connector = Connector::new(bridge);
        let handle = connector.connect().await.unwrap().unwrap();

        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let listener = {
            let seen = Arc::clone(&seen);
            Listener::new(move |state| seen.lock().unwrap().push(state))
        };
        assert!(handle.add_listener(&listener).unwrap());
        assert!(owner.has_listener(&listener).unwrap());

        owner.patch(state! { "tab" => 4 }).unwrap();
        scheduler.run_pending();
        assert_eq!(*seen.lock().unwrap(), vec![state! { "tab" => 4 }]);

        assert!(handle.remove_listener(&listener).unwrap());
        assert!(!owner.has_listeners().unwrap());
    }
}
