//! In-process host bridge.
//!
//! `InMemoryBridge` connects contexts that share one process (tests, native
//! embeddings, single-binary tools). It reads the owner's handle straight from
//! the owner's broker.

use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bgstate_core::sync::lock;
use bgstate_core::{Broker, Environment, EnvironmentProbe, OwnerHandle};
use tracing::debug;

use crate::bridge::HostBridge;
use crate::error::{BridgeError, Result};

type Launcher = Box<dyn FnOnce() + Send>;

/// A host bridge over a shared `Broker`.
///
/// # Example
///
/// ```rust,ignore
/// let owner = StateOwner::new(owner_env, TokioScheduler::current()?);
/// let bridge = InMemoryBridge::new(owner.broker(), options_env)
///     .with_launcher(move || { owner.initialize(State::new()).ok(); });
///
/// let connector = Connector::new(Arc::new(bridge));
/// let handle = connector.connect().await?;
/// ```
pub struct InMemoryBridge {
    broker: Broker<OwnerHandle>,
    environment: Mutex<Environment>,
    /// Starts the owner context; run on the first handshake request.
    launcher: Mutex<Option<Launcher>>,
    failure: Mutex<Option<String>>,
    requests: AtomicUsize,
}

impl InMemoryBridge {
    /// Create a bridge for a context at `environment`, reaching the owner
    /// that publishes to `broker`.
    pub fn new(broker: Broker<OwnerHandle>, environment: Environment) -> Self {
        Self {
            broker,
            environment: Mutex::new(environment),
            launcher: Mutex::new(None),
            failure: Mutex::new(None),
            requests: AtomicUsize::new(0),
        }
    }

    /// Run `launch` the first time a handshake asks for the owner.
    pub fn with_launcher<F>(self, launch: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        *lock(&self.launcher) = Some(Box::new(launch));
        self
    }

    /// Fail every following request with a transport error.
    pub fn fail_with(&self, message: impl Into<String>) {
        *lock(&self.failure) = Some(message.into());
    }

    pub fn clear_failure(&self) {
        *lock(&self.failure) = None;
    }

    /// Move the local context to another environment.
    pub fn set_environment(&self, environment: Environment) {
        *lock(&self.environment) = environment;
    }

    /// Number of handshake requests received.
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl EnvironmentProbe for InMemoryBridge {
    fn environment(&self) -> Environment {
        lock(&self.environment).clone()
    }
}

#[async_trait]
impl HostBridge for InMemoryBridge {
    async fn owner_handle(&self) -> Result<OwnerHandle> {
        self.requests.fetch_add(1, Ordering::SeqCst);

        let failure = lock(&self.failure).clone();
        if let Some(message) = failure {
            return Err(BridgeError::Transport(message));
        }

        let launch = lock(&self.launcher).take();
        if let Some(launch) = launch {
            debug!("launching owner context");
            launch();
        }

        self.broker.wait().await.ok_or(BridgeError::OwnerUnavailable)
    }
}

impl fmt::Debug for InMemoryBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryBridge")
            .field("environment", &*lock(&self.environment))
            .field("published", &self.broker.is_published())
            .field("requests", &self.requests())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bgstate_core::{Location, ManualScheduler, State, StateOwner};
    use std::sync::Arc;

    fn owner_env() -> Environment {
        Environment::new(Location::new(
            "chrome-extension",
            "/_generated_background_page.html",
        ))
    }

    fn options_env() -> Environment {
        Environment::new(Location::new("chrome-extension", "/options.html"))
    }

    #[tokio::test]
    async fn resolves_published_handle() {
        let owner = StateOwner::new(owner_env(), ManualScheduler::new());
        let published = owner.initialize(State::new()).unwrap();

        let bridge = InMemoryBridge::new(owner.broker(), options_env());
        let handle = bridge.owner_handle().await.unwrap();
        assert!(handle.same_owner(&published));
        assert_eq!(bridge.requests(), 1);
    }

    #[tokio::test]
    async fn launcher_runs_once() {
        let owner = StateOwner::new(owner_env(), ManualScheduler::new());
        let launches = Arc::new(AtomicUsize::new(0));

        let bridge = {
            let owner = owner.clone();
            let launches = Arc::clone(&launches);
            InMemoryBridge::new(owner.broker(), options_env()).with_launcher(move || {
                launches.fetch_add(1, Ordering::SeqCst);
                owner.initialize(State::new()).unwrap();
            })
        };

        bridge.owner_handle().await.unwrap();
        bridge.owner_handle().await.unwrap();
        assert_eq!(launches.load(Ordering::SeqCst), 1);
        assert_eq!(bridge.requests(), 2);
    }

    #[tokio::test]
    async fn failure_switch() {
        let owner = StateOwner::new(owner_env(), ManualScheduler::new());
        owner.initialize(State::new()).unwrap();
        let bridge = InMemoryBridge::new(owner.broker(), options_env());

        bridge.fail_with("extension context invalidated");
        assert_eq!(
            bridge.owner_handle().await.unwrap_err(),
            BridgeError::Transport("extension context invalidated".to_string())
        );

        bridge.clear_failure();
        assert!(bridge.owner_handle().await.is_ok());
    }

    #[test]
    fn environment_can_change() {
        let owner = StateOwner::new(owner_env(), ManualScheduler::new());
        let bridge = InMemoryBridge::new(owner.broker(), options_env());
        assert_eq!(bridge.environment(), options_env());

        bridge.set_environment(owner_env());
        assert!(bridge.environment().is_owner_context());
    }
}
