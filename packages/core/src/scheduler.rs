//! Deferred execution.
//!
//! The owner batches writes by deferring its commit until the current
//! synchronous phase yields. `Scheduler` is that primitive; the owner never
//! assumes anything about when a deferred task runs beyond "not now".

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex};

use tokio::runtime::{Handle, RuntimeFlavor};

use crate::error::{Error, Result};
use crate::sync::lock;

/// A unit of deferred work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Runs tasks after the current synchronous phase.
pub trait Scheduler: Send + Sync {
    /// Schedule `task` to run once the caller has yielded.
    fn defer(&self, task: Task);
}

/// Scheduler backed by a tokio runtime.
///
/// Each task is spawned onto the captured runtime and yields once before
/// running, so it runs only after the scheduling task awaits.
///
/// Only current-thread runtimes are accepted. On a multi-thread runtime
/// another worker would pick the commit up while the caller is still
/// issuing writes, splitting one batch into several commits.
#[derive(Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Fails with `Error::Scheduler` unless `handle` belongs to a
    /// current-thread runtime.
    pub fn new(handle: Handle) -> Result<Self> {
        match handle.runtime_flavor() {
            RuntimeFlavor::CurrentThread => Ok(Self { handle }),
            flavor => Err(Error::Scheduler {
                message: format!(
                    "batched commits need a current-thread runtime, found {flavor:?}"
                ),
            }),
        }
    }

    /// Capture the runtime the caller is running on.
    pub fn current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| Error::Scheduler {
            message: e.to_string(),
        })?;
        Self::new(handle)
    }
}

impl Scheduler for TokioScheduler {
    fn defer(&self, task: Task) {
        self.handle.spawn(async move {
            tokio::task::yield_now().await;
            task();
        });
    }
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler").finish_non_exhaustive()
    }
}

/// Scheduler that queues tasks until told to run them.
///
/// Tests use it to control exactly where a synchronous phase ends.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    queue: Arc<Mutex<VecDeque<Task>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tasks waiting to run.
    pub fn pending(&self) -> usize {
        lock(&self.queue).len()
    }

    /// Run queued tasks, including tasks they schedule, until the queue is
    /// empty. Returns how many ran.
    pub fn run_pending(&self) -> usize {
        let mut ran = 0;
        loop {
            // Pop under the lock, run outside it: tasks may schedule more.
            let Some(task) = lock(&self.queue).pop_front() else {
                return ran;
            };
            task();
            ran += 1;
        }
    }
}

impl Scheduler for ManualScheduler {
    fn defer(&self, task: Task) {
        lock(&self.queue).push_back(task);
    }
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("pending", &self.pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn manual_scheduler_defers_until_run() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.defer(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending(), 1);
        assert_eq!(scheduler.run_pending(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn manual_scheduler_runs_nested_tasks() {
        let scheduler = ManualScheduler::new();
        let count = Arc::new(AtomicUsize::new(0));

        let inner_scheduler = scheduler.clone();
        let c = count.clone();
        scheduler.defer(Box::new(move || {
            let c = c.clone();
            inner_scheduler.defer(Box::new(move || {
                c.fetch_add(1, Ordering::SeqCst);
            }));
        }));

        assert_eq!(scheduler.run_pending(), 2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn tokio_scheduler_requires_runtime() {
        assert!(matches!(
            TokioScheduler::current(),
            Err(Error::Scheduler { .. })
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn tokio_scheduler_rejects_multi_thread_runtime() {
        let err = TokioScheduler::current().unwrap_err();
        assert!(matches!(err, Error::Scheduler { ref message } if message.contains("MultiThread")));
    }

    #[test]
    fn tokio_scheduler_accepts_current_thread_handle() {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        assert!(TokioScheduler::new(runtime.handle().clone()).is_ok());
    }

    #[tokio::test]
    async fn tokio_scheduler_runs_after_yield() {
        let scheduler = TokioScheduler::current().unwrap();
        let count = Arc::new(AtomicUsize::new(0));

        let c = count.clone();
        scheduler.defer(Box::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        }));
        assert_eq!(count.load(Ordering::SeqCst), 0);

        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
