//! Background Work
//!
//! Oracle round-trips started by fired events run here instead of inside the
//! drain, so a slow oracle delays only the agent it answers for. The tasks
//! stay tracked: ticks collect finished ones, and [`BackgroundTasks::settle`]
//! waits for everything outstanding, including work spawned while waiting.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tokio::task::{JoinError, JoinSet};

use crate::error::EventError;

type TaskOutput = (String, Result<(), EventError>);

/// Totals from collecting finished background tasks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settled {
    pub completed: usize,
    pub failed: usize,
}

impl Settled {
    pub fn total(&self) -> usize {
        self.completed + self.failed
    }

    fn record(&mut self, joined: Result<TaskOutput, JoinError>) {
        match joined {
            Ok((_, Ok(()))) => self.completed += 1,
            Ok((kind, Err(e))) => {
                tracing::warn!(kind = %kind, error = %e, "background task failed");
                self.failed += 1;
            }
            Err(e) => {
                tracing::error!(error = %e, "background task aborted");
                self.failed += 1;
            }
        }
    }
}

/// Shared set of spawned tasks. Cheap to clone.
#[derive(Debug, Clone)]
pub struct BackgroundTasks {
    set: Arc<Mutex<JoinSet<TaskOutput>>>,
    /// Spawned and not yet finished, wherever they are being joined
    outstanding: Arc<watch::Sender<usize>>,
}

impl Default for BackgroundTasks {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the outstanding count when a task ends, however it ends
struct Outstanding(Arc<watch::Sender<usize>>);

impl Drop for Outstanding {
    fn drop(&mut self) {
        self.0.send_modify(|n| *n = n.saturating_sub(1));
    }
}

impl BackgroundTasks {
    pub fn new() -> Self {
        let (outstanding, _) = watch::channel(0);
        Self {
            set: Arc::new(Mutex::new(JoinSet::new())),
            outstanding: Arc::new(outstanding),
        }
    }

    fn tasks(&self) -> MutexGuard<'_, JoinSet<TaskOutput>> {
        self.set.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `task` on the current runtime. Fails outside a runtime.
    pub fn spawn<F>(&self, kind: impl Into<String>, task: F) -> Result<(), EventError>
    where
        F: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| EventError::failed(format!("cannot spawn background task: {}", e)))?;
        let kind = kind.into();

        self.outstanding.send_modify(|n| *n += 1);
        let guard = Outstanding(self.outstanding.clone());
        self.tasks().spawn_on(
            async move {
                let _guard = guard;
                let result = task.await;
                (kind, result)
            },
            &runtime,
        );
        Ok(())
    }

    /// Tasks spawned and not yet finished
    pub fn len(&self) -> usize {
        *self.outstanding.borrow()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Collect tasks that already finished without waiting on the rest
    pub fn reap(&self) -> Settled {
        let mut settled = Settled::default();
        let mut tasks = self.tasks();
        while let Some(joined) = tasks.try_join_next() {
            settled.record(joined);
        }
        settled
    }

    /// Wait until no task is outstanding
    pub async fn settle(&self) -> Settled {
        let mut settled = Settled::default();
        let mut outstanding = self.outstanding.subscribe();
        loop {
            // Joined outside the lock so spawns never wait on a settle
            let mut batch = std::mem::take(&mut *self.tasks());
            while let Some(joined) = batch.join_next().await {
                settled.record(joined);
            }

            let drained = self.tasks().is_empty();
            if drained {
                if *outstanding.borrow_and_update() == 0 {
                    return settled;
                }
                // Another settle holds the rest; wait for it to drain them
                let _ = outstanding.changed().await;
            }
        }
    }
}
