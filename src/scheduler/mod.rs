//! Background tasks
//!
//! Each sweeper and the publication scheduler runs as a
//! [`PeriodicTask`]: an explicit `Stopped -> Running -> Stopped` state
//! machine owned by a single spawned task. `start` is idempotent;
//! `stop` fires a cancellation signal that aborts in-flight work and
//! then waits for the owner task to drain before returning.

mod jobs;

pub use jobs::{CommentSweeper, ConversationSweeper, MessageSweeper, PublicationSchedulerJob};

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// A unit of periodic background work
#[async_trait]
pub trait PeriodicJob: Send + Sync + 'static {
    /// Name used in logs
    fn name(&self) -> &'static str;

    /// Delay before the first run, so the rest of the process can
    /// finish initializing
    fn startup_delay(&self) -> Duration;

    /// Period between runs. Ticks that fire while a run is still in
    /// progress are skipped, not queued.
    fn interval(&self) -> Duration;

    /// One run. Implementations should check `cancel` between units of
    /// work; the surrounding loop also aborts the whole run when the
    /// signal fires.
    async fn run(&self, cancel: &watch::Receiver<bool>);
}

enum TaskState {
    Stopped,
    Running {
        cancel: watch::Sender<bool>,
        handle: JoinHandle<()>,
    },
}

/// Lifecycle wrapper around a [`PeriodicJob`]
pub struct PeriodicTask {
    job: Arc<dyn PeriodicJob>,
    state: Mutex<TaskState>,
}

impl PeriodicTask {
    pub fn new(job: impl PeriodicJob) -> Self {
        Self {
            job: Arc::new(job),
            state: Mutex::new(TaskState::Stopped),
        }
    }

    /// Start the task. A second call on a running task is a no-op.
    pub async fn start(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, TaskState::Running { .. }) {
            return;
        }

        let (cancel_tx, cancel_rx) = watch::channel(false);
        let job = Arc::clone(&self.job);
        let handle = tokio::spawn(run_loop(job, cancel_rx));

        *state = TaskState::Running {
            cancel: cancel_tx,
            handle,
        };

        tracing::info!(
            task = self.job.name(),
            interval_secs = self.job.interval().as_secs(),
            "Background task started"
        );
    }

    /// Stop the task: cancel in-flight work and wait for the owner
    /// task to drain. After this returns the task produces no further
    /// background activity.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        let TaskState::Running { cancel, handle } =
            std::mem::replace(&mut *state, TaskState::Stopped)
        else {
            return;
        };

        let _ = cancel.send(true);
        if let Err(error) = handle.await {
            tracing::warn!(task = self.job.name(), %error, "Background task panicked");
        }

        tracing::info!(task = self.job.name(), "Background task stopped");
    }

    pub async fn is_running(&self) -> bool {
        matches!(*self.state.lock().await, TaskState::Running { .. })
    }
}

async fn run_loop(job: Arc<dyn PeriodicJob>, mut cancel: watch::Receiver<bool>) {
    let job_cancel = cancel.clone();

    // First run after a short startup delay
    tokio::select! {
        _ = tokio::time::sleep(job.startup_delay()) => {}
        _ = cancel.changed() => return,
    }
    tokio::select! {
        _ = job.run(&job_cancel) => {}
        _ = cancel.changed() => return,
    }

    let mut interval = tokio::time::interval(job.interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the initial run already
    // happened above
    interval.tick().await;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                tokio::select! {
                    _ = job.run(&job_cancel) => {}
                    _ = cancel.changed() => return,
                }
            }
            _ = cancel.changed() => return,
        }
    }
}
