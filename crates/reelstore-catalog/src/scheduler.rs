//! Serial request scheduler.
//!
//! Units of work run one at a time in FIFO order with a fixed pause between
//! them, which keeps detail lookups under the TMDB request quota.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Result, anyhow};
use tokio::sync::{Mutex, oneshot};

/// Default pause between two scheduled requests.
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_millis(100);

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Whether a worker task is currently draining the queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    /// No worker; the next enqueue spawns one.
    Idle,
    /// A worker owns the queue until it observes it empty.
    Draining,
}

struct Queue {
    jobs: VecDeque<Job>,
    state: WorkerState,
}

struct Inner {
    queue: Mutex<Queue>,
    min_interval: Duration,
}

/// FIFO scheduler with a single worker and a minimum interval between units.
///
/// Cloning yields another handle to the same queue.
#[derive(Clone)]
#[allow(clippy::module_name_repetitions)]
pub struct RequestScheduler {
    inner: Arc<Inner>,
}

impl fmt::Debug for RequestScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestScheduler")
            .field("min_interval", &self.inner.min_interval)
            .finish_non_exhaustive()
    }
}

impl Default for RequestScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_REQUEST_INTERVAL)
    }
}

impl RequestScheduler {
    /// Creates a scheduler that pauses `min_interval` after every unit.
    #[must_use]
    pub fn new(min_interval: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Mutex::new(Queue {
                    jobs: VecDeque::new(),
                    state: WorkerState::Idle,
                }),
                min_interval,
            }),
        }
    }

    /// Returns the configured pause between units.
    #[must_use]
    pub fn min_interval(&self) -> Duration {
        self.inner.min_interval
    }

    /// Returns the current worker state.
    pub async fn state(&self) -> WorkerState {
        self.inner.queue.lock().await.state
    }

    /// Returns the number of units waiting to run.
    pub async fn pending(&self) -> usize {
        self.inner.queue.lock().await.jobs.len()
    }

    /// Queues `work` and waits for its own outcome.
    ///
    /// A failing unit only fails its caller; later units still run.
    ///
    /// # Errors
    ///
    /// Returns the unit's error, or an error if the unit panicked before
    /// producing a result.
    pub async fn enqueue<F, T>(&self, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>> + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let outcome = work.await;
            if tx.send(outcome).is_err() {
                tracing::debug!("scheduled request finished after its caller went away");
            }
        });

        {
            let mut queue = self.inner.queue.lock().await;
            queue.jobs.push_back(job);
            if queue.state == WorkerState::Idle {
                queue.state = WorkerState::Draining;
                tokio::spawn(drain(Arc::clone(&self.inner)));
            }
        }

        rx.await
            .map_err(|_| anyhow!("scheduled request dropped before completion"))?
    }
}

/// Worker loop: pop, run, pause, repeat; goes idle once the queue is empty.
async fn drain(inner: Arc<Inner>) {
    loop {
        let job = {
            let mut queue = inner.queue.lock().await;
            let Some(job) = queue.jobs.pop_front() else {
                queue.state = WorkerState::Idle;
                return;
            };
            job
        };

        // Run on its own task so a panic stays inside the unit.
        if let Err(e) = tokio::spawn(job).await {
            tracing::warn!(error = %e, "scheduled request panicked");
        }

        tokio::time::sleep(inner.min_interval).await;
    }
}
