//! Concurrency-bounded job queue
//!
//! Jobs are queued with [`JobRunner::push`] and run by [`JobRunner::end`],
//! which keeps at most `concurrency` of them in flight. Only the first
//! failure is reported; once it is seen no queued job is started and the
//! results of jobs still in flight are discarded.

use futures_util::future::{BoxFuture, FutureExt};
use std::collections::VecDeque;
use std::future::Future;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::debug;

/// A queued job: a synchronous prologue, run when the job starts, that
/// returns the future to drive.
type Job<E> = Box<dyn FnOnce() -> BoxFuture<'static, Result<(), E>> + Send>;

/// Why a batch stopped early.
#[derive(Debug, Error)]
pub enum JobError<E> {
    #[error("{0}")]
    Failed(E),

    #[error("job panicked: {0}")]
    Panicked(String),
}

pub struct JobRunner<E> {
    concurrency: usize,
    queue: VecDeque<Job<E>>,
}

impl<E: Send + 'static> JobRunner<E> {
    /// Create a runner allowing `concurrency` jobs in flight (at least one)
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
            queue: VecDeque::new(),
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Number of jobs queued and not yet started
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Queue a job. `job` is called when the job starts, in push order.
    pub fn push<F, Fut>(&mut self, job: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), E>> + Send + 'static,
    {
        self.queue.push_back(Box::new(move || job().boxed()));
    }

    /// Run every queued job. Resolves with `Ok` once all succeeded, or with
    /// the first error as soon as it is observed.
    ///
    /// Must be called from within a Tokio runtime.
    pub async fn end(mut self) -> Result<(), JobError<E>> {
        let total = self.queue.len();
        let mut running = JoinSet::new();

        loop {
            while running.len() < self.concurrency {
                let Some(job) = self.queue.pop_front() else {
                    break;
                };
                running.spawn(job());
            }

            let Some(joined) = running.join_next().await else {
                debug!(jobs = total, "batch complete");
                return Ok(());
            };

            let error = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => JobError::Failed(e),
                Err(e) => JobError::Panicked(e.to_string()),
            };

            debug!(
                skipped = self.queue.len(),
                in_flight = running.len(),
                "batch aborted on first error"
            );
            // In-flight jobs keep running; their outcome is ignored.
            running.detach_all();
            return Err(error);
        }
    }
}
