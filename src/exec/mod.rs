//! Bounded-concurrency task execution
//!
//! Runs a fallible async closure over a set of items with a semaphore
//! capping in-flight tasks, a per-task timeout, and cooperative rate
//! delays on the spawning side. Failures and panics drop the item's
//! result; they never propagate to the caller.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::config::{ParallelConfig, RateLimitConfig};
use crate::error::ScanError;

/// Progress notifications for a reporting sink
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    Started { total: usize },
    ItemDone { completed: usize, total: usize, ok: bool },
    BatchDone { batch: usize, batches: usize },
    Finished { succeeded: usize, failed: usize },
}

/// Bounded worker pool over async tasks
#[derive(Clone)]
pub struct ParallelExecutor {
    workers: usize,
    task_timeout: Duration,
    batch_size: usize,
    delay_every: u64,
    delay: Duration,
    progress: Option<mpsc::UnboundedSender<ProgressEvent>>,
}

impl ParallelExecutor {
    pub fn new(parallel: &ParallelConfig, rate: &RateLimitConfig) -> Self {
        Self {
            workers: parallel.effective_workers(),
            task_timeout: Duration::from_secs(parallel.task_timeout_secs),
            batch_size: parallel.batch_size.max(1),
            delay_every: rate.delay_every,
            delay: Duration::from_millis(rate.delay_ms),
            progress: None,
        }
    }

    /// Attach a progress sink; events are dropped if the receiver is gone
    pub fn with_progress(mut self, sender: mpsc::UnboundedSender<ProgressEvent>) -> Self {
        self.progress = Some(sender);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    fn emit(&self, event: ProgressEvent) {
        if let Some(sender) = &self.progress {
            let _ = sender.send(event);
        }
    }

    /// Run `op` over every item; failed items are silently dropped
    ///
    /// Completion order is not preserved. The returned vector holds only
    /// the successful results.
    pub async fn process<I, T, F, Fut>(&self, items: Vec<I>, op: F) -> Vec<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<T, ScanError>> + Send,
    {
        let total = items.len();
        self.emit(ProgressEvent::Started { total });

        let semaphore = Arc::new(Semaphore::new(self.workers));
        let mut set: JoinSet<Result<T, ScanError>> = JoinSet::new();

        for (i, item) in items.into_iter().enumerate() {
            // Cooperative rate delay on the spawning side
            if self.delay_every > 0 && i > 0 && (i as u64) % self.delay_every == 0 {
                tokio::time::sleep(self.delay).await;
            }
            let semaphore = semaphore.clone();
            let op = op.clone();
            let timeout = self.task_timeout;
            set.spawn(async move {
                let _permit = semaphore
                    .acquire()
                    .await
                    .map_err(|_| ScanError::Cancelled)?;
                match tokio::time::timeout(timeout, op(item)).await {
                    Ok(result) => result,
                    Err(_) => Err(ScanError::Timeout),
                }
            });
        }

        let mut results = Vec::new();
        let mut failed = 0usize;
        let mut completed = 0usize;
        while let Some(joined) = set.join_next().await {
            completed += 1;
            let ok = match joined {
                Ok(Ok(value)) => {
                    results.push(value);
                    true
                }
                Ok(Err(err)) => {
                    failed += 1;
                    tracing::debug!(%err, "Task dropped");
                    false
                }
                Err(join_err) => {
                    // A panicked task is contained here
                    failed += 1;
                    tracing::warn!(%join_err, "Task panicked");
                    false
                }
            };
            self.emit(ProgressEvent::ItemDone { completed, total, ok });
        }

        self.emit(ProgressEvent::Finished {
            succeeded: results.len(),
            failed,
        });
        results
    }

    /// Run `op` in fixed-size batches for memory bounding on huge inputs
    pub async fn process_batches<I, T, F, Fut>(&self, items: Vec<I>, op: F) -> Vec<T>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = Result<T, ScanError>> + Send,
    {
        let batches = items.len().div_ceil(self.batch_size);
        let mut results = Vec::new();
        let mut remaining = items;
        let mut batch = 0usize;
        while !remaining.is_empty() {
            let rest = remaining.split_off(self.batch_size.min(remaining.len()));
            let chunk = std::mem::replace(&mut remaining, rest);
            results.extend(self.process(chunk, op.clone()).await);
            batch += 1;
            self.emit(ProgressEvent::BatchDone { batch, batches });
        }
        results
    }
}
