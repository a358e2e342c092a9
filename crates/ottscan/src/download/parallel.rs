use std::{future::Future, num::NonZeroU32, sync::Arc};

use tokio::{sync::Semaphore, task::JoinSet};
use tokio_util::sync::CancellationToken;

use crate::{ScanError, ScanResult};

/// Runs one task per item, at most `concurrency` of them at a time.
///
/// A permit is taken before a task is spawned and released when the task ends,
/// whatever its outcome. [`ParallelRunner::run`] returns only after every
/// spawned task has finished. The permit pool is created per call.
#[derive(Debug, Clone)]
pub struct ParallelRunner {
    concurrency: NonZeroU32,
    cancellation: CancellationToken,
}

impl ParallelRunner {
    pub fn new(concurrency: NonZeroU32, cancellation: CancellationToken) -> Self {
        Self {
            concurrency,
            cancellation,
        }
    }

    /// Spawn `task(item)` for every item.
    ///
    /// Cancellation stops waiting for permits, drops in-flight tasks at their
    /// next await point and makes the call return [`ScanError::Cancelled`] once
    /// all tasks are gone.
    pub async fn run<I, F, Fut>(&self, items: I, task: F) -> ScanResult<()>
    where
        I: IntoIterator,
        F: Fn(I::Item) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let permits = Arc::new(Semaphore::new(self.concurrency.get() as usize));
        let mut tasks = JoinSet::new();

        tracing::debug!(
            "Start processing with {} thread(s).",
            self.concurrency.get()
        );

        for item in items {
            let permit = tokio::select! {
                biased;
                _ = self.cancellation.cancelled() => break,
                permit = permits.clone().acquire_owned() => permit,
            };
            // the semaphore is owned by this call and never closed
            let Ok(permit) = permit else {
                break;
            };

            let cancellation = self.cancellation.clone();
            let future = task(item);
            tasks.spawn(async move {
                tokio::select! {
                    biased;
                    _ = cancellation.cancelled() => {}
                    _ = future => {}
                }
                drop(permit);
            });
        }

        // wait for all tasks to finish
        while let Some(result) = tasks.join_next().await {
            if let Err(e) = result {
                if e.is_panic() {
                    std::panic::resume_unwind(e.into_panic());
                }
            }
        }

        if self.cancellation.is_cancelled() {
            tracing::info!("Cancelled, remaining tasks were dropped.");
            return Err(ScanError::Cancelled);
        }
        Ok(())
    }
}
