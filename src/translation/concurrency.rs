/*!
 * Concurrency-bounded batch processing.
 *
 * A fixed pool of workers drains a shared queue of batches. At most
 * `concurrency` batches are in flight; after finishing a batch a worker waits
 * for the inter-batch delay before taking the next one. A failing batch never
 * stops the others: every batch yields its own outcome.
 */

use futures::future::join_all;
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::future::Future;
use std::time::{Duration, Instant};

use super::batch::Batch;

/// Outcome of one batch, tagged with the batch it belongs to
#[derive(Debug)]
pub struct BatchOutcome<R, E> {
    /// Id of the batch
    pub batch_id: String,
    /// Worker result
    pub result: Result<R, E>,
}

/// Runs batches through a worker with a hard concurrency ceiling
#[derive(Debug, Clone)]
pub struct BatchProcessor {
    concurrency: usize,
    inter_batch_delay: Duration,
}

impl BatchProcessor {
    /// Create a processor; a concurrency of zero is raised to one
    pub fn new(concurrency: usize, inter_batch_delay: Duration) -> Self {
        Self {
            concurrency: concurrency.max(1),
            inter_batch_delay,
        }
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Process every batch and return outcomes in completion order.
    ///
    /// Returns only once every batch has completed or failed. Callers must
    /// correlate outcomes by `batch_id`, not by position.
    pub async fn process<R, E, F, Fut>(&self, batches: Vec<Batch>, worker: F) -> Vec<BatchOutcome<R, E>>
    where
        F: Fn(Batch) -> Fut,
        Fut: Future<Output = Result<R, E>>,
        E: std::fmt::Display,
    {
        let total = batches.len();
        let queue = Mutex::new(batches.into_iter().collect::<VecDeque<_>>());
        let outcomes = Mutex::new(Vec::with_capacity(total));
        let slots = self.concurrency.min(total);

        debug!("Processing {} batches with {} workers", total, slots);

        let workers = (0..slots).map(|slot| {
            let queue = &queue;
            let outcomes = &outcomes;
            let worker = &worker;
            async move {
                loop {
                    // The lock guard must not live across an await point
                    let next = queue.lock().pop_front();
                    let Some(batch) = next else { break };

                    let batch_id = batch.id.clone();
                    let started = Instant::now();
                    let result = worker(batch).await;
                    let duration = started.elapsed();

                    match &result {
                        Ok(_) => debug!("{} completed in {:?} (worker {})", batch_id, duration, slot),
                        Err(e) => warn!("{} failed after {:?}: {}", batch_id, duration, e),
                    }

                    outcomes.lock().push(BatchOutcome { batch_id, result });

                    if queue.lock().is_empty() {
                        break;
                    }
                    if !self.inter_batch_delay.is_zero() {
                        tokio::time::sleep(self.inter_batch_delay).await;
                    }
                }
            }
        });

        join_all(workers).await;

        outcomes.into_inner()
    }
}
