//! Batch executor.

use crate::{Error, Result};
use futures::future::join_all;
use futures::FutureExt;
use serde::Serialize;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::time::Instant;
use tracing::{error, info};

/// Index-tagged outcome of a batch run.
///
/// `results` and `errors` are each sorted by index; together they cover
/// every submitted item exactly once.
#[derive(Debug)]
pub struct BatchResult<T, E = Error> {
    pub results: Vec<(usize, T)>,
    pub errors: Vec<(usize, E)>,
    pub elapsed: Duration,
}

impl<T, E> BatchResult<T, E> {
    pub fn total(&self) -> usize {
        self.results.len() + self.errors.len()
    }
    pub fn successful(&self) -> usize {
        self.results.len()
    }
    pub fn failed(&self) -> usize {
        self.errors.len()
    }
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
    pub fn success_rate(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            0.0
        } else {
            self.results.len() as f64 / total as f64
        }
    }

    pub fn summary(&self) -> BatchSummary {
        BatchSummary {
            total: self.total(),
            successful: self.successful(),
            failed: self.failed(),
            duration: self.elapsed.as_secs_f64(),
        }
    }

    /// Reassemble into submission order.
    pub fn into_ordered(self) -> Vec<std::result::Result<T, E>> {
        let mut merged: Vec<(usize, std::result::Result<T, E>)> = self
            .results
            .into_iter()
            .map(|(i, r)| (i, Ok(r)))
            .chain(self.errors.into_iter().map(|(i, e)| (i, Err(e))))
            .collect();
        merged.sort_by_key(|(i, _)| *i);
        merged.into_iter().map(|(_, r)| r).collect()
    }
}

/// Aggregate counters derived from a [`BatchResult`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Wall time of the whole batch, in seconds.
    pub duration: f64,
}

/// Runs a pipeline over many items with a bound on in-flight invocations.
///
/// The bound applies per [`run`](Self::run) call: each call creates its own
/// limiter, so concurrent batches do not share a budget.
#[derive(Debug, Clone, Copy)]
pub struct BatchExecutor {
    concurrency_limit: usize,
}

impl BatchExecutor {
    /// A limit of 0 is treated as 1.
    pub fn new(concurrency_limit: usize) -> Self {
        Self {
            concurrency_limit: concurrency_limit.max(1),
        }
    }

    pub fn sequential() -> Self {
        Self::new(1)
    }

    pub fn concurrency_limit(&self) -> usize {
        self.concurrency_limit
    }

    /// Submit every item exactly once through `pipeline`.
    ///
    /// An item's error is recorded under its index and never cancels or
    /// affects its siblings. A panicking item is recorded as a transport
    /// error under its index.
    pub async fn run<T, R, F, Fut>(&self, items: Vec<T>, pipeline: F) -> BatchResult<R>
    where
        F: Fn(usize, T) -> Fut,
        Fut: Future<Output = Result<R>>,
    {
        let start = Instant::now();
        let limiter = Arc::new(Semaphore::new(self.concurrency_limit));
        let pipeline = &pipeline;

        let tasks = items.into_iter().enumerate().map(|(index, item)| {
            let limiter = Arc::clone(&limiter);
            async move {
                let _permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(_) => return (index, Err(Error::transport("batch limiter closed"))),
                };
                let outcome = AssertUnwindSafe(async { pipeline(index, item).await })
                    .catch_unwind()
                    .await;
                match outcome {
                    Ok(result) => (index, result),
                    Err(_) => {
                        error!(index, "Batch item panicked");
                        (index, Err(Error::transport("batch item panicked")))
                    }
                }
            }
        });
        let outcomes = join_all(tasks).await;

        let mut result = BatchResult {
            results: Vec::new(),
            errors: Vec::new(),
            elapsed: Duration::ZERO,
        };
        for (index, outcome) in outcomes {
            match outcome {
                Ok(r) => result.results.push((index, r)),
                Err(e) => result.errors.push((index, e)),
            }
        }
        result.elapsed = start.elapsed();

        info!(
            total = result.total(),
            successful = result.successful(),
            failed = result.failed(),
            concurrency_limit = self.concurrency_limit,
            duration_ms = result.elapsed.as_millis() as u64,
            "Batch completed"
        );
        result
    }
}
