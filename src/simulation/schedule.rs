//! Fixed-interval polling loop shared by the simulation jobs.

use crate::errors::Result;
use std::future::Future;
use std::time::Duration;
use tracing::{error, info};

/// A job that runs, sleeps `interval`, and runs again.
///
/// A failed run is followed by `retry_after` instead of `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodicJob {
    /// Name used in log lines
    pub name: &'static str,
    /// Pause after a successful run
    pub interval: Duration,
    /// Pause after a failed run
    pub retry_after: Duration,
}

/// Counts of runs, returned when a bounded job finishes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Runs that returned `Ok`
    pub succeeded: u64,
    /// Runs that returned an error
    pub failed: u64,
}

impl PeriodicJob {
    /// Runs `tick` `cycles` times, or forever when `cycles` is `None`.
    ///
    /// There is no sleep after the last run of a bounded job, so
    /// `Some(1)` is a single immediate run.
    pub async fn run<F, Fut, T>(&self, cycles: Option<u64>, mut tick: F) -> RunSummary
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut summary = RunSummary::default();
        loop {
            let pause = match tick().await {
                Ok(_) => {
                    summary.succeeded += 1;
                    self.interval
                }
                Err(e) => {
                    summary.failed += 1;
                    error!(job = self.name, error = %e, retry_in_secs = self.retry_after.as_secs(), "Job run failed");
                    self.retry_after
                }
            };
            if cycles.is_some_and(|limit| summary.succeeded + summary.failed >= limit) {
                return summary;
            }
            info!(job = self.name, next_in_secs = pause.as_secs(), "Waiting for next run");
            tokio::time::sleep(pause).await;
        }
    }
}
