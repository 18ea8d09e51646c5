//! Batch scheduler: runs every job of a batch under a concurrency limit and a
//! wall-clock deadline.
//!
//! All job tasks are spawned up front and throttled only by the
//! [`ConcurrencyLimiter`]. The scheduler races their joint completion against
//! the batch timeout. When the timeout wins, running tasks are not interrupted:
//! the scheduler waits a short grace period for near-finished jobs to land,
//! then sweeps every job without an outcome into `Cancelled { reason: "timeout" }`.
//! Jobs that finish after the sweep may still write their files, but their
//! outcome is discarded and the report is never revised.

use crate::batch::executor::JobExecutor;
use crate::batch::limiter::ConcurrencyLimiter;
use crate::batch::types::{Batch, BatchReport, BatchState, JobOutcome, JobResult};
use chrono::Utc;
use futures::FutureExt;
use futures::future::join_all;
use prism_abstraction::ImageOperation;
use std::collections::HashMap;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::task::JoinError;
use tracing::{Instrument, debug, error, info, info_span, warn};

/// How long to wait for in-flight jobs after the batch timeout fires.
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(2);

/// Reason attached to jobs swept after the timeout.
pub const TIMEOUT_REASON: &str = "timeout";

/// Error recorded for a job whose execution panicked.
pub const PANIC_ERROR: &str = "Job task panicked";

/// Outcomes recorded so far, keyed by 1-based job index.
#[derive(Debug, Default)]
struct OutcomeBoard {
    outcomes: HashMap<usize, JobOutcome>,
    sealed: bool,
}

impl OutcomeBoard {
    fn record(&mut self, index: usize, outcome: JobOutcome) {
        if self.sealed {
            warn!(index = index, "Job finished after the report was produced; outcome dropped");
            return;
        }
        self.outcomes.entry(index).or_insert(outcome);
    }
}

/// Orchestrates batch runs against one image operation.
pub struct BatchScheduler {
    operation: Arc<dyn ImageOperation>,
    grace_period: Duration,
}

impl BatchScheduler {
    /// Create a scheduler with the default grace period.
    pub fn new(operation: Arc<dyn ImageOperation>) -> Self {
        Self { operation, grace_period: DEFAULT_GRACE_PERIOD }
    }

    /// Override the post-timeout grace period.
    #[must_use]
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Run every job of `batch` and report their outcomes.
    ///
    /// The report always holds exactly one result per job, sorted by index.
    pub async fn run(&self, batch: &Batch) -> BatchReport {
        let started_at = Utc::now();
        let start = Instant::now();
        let total = batch.jobs.len();

        info!(
            total_jobs = total,
            max_concurrent = batch.options.max_concurrent,
            timeout_ms = batch.options.timeout_ms,
            provider = self.operation.provider_id(),
            "Starting batch"
        );

        let limiter = Arc::new(ConcurrencyLimiter::new(batch.options.max_concurrent));
        let executor =
            Arc::new(JobExecutor::new(Arc::clone(&self.operation), batch.default_model.clone()));
        let policy = Arc::new(batch.retry_policy.clone());
        let board = Arc::new(Mutex::new(OutcomeBoard::default()));

        let mut handles = Vec::with_capacity(total);
        for (offset, job) in batch.jobs.iter().cloned().enumerate() {
            let index = offset + 1;
            let limiter = Arc::clone(&limiter);
            let executor = Arc::clone(&executor);
            let policy = Arc::clone(&policy);
            let board = Arc::clone(&board);

            let task = async move {
                let permit = match limiter.acquire().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        error!(index = index, "Failed to acquire limiter permit: {}", e);
                        let outcome = failed_without_attempt(format!("Limiter error: {e}"));
                        board.lock().await.record(index, outcome);
                        return;
                    }
                };
                debug!(in_flight = limiter.in_flight(), "Job admitted");
                let outcome = match AssertUnwindSafe(executor.execute(&job, &policy))
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(_) => {
                        error!(index = index, "Job panicked");
                        failed_without_attempt(PANIC_ERROR.to_string())
                    }
                };
                limiter.release(permit);
                board.lock().await.record(index, outcome);
            };
            handles.push(tokio::spawn(task.instrument(info_span!("job", index = index))));
        }

        let mut all_done = Box::pin(join_all(handles));
        let state = tokio::select! {
            joined = &mut all_done => {
                log_join_errors(&joined);
                BatchState::Completed
            }
            () = tokio::time::sleep(batch.options.timeout()) => {
                warn!(
                    timeout_ms = batch.options.timeout_ms,
                    grace_ms = self.grace_period.as_millis() as u64,
                    "Batch timeout reached; waiting for in-flight jobs"
                );
                if let Ok(joined) = tokio::time::timeout(self.grace_period, &mut all_done).await {
                    log_join_errors(&joined);
                }
                BatchState::TimedOut
            }
        };
        // Unfinished tasks keep running detached; only their outcomes are ignored.
        drop(all_done);

        let results: Vec<JobResult> = {
            let mut board = board.lock().await;
            board.sealed = true;
            (1..=total)
                .map(|index| {
                    let outcome =
                        board.outcomes.remove(&index).unwrap_or_else(|| missing_outcome(state));
                    JobResult { index, outcome }
                })
                .collect()
        };

        let succeeded = results.iter().filter(|r| r.outcome.is_completed()).count();
        let failed = results.iter().filter(|r| r.outcome.is_failed()).count();
        let cancelled = results.iter().filter(|r| r.outcome.is_cancelled()).count();
        let duration = start.elapsed();

        info!(
            succeeded = succeeded,
            failed = failed,
            cancelled = cancelled,
            state = ?state,
            duration_ms = duration.as_millis() as u64,
            "Batch finished"
        );

        BatchReport {
            succeeded,
            failed,
            cancelled,
            results,
            started_at,
            finished_at: Utc::now(),
            duration_ms: duration.as_millis() as u64,
            state,
            estimate: batch.estimate(),
        }
    }
}

/// Outcome for a job that recorded nothing by the time the report is built.
fn missing_outcome(state: BatchState) -> JobOutcome {
    match state {
        BatchState::TimedOut => JobOutcome::Cancelled { reason: TIMEOUT_REASON.to_string() },
        // Every task records before it ends, so this means the task was torn down.
        BatchState::Completed => {
            failed_without_attempt("Job task terminated without an outcome".to_string())
        }
    }
}

fn failed_without_attempt(last_error: String) -> JobOutcome {
    JobOutcome::Failed { last_error, duration_ms: 0, attempts: 0 }
}

fn log_join_errors(joined: &[Result<(), JoinError>]) {
    for err in joined.iter().filter_map(|r| r.as_ref().err()) {
        error!("Task join error: {}", err);
    }
}
