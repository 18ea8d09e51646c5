//! Runs a single job to completion, retrying transient failures.

use crate::batch::retry::RetryPolicy;
use crate::batch::types::{JobKind, JobOutcome, JobSpec};
use prism_abstraction::{EditRequest, GenerateRequest, ImageError, ImageOperation, ImageOutput};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Executes jobs against an image operation.
pub struct JobExecutor {
    operation: Arc<dyn ImageOperation>,
    default_model: String,
}

impl JobExecutor {
    /// Create an executor. Jobs without a model override use `default_model`.
    pub fn new(operation: Arc<dyn ImageOperation>, default_model: impl Into<String>) -> Self {
        Self { operation, default_model: default_model.into() }
    }

    /// Run `job` until it succeeds or the policy stops retrying.
    ///
    /// Only ever returns `Completed` or `Failed`. Files written by a failed
    /// attempt are left in place.
    pub async fn execute(&self, job: &JobSpec, policy: &RetryPolicy) -> JobOutcome {
        let start = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            debug!(
                attempt = attempt + 1,
                provider = self.operation.provider_id(),
                model = job.effective_model(&self.default_model),
                "Running job attempt"
            );

            match self.attempt(job).await {
                Ok(output) => {
                    return JobOutcome::Completed {
                        output_paths: output.saved_paths,
                        duration_ms: start.elapsed().as_millis() as u64,
                        revised_prompt: output.revised_prompt,
                        attempts: attempt + 1,
                    };
                }
                Err(err) => {
                    let message = err.to_string();
                    if !policy.should_retry(&message, attempt) {
                        debug!(
                            attempts = attempt + 1,
                            status = ?err.status(),
                            error = %message,
                            "Job failed"
                        );
                        return JobOutcome::Failed {
                            last_error: message,
                            duration_ms: start.elapsed().as_millis() as u64,
                            attempts: attempt + 1,
                        };
                    }

                    let delay = policy.retry_delay();
                    warn!(
                        retry_count = attempt + 1,
                        delay_ms = delay.as_millis() as u64,
                        status = ?err.status(),
                        error = %message,
                        "Retrying job after delay"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, job: &JobSpec) -> Result<ImageOutput, ImageError> {
        let model = job.effective_model(&self.default_model).to_string();
        match &job.kind {
            JobKind::Generate { aspect_ratio, resolution } => {
                let request = GenerateRequest {
                    prompt: job.prompt.clone(),
                    model,
                    image_count: job.image_count,
                    aspect_ratio: aspect_ratio.clone(),
                    resolution: resolution.clone(),
                    output_path: job.output_path.clone(),
                };
                self.operation.generate(&request).await
            }
            JobKind::Edit { resolution, source } => {
                let request = EditRequest {
                    prompt: job.prompt.clone(),
                    model,
                    image_count: job.image_count,
                    resolution: resolution.clone(),
                    source: source.clone(),
                    output_path: job.output_path.clone(),
                };
                self.operation.edit(&request).await
            }
        }
    }
}
