//! Job orchestrator
//!
//! Submits a generation job to the remote service and polls the resulting
//! long-running operation at a fixed interval until it reports completion.
//! There is no backoff: one poll per interval. The wait can be bounded with
//! [`PollPolicy::max_wait`] and interrupted through a [`CancellationToken`].

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::{GenerationError, GenerationResult};
use crate::models::{GenerationJob, GenerationRequest};
use crate::remote::{OperationSnapshot, RemoteJobApi};

/// Polling cadence and ceiling
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Wait between two polls
    pub interval: Duration,
    /// Give up after this long; `None` waits as long as the remote runs
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            max_wait: None,
        }
    }
}

#[derive(Clone)]
pub struct JobOrchestrator {
    remote: Arc<dyn RemoteJobApi>,
    policy: PollPolicy,
}

impl JobOrchestrator {
    pub fn new(remote: Arc<dyn RemoteJobApi>, policy: PollPolicy) -> Self {
        Self { remote, policy }
    }

    pub fn model_name(&self) -> &str {
        self.remote.model_name()
    }

    /// Issue the remote create call for `request`.
    ///
    /// Fails with [`GenerationError::Submission`] before any polling happens.
    pub async fn submit(&self, request: &GenerationRequest) -> GenerationResult<GenerationJob> {
        let payload = request.payload();
        info!(
            kind = payload.kind(),
            resolution = %request.resolution(),
            aspect_ratio = %request.aspect_ratio(),
            "Submitting generation job"
        );

        let snapshot = self
            .remote
            .create_operation(&payload)
            .await
            .map_err(|e| {
                error!("Failed to submit generation job: {}", e);
                GenerationError::Submission(e)
            })?;

        let mut job = GenerationJob::pending(snapshot.name.clone());
        if snapshot.done {
            job.settled = Some(snapshot);
        }

        info!(operation = %job.operation, "Generation job submitted");
        Ok(job)
    }

    /// Poll `job` until the remote reports completion and return the
    /// playable result URI.
    pub async fn await_completion(
        &self,
        job: &mut GenerationJob,
        cancel: &CancellationToken,
    ) -> GenerationResult<String> {
        let outcome = match self.policy.max_wait {
            Some(limit) => {
                match tokio::time::timeout(limit, self.poll_until_done(job, cancel)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(GenerationError::Timeout(limit)),
                }
            }
            None => self.poll_until_done(job, cancel).await,
        };

        match outcome {
            Ok(snapshot) => self.resolve(job, snapshot),
            Err(e) => {
                warn!(operation = %job.operation, error = %e, "Generation job abandoned");
                job.fail(e.to_string());
                Err(e)
            }
        }
    }

    async fn poll_until_done(
        &self,
        job: &mut GenerationJob,
        cancel: &CancellationToken,
    ) -> GenerationResult<OperationSnapshot> {
        if let Some(snapshot) = job.settled.take() {
            return Ok(snapshot);
        }

        let mut attempt = 0u32;

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                _ = tokio::time::sleep(self.policy.interval) => {}
            }

            attempt += 1;
            let snapshot = self
                .remote
                .poll_operation(&job.operation)
                .await
                .map_err(GenerationError::Poll)?;

            job.mark_running();
            debug!(
                operation = %job.operation,
                attempt,
                done = snapshot.done,
                "Polled generation job"
            );

            if snapshot.done {
                return Ok(snapshot);
            }
        }
    }

    fn resolve(
        &self,
        job: &mut GenerationJob,
        snapshot: OperationSnapshot,
    ) -> GenerationResult<String> {
        if let Some(failure) = snapshot.error {
            error!(
                operation = %job.operation,
                code = ?failure.code,
                "Remote generation failed: {}",
                failure.message
            );
            job.fail(failure.message.clone());
            return Err(GenerationError::RemoteGeneration {
                message: failure.message,
            });
        }

        let Some(uri) = snapshot.media_uri.filter(|uri| !uri.trim().is_empty()) else {
            error!(operation = %job.operation, "Operation finished without a video URI");
            job.fail(GenerationError::MissingResult.to_string());
            return Err(GenerationError::MissingResult);
        };

        match self.remote.authorize_media_uri(&uri) {
            Ok(playable) => {
                info!(operation = %job.operation, "Generation job succeeded");
                job.succeed(playable.clone());
                Ok(playable)
            }
            Err(e) => {
                error!(operation = %job.operation, "Unusable video URI {}: {}", uri, e);
                job.fail(GenerationError::MissingResult.to_string());
                Err(GenerationError::MissingResult)
            }
        }
    }
}
