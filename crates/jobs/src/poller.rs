use std::sync::Arc;
use std::time::Duration;

use manta_job_interface::{JobApi, JobClientError, JobClientResult, JobState};
use manta_utils::ensure;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::metrics::JOB_METRICS;

pub const DEFAULT_POLL_ATTEMPTS: u32 = 20;
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// How long to wait for a job: at most `max_attempts` status queries, `interval` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self { max_attempts: DEFAULT_POLL_ATTEMPTS, interval: DEFAULT_POLL_INTERVAL }
    }
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self { max_attempts, interval }
    }
}

pub struct JobPoller {
    api: Arc<dyn JobApi>,
}

impl JobPoller {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api }
    }

    pub async fn get_job_state(&self, job_id: &str) -> JobClientResult<JobState> {
        Ok(self.api.get_job_status(job_id).await?.job_state())
    }

    /// Queries the job until it leaves `queued`/`running`.
    ///
    /// Running out of attempts is a [`JobClientError::PollTimeout`], not a job state. A
    /// cancelled `cancellation` ends the wait with [`JobClientError::WaitCancelled`] and leaves
    /// the job untouched.
    pub async fn wait_until_terminal(
        &self,
        job_id: &str,
        policy: PollPolicy,
        cancellation: &CancellationToken,
    ) -> JobClientResult<JobState> {
        ensure!(policy.max_attempts > 0, JobClientError::validation("max_attempts must be at least 1"));

        info!(
            log_type = "starting",
            category = "wait_job",
            job_id = %job_id,
            max_attempts = policy.max_attempts,
            interval_ms = policy.interval.as_millis() as u64,
            "Waiting for job to finish."
        );

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            let state = tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(self.cancelled(job_id, attempt)),
                state = self.get_job_state(job_id) => state?,
            };
            JOB_METRICS.poll_attempts_total.add(1.0, &[]);
            debug!(job_id = %job_id, attempt = attempt, state = %state, "Polled job state");

            if state.is_terminal() {
                info!(log_type = "completed", category = "wait_job", job_id = %job_id, state = %state, attempt = attempt, "Job finished.");
                return Ok(state);
            }
            if attempt >= policy.max_attempts {
                return Err(JobClientError::PollTimeout { job_id: job_id.to_string(), attempts: attempt, last_state: state });
            }

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(self.cancelled(job_id, attempt)),
                _ = tokio::time::sleep(policy.interval) => {}
            }
        }
    }

    fn cancelled(&self, job_id: &str, attempt: u32) -> JobClientError {
        info!(category = "wait_job", job_id = %job_id, attempt = attempt, "Wait cancelled.");
        JobClientError::WaitCancelled { job_id: job_id.to_string() }
    }
}
