use std::sync::Arc;

use http::HeaderMap;
use manta_job_interface::{
    CreatedJob, ErrorRecord, JobApi, JobClientError, JobClientResult, JobListing, JobState, JobStatus, ObjectStore,
    Phase, ResultCategory, ResultSource,
};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::metrics::JOB_METRICS;
use crate::poller::{JobPoller, PollPolicy};
use crate::resolver::{ResolvedResults, ResultResolver};
use crate::submitter::JobSubmitter;

/// Outcome of a full run: the created job and the terminal state it reached
#[derive(Debug, Clone, Serialize)]
pub struct JobRun {
    pub job_id: String,
    pub location: String,
    pub state: JobState,
}

/// Drives jobs through their lifecycle and exposes the job client operations.
pub struct JobOrchestrator {
    api: Arc<dyn JobApi>,
    submitter: JobSubmitter,
    poller: JobPoller,
    resolver: ResultResolver,
    poll_policy: PollPolicy,
}

impl JobOrchestrator {
    pub fn new(api: Arc<dyn JobApi>, store: Arc<dyn ObjectStore>, poll_policy: PollPolicy) -> Self {
        Self {
            submitter: JobSubmitter::new(api.clone()),
            poller: JobPoller::new(api.clone()),
            resolver: ResultResolver::new(api.clone(), store),
            api,
            poll_policy,
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll_policy
    }

    /// Creates a job and cancels it right away.
    pub async fn create_and_cancel(&self, phases: Vec<Phase>, name: &str) -> JobClientResult<CreatedJob> {
        let created = self.submitter.create(phases, name).await?;
        self.submitter.cancel(&created.job_id).await?;
        Ok(created)
    }

    /// Create, add inputs, end input, wait.
    ///
    /// When a step after creation fails, the job is cancelled before the error is returned. A
    /// cancelled wait is the exception: the job is left running.
    #[tracing::instrument(skip(self, phases, inputs, cancellation), fields(inputs = inputs.len()))]
    pub async fn run(
        &self,
        phases: Vec<Phase>,
        name: &str,
        inputs: &[String],
        policy: PollPolicy,
        cancellation: &CancellationToken,
    ) -> JobClientResult<JobRun> {
        info!(log_type = "starting", category = "run_job", name = %name, "Running job.");
        let created = self.submitter.create(phases, name).await?;
        let job_id = created.job_id.as_str();

        match self.drive(job_id, inputs, policy, cancellation).await {
            Ok(state) => {
                self.submitter.release(job_id);
                JOB_METRICS.record_run("completed");
                info!(log_type = "completed", category = "run_job", job_id = %job_id, state = %state, "Job run finished.");
                Ok(JobRun { job_id: created.job_id.clone(), location: created.location, state })
            }
            Err(e @ JobClientError::WaitCancelled { .. }) => {
                JOB_METRICS.record_run("wait_cancelled");
                Err(e)
            }
            Err(e) => {
                JOB_METRICS.record_run(e.error_type());
                warn!(job_id = %job_id, error = %e, "Job run failed, cancelling job.");
                match self.submitter.cancel(job_id).await {
                    Ok(_) => JOB_METRICS.cleanup_cancellations_total.add(1.0, &[]),
                    Err(cleanup) => warn!(job_id = %job_id, error = %cleanup, "Failed to cancel job after failed run."),
                }
                Err(e)
            }
        }
    }

    async fn drive(
        &self,
        job_id: &str,
        inputs: &[String],
        policy: PollPolicy,
        cancellation: &CancellationToken,
    ) -> JobClientResult<JobState> {
        self.submitter.add_inputs(job_id, inputs).await?;
        self.submitter.end_input(job_id).await?;
        self.poller.wait_until_terminal(job_id, policy, cancellation).await
    }

    pub async fn resolve(
        &self,
        job_id: &str,
        category: ResultCategory,
        source: ResultSource,
    ) -> JobClientResult<ResolvedResults> {
        self.resolver.resolve(job_id, category, source).await
    }

    /// Contents of every referenced object, in order. Not available for errors.
    pub async fn resolve_contents(
        &self,
        job_id: &str,
        category: ResultCategory,
        source: ResultSource,
    ) -> JobClientResult<Vec<String>> {
        let paths = self.resolver.resolve(job_id, category, source).await?.into_paths()?;
        let mut contents = Vec::with_capacity(paths.len());
        for path in &paths {
            contents.push(self.resolver.read_as_string(path).await?);
        }
        Ok(contents)
    }

    pub async fn read_as_string(&self, reference: &str) -> JobClientResult<String> {
        self.resolver.read_as_string(reference).await
    }

    // ==================== JOB CLIENT ====================

    pub async fn create_job(&self, phases: Vec<Phase>, name: &str) -> JobClientResult<CreatedJob> {
        self.submitter.create(phases, name).await
    }

    pub async fn cancel_job(&self, job_id: &str) -> JobClientResult<HeaderMap> {
        self.submitter.cancel(job_id).await
    }

    pub async fn add_job_inputs(&self, job_id: &str, inputs: &[String]) -> JobClientResult<HeaderMap> {
        self.submitter.add_inputs(job_id, inputs).await
    }

    pub async fn end_job_input(&self, job_id: &str) -> JobClientResult<HeaderMap> {
        self.submitter.end_input(job_id).await
    }

    pub async fn get_job_state(&self, job_id: &str) -> JobClientResult<JobState> {
        let state = self.poller.get_job_state(job_id).await?;
        self.release_if_terminal(job_id, &state);
        Ok(state)
    }

    pub async fn get_job_status(&self, job_id: &str) -> JobClientResult<JobStatus> {
        self.api.get_job_status(job_id).await
    }

    /// Waits with the policy this orchestrator was built with
    pub async fn wait_until_terminal(&self, job_id: &str, cancellation: &CancellationToken) -> JobClientResult<JobState> {
        let state = self.poller.wait_until_terminal(job_id, self.poll_policy, cancellation).await?;
        self.release_if_terminal(job_id, &state);
        Ok(state)
    }

    fn release_if_terminal(&self, job_id: &str, state: &JobState) {
        if state.is_terminal() {
            self.submitter.release(job_id);
        }
    }

    pub async fn list_jobs(&self) -> JobClientResult<JobListing> {
        self.api.list_jobs().await
    }

    pub async fn get_job_input(&self, job_id: &str) -> JobClientResult<Vec<String>> {
        self.paths(job_id, ResultCategory::Inputs, ResultSource::Live).await
    }

    pub async fn get_job_archived_input(&self, job_id: &str) -> JobClientResult<Vec<String>> {
        self.paths(job_id, ResultCategory::Inputs, ResultSource::Archived).await
    }

    pub async fn get_job_live_outputs(&self, job_id: &str) -> JobClientResult<Vec<String>> {
        self.paths(job_id, ResultCategory::Outputs, ResultSource::Live).await
    }

    pub async fn get_job_outputs(&self, job_id: &str) -> JobClientResult<Vec<String>> {
        self.paths(job_id, ResultCategory::Outputs, ResultSource::Archived).await
    }

    pub async fn get_live_job_failures(&self, job_id: &str) -> JobClientResult<Vec<String>> {
        self.paths(job_id, ResultCategory::Failures, ResultSource::Live).await
    }

    pub async fn get_job_failures(&self, job_id: &str) -> JobClientResult<Vec<String>> {
        self.paths(job_id, ResultCategory::Failures, ResultSource::Archived).await
    }

    pub async fn get_live_job_errors(&self, job_id: &str) -> JobClientResult<Vec<ErrorRecord>> {
        self.resolver.resolve_live(job_id, ResultCategory::Errors).await?.into_errors()
    }

    pub async fn get_job_errors(&self, job_id: &str) -> JobClientResult<Vec<ErrorRecord>> {
        self.resolver.resolve_archived(job_id, ResultCategory::Errors).await?.into_errors()
    }

    async fn paths(&self, job_id: &str, category: ResultCategory, source: ResultSource) -> JobClientResult<Vec<String>> {
        self.resolver.resolve(job_id, category, source).await?.into_paths()
    }
}
