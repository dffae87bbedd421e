use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use http::HeaderMap;
use manta_job_interface::{CreatedJob, JobApi, JobClientError, JobClientResult, JobSpec, Phase};
use manta_utils::ensure;
use tracing::{debug, info};

/// Creates jobs, feeds them inputs and closes or cancels them.
///
/// The only state kept is the set of jobs sealed through this submitter. Adding inputs to one
/// of them fails without a request. Entries live until [`JobSubmitter::release`], which the
/// orchestrator calls once a job is seen in a terminal state.
pub struct JobSubmitter {
    api: Arc<dyn JobApi>,
    sealed: Mutex<HashSet<String>>,
}

impl JobSubmitter {
    pub fn new(api: Arc<dyn JobApi>) -> Self {
        Self { api, sealed: Mutex::new(HashSet::new()) }
    }

    pub fn is_sealed(&self, job_id: &str) -> bool {
        self.sealed.lock().unwrap_or_else(PoisonError::into_inner).contains(job_id)
    }

    fn seal(&self, job_id: &str) {
        self.sealed.lock().unwrap_or_else(PoisonError::into_inner).insert(job_id.to_string());
    }

    /// Forgets a job. Inputs for it are forwarded again, and a terminal job rejects them
    /// remotely, which still surfaces as [`JobClientError::JobSealed`].
    pub fn release(&self, job_id: &str) {
        self.sealed.lock().unwrap_or_else(PoisonError::into_inner).remove(job_id);
    }

    /// Phases are validated before anything is sent.
    #[tracing::instrument(skip(self, phases), fields(phases = phases.len()))]
    pub async fn create(&self, phases: Vec<Phase>, name: &str) -> JobClientResult<CreatedJob> {
        let spec = JobSpec::new(name, phases);
        spec.validate()?;

        info!(log_type = "starting", category = "create_job", name = %name, "Creating job.");
        let created = self.api.create_job(&spec).await?;
        ensure!(
            !created.job_id.is_empty(),
            JobClientError::parse_error("create_job", format!("empty job id in location {:?}", created.location))
        );
        info!(log_type = "completed", category = "create_job", job_id = %created.job_id, "Job created.");

        Ok(created)
    }

    /// Sends `inputs` in order, duplicates included.
    pub async fn add_inputs(&self, job_id: &str, inputs: &[String]) -> JobClientResult<HeaderMap> {
        ensure!(!inputs.is_empty(), JobClientError::validation(format!("no inputs given for job {job_id}")));
        ensure!(
            inputs.iter().all(|input| !input.trim().is_empty()),
            JobClientError::validation(format!("empty input path given for job {job_id}"))
        );
        ensure!(
            !self.is_sealed(job_id),
            JobClientError::JobSealed { job_id: job_id.to_string(), reason: "end of input was already sent".into() }
        );

        debug!(job_id = %job_id, inputs = inputs.len(), "Adding job inputs");
        match self.api.add_job_inputs(job_id, inputs).await {
            Ok(headers) => Ok(headers),
            Err(JobClientError::RemoteRequest(remote)) if remote.is_invalid_job_state() => {
                self.seal(job_id);
                Err(JobClientError::JobSealed { job_id: job_id.to_string(), reason: remote.reason().to_string() })
            }
            Err(e) => Err(e),
        }
    }

    /// Seals the job once the service accepted the request. A second call is forwarded as is.
    pub async fn end_input(&self, job_id: &str) -> JobClientResult<HeaderMap> {
        let headers = self.api.end_job_input(job_id).await?;
        self.seal(job_id);
        info!(category = "end_input", job_id = %job_id, "Job input ended.");
        Ok(headers)
    }

    /// Safe on jobs that are already terminal.
    pub async fn cancel(&self, job_id: &str) -> JobClientResult<HeaderMap> {
        let headers = self.api.cancel_job(job_id).await?;
        self.seal(job_id);
        info!(category = "cancel_job", job_id = %job_id, "Job cancelled.");
        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use http::StatusCode;
    use manta_job_interface::{MockJobApi, PhaseType, RemoteError};
    use mockall::Sequence;
    use rstest::rstest;

    use super::*;

    const JOB_ID: &str = "job-1";

    fn created() -> CreatedJob {
        CreatedJob { job_id: JOB_ID.into(), location: format!("/acct/jobs/{JOB_ID}"), headers: HeaderMap::new() }
    }

    fn remote_error(status: StatusCode, body: &str, code: Option<&str>) -> JobClientError {
        JobClientError::RemoteRequest(RemoteError {
            operation: "add_job_inputs".into(),
            status,
            code: code.map(str::to_string),
            message: None,
            body: body.into(),
        })
    }

    #[tokio::test]
    async fn create_sends_phases_in_order() {
        let mut api = MockJobApi::new();
        api.expect_create_job()
            .withf(|spec| {
                spec.name == "grep"
                    && spec.phases.iter().map(|phase| phase.phase_type).collect::<Vec<_>>()
                        == vec![PhaseType::Map, PhaseType::Reduce]
            })
            .times(1)
            .returning(|_| Ok(created()));

        let submitter = JobSubmitter::new(Arc::new(api));
        let job = submitter.create(vec![Phase::map("grep bb"), Phase::reduce("sort | uniq -c")], "grep").await.unwrap();
        assert_eq!(job.job_id, JOB_ID);
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec![Phase::map("")])]
    #[case(vec![Phase::map("cat").with_count(3)])]
    #[tokio::test]
    async fn invalid_phases_never_reach_the_api(#[case] phases: Vec<Phase>) {
        let submitter = JobSubmitter::new(Arc::new(MockJobApi::new()));
        assert_matches!(submitter.create(phases, "invalid").await, Err(JobClientError::Validation(_)));
    }

    #[rstest]
    #[case(vec![])]
    #[case(vec!["/acct/stor/a".to_string(), " ".to_string()])]
    #[tokio::test]
    async fn invalid_inputs_never_reach_the_api(#[case] inputs: Vec<String>) {
        let submitter = JobSubmitter::new(Arc::new(MockJobApi::new()));
        assert_matches!(submitter.add_inputs(JOB_ID, &inputs).await, Err(JobClientError::Validation(_)));
    }

    #[tokio::test]
    async fn inputs_after_end_input_fail_locally() {
        let mut api = MockJobApi::new();
        api.expect_end_job_input().times(1).returning(|_| Ok(HeaderMap::new()));
        api.expect_add_job_inputs().times(0);

        let submitter = JobSubmitter::new(Arc::new(api));
        submitter.end_input(JOB_ID).await.unwrap();

        let result = submitter.add_inputs(JOB_ID, &["/acct/stor/a".to_string()]).await;
        assert_matches!(result, Err(JobClientError::JobSealed { job_id, .. }) if job_id == JOB_ID);
    }

    #[tokio::test]
    async fn duplicate_inputs_are_forwarded() {
        let mut api = MockJobApi::new();
        api.expect_add_job_inputs()
            .withf(|job_id, inputs| job_id == JOB_ID && inputs == ["/acct/stor/a", "/acct/stor/a"])
            .times(1)
            .returning(|_, _| Ok(HeaderMap::new()));

        let submitter = JobSubmitter::new(Arc::new(api));
        let inputs = vec!["/acct/stor/a".to_string(), "/acct/stor/a".to_string()];
        submitter.add_inputs(JOB_ID, &inputs).await.unwrap();
    }

    #[rstest]
    #[case(StatusCode::CONFLICT, None)]
    #[case(StatusCode::BAD_REQUEST, Some("InvalidJobStateError"))]
    #[tokio::test]
    async fn service_side_sealing_is_job_sealed(#[case] status: StatusCode, #[case] code: Option<&'static str>) {
        let mut api = MockJobApi::new();
        api.expect_add_job_inputs().times(1).returning(move |_, _| Err(remote_error(status, "input closed", code)));

        let submitter = JobSubmitter::new(Arc::new(api));
        let result = submitter.add_inputs(JOB_ID, &["/acct/stor/a".to_string()]).await;

        assert_matches!(result, Err(JobClientError::JobSealed { reason, .. }) if reason == "input closed");
        assert!(submitter.is_sealed(JOB_ID));
    }

    #[tokio::test]
    async fn other_remote_errors_are_kept() {
        let mut api = MockJobApi::new();
        api.expect_add_job_inputs()
            .times(1)
            .returning(|_, _| Err(remote_error(StatusCode::INTERNAL_SERVER_ERROR, "boom", None)));

        let submitter = JobSubmitter::new(Arc::new(api));
        let result = submitter.add_inputs(JOB_ID, &["/acct/stor/a".to_string()]).await;

        assert_matches!(result, Err(JobClientError::RemoteRequest(remote)) if remote.status == StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!submitter.is_sealed(JOB_ID));
    }

    #[tokio::test]
    async fn failed_end_input_does_not_seal() {
        let mut api = MockJobApi::new();
        api.expect_end_job_input()
            .times(1)
            .returning(|_| Err(JobClientError::network_error("end_job_input", "connection reset")));

        let submitter = JobSubmitter::new(Arc::new(api));
        assert!(submitter.end_input(JOB_ID).await.is_err());
        assert!(!submitter.is_sealed(JOB_ID));
    }

    #[tokio::test]
    async fn second_end_input_is_forwarded() {
        let mut sequence = Sequence::new();
        let mut api = MockJobApi::new();
        api.expect_end_job_input().times(1).in_sequence(&mut sequence).returning(|_| Ok(HeaderMap::new()));
        api.expect_end_job_input()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|_| Err(remote_error(StatusCode::CONFLICT, "job input already closed", None)));

        let submitter = JobSubmitter::new(Arc::new(api));
        submitter.end_input(JOB_ID).await.unwrap();

        let result = submitter.end_input(JOB_ID).await;
        assert_matches!(
            result,
            Err(JobClientError::RemoteRequest(remote))
                if remote.status == StatusCode::CONFLICT && remote.body == "job input already closed"
        );
        assert!(submitter.is_sealed(JOB_ID));
    }

    #[tokio::test]
    async fn released_job_forwards_inputs_again() {
        let mut api = MockJobApi::new();
        api.expect_cancel_job().times(1).returning(|_| Ok(HeaderMap::new()));
        api.expect_add_job_inputs()
            .times(1)
            .returning(|_, _| Err(remote_error(StatusCode::CONFLICT, "job is done", None)));

        let submitter = JobSubmitter::new(Arc::new(api));
        submitter.cancel(JOB_ID).await.unwrap();
        submitter.release(JOB_ID);
        assert!(!submitter.is_sealed(JOB_ID));

        let result = submitter.add_inputs(JOB_ID, &["/acct/stor/a".to_string()]).await;
        assert_matches!(result, Err(JobClientError::JobSealed { reason, .. }) if reason == "job is done");
    }

    #[tokio::test]
    async fn cancel_seals_the_job() {
        let mut api = MockJobApi::new();
        api.expect_cancel_job().times(1).returning(|_| Ok(HeaderMap::new()));

        let submitter = JobSubmitter::new(Arc::new(api));
        submitter.cancel(JOB_ID).await.unwrap();
        assert!(submitter.is_sealed(JOB_ID));
    }
}
