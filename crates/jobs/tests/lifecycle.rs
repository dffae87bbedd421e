//! Full job flows against a mock Manta endpoint.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use bytes::Bytes;
use httpmock::prelude::*;
use httpmock::Mock;
use manta_http_client::{MantaClient, MantaValidatedArgs};
use manta_job_interface::{JobClientError, JobState, ObjectStore, Phase, ResultCategory, ResultSource};
use manta_jobs::{JobOrchestrator, PollPolicy};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use url::Url;

const JOB_ID: &str = "0d3f3f0c-1c6a-4d69-9b3c-0a3c2b2c7e11";
const INPUT_PATH: &str = "/acct/stor/manta-jobs-test/input.txt";
const INPUT_CONTENT: &str = "aa\nbb 1\ncc\nbb 2\nbb 3\n";
const OUTPUT_PATH: &str = "/acct/jobs/0d3f3f0c-1c6a-4d69-9b3c-0a3c2b2c7e11/stor/reduce.1.b1f2";
const OUTPUT_CONTENT: &str = "bb 1\nbb 2\nbb 3\n";

struct Fixture {
    server: MockServer,
    client: Arc<MantaClient>,
    orchestrator: JobOrchestrator,
}

impl Fixture {
    async fn new() -> Self {
        let server = MockServer::start_async().await;
        let args = MantaValidatedArgs {
            url: Url::parse(&server.base_url()).unwrap(),
            user: "acct".into(),
            subuser: None,
            key_id: None,
            auth_token: Some("secret-token".into()),
            timeout: Duration::from_secs(5),
        };
        let client = Arc::new(MantaClient::new(&args, args.token_authentication()).unwrap());
        let orchestrator = JobOrchestrator::new(client.clone(), client.clone(), fast_policy(20));
        Self { server, client, orchestrator }
    }

    async fn mock_post(&self, path: String, status: u16) -> Mock<'_> {
        self.server
            .mock_async(|when, then| {
                when.method(POST).path(path);
                then.status(status);
            })
            .await
    }

    async fn mock_get(&self, path: String, body: &str) -> Mock<'_> {
        let body = body.to_string();
        self.server
            .mock_async(|when, then| {
                when.method(GET).path(path);
                then.status(200).body(body);
            })
            .await
    }

    /// Create, input and end-of-input endpoints plus a status that is already terminal
    async fn mock_accepting_job(&self, state: &str) {
        self.server
            .mock_async(|when, then| {
                when.method(POST).path("/acct/jobs");
                then.status(201).header("location", format!("/acct/jobs/{JOB_ID}"));
            })
            .await;
        self.mock_post(format!("/acct/jobs/{JOB_ID}/live/in"), 204).await;
        self.mock_post(format!("/acct/jobs/{JOB_ID}/live/in/end"), 202).await;
        let status = json!({ "id": JOB_ID, "name": "test", "state": state, "cancelled": false, "inputDone": true });
        self.mock_get(format!("/acct/jobs/{JOB_ID}/live/status"), &status.to_string()).await;
    }
}

fn fast_policy(max_attempts: u32) -> PollPolicy {
    PollPolicy::new(max_attempts, Duration::from_millis(10))
}

fn inputs() -> Vec<String> {
    vec![INPUT_PATH.to_string()]
}

#[tokio::test]
async fn create_then_cancel() {
    let fixture = Fixture::new().await;
    fixture
        .server
        .mock_async(|when, then| {
            when.method(POST).path("/acct/jobs");
            then.status(201).header("location", format!("/acct/jobs/{JOB_ID}"));
        })
        .await;
    let cancel = fixture.mock_post(format!("/acct/jobs/{JOB_ID}/live/cancel"), 202).await;

    let job = fixture.orchestrator.create_and_cancel(vec![Phase::map("wc")], "smoke").await.unwrap();

    assert_eq!(job.job_id, JOB_ID);
    assert_eq!(job.location, format!("/acct/jobs/{JOB_ID}"));
    assert!(job.headers.contains_key("location"));
    cancel.assert_async().await;
}

#[tokio::test]
async fn grep_flow_outputs_match_live_and_archived() {
    let fixture = Fixture::new().await;
    fixture.mock_accepting_job("done").await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/live/out"), &format!("{OUTPUT_PATH}\n")).await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/out.txt"), &format!("{OUTPUT_PATH}\n")).await;
    fixture.mock_get(OUTPUT_PATH.to_string(), OUTPUT_CONTENT).await;

    let run = fixture
        .orchestrator
        .run(
            vec![Phase::map("grep bb"), Phase::reduce("sort | uniq")],
            "grep",
            &inputs(),
            fast_policy(20),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
    assert_eq!(run.state, JobState::Done);

    for source in [ResultSource::Live, ResultSource::Archived] {
        let contents =
            fixture.orchestrator.resolve_contents(JOB_ID, ResultCategory::Outputs, source).await.unwrap();
        assert_eq!(contents, vec![OUTPUT_CONTENT.to_string()]);
    }
    assert_eq!(fixture.orchestrator.get_job_live_outputs(JOB_ID).await.unwrap(), vec![OUTPUT_PATH.to_string()]);
    assert_eq!(fixture.orchestrator.get_job_outputs(JOB_ID).await.unwrap(), vec![OUTPUT_PATH.to_string()]);
}

#[tokio::test]
async fn recorded_input_reads_back_as_submitted() {
    let fixture = Fixture::new().await;
    let put = fixture
        .server
        .mock_async(|when, then| {
            when.method(PUT).path(INPUT_PATH).body(INPUT_CONTENT);
            then.status(204);
        })
        .await;
    fixture.mock_accepting_job("done").await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/live/in"), &format!("{INPUT_PATH}\n")).await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/in.txt"), &format!("{INPUT_PATH}\n")).await;
    fixture.mock_get(INPUT_PATH.to_string(), INPUT_CONTENT).await;

    fixture.client.put_object(Bytes::from_static(INPUT_CONTENT.as_bytes()), INPUT_PATH).await.unwrap();
    fixture
        .orchestrator
        .run(vec![Phase::map("cat")], "cat", &inputs(), fast_policy(20), &CancellationToken::new())
        .await
        .unwrap();

    let live = fixture.orchestrator.get_job_input(JOB_ID).await.unwrap();
    let archived = fixture.orchestrator.get_job_archived_input(JOB_ID).await.unwrap();
    assert_eq!(live, archived);
    assert_eq!(fixture.orchestrator.read_as_string(&live[0]).await.unwrap(), INPUT_CONTENT);
    put.assert_async().await;
}

#[tokio::test]
async fn failing_task_reports_failures_and_errors() {
    let fixture = Fixture::new().await;
    let error_line = json!({
        "phase": "0",
        "what": format!("phase 0: map input \"{INPUT_PATH}\""),
        "code": "UserTaskError",
        "message": "user command exited with code 1",
        "input": INPUT_PATH
    })
    .to_string();
    fixture.mock_accepting_job("done").await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/live/fail"), &format!("{INPUT_PATH}\n")).await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/fail.txt"), &format!("{INPUT_PATH}\n")).await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/live/err"), &format!("{error_line}\n")).await;
    fixture.mock_get(format!("/acct/jobs/{JOB_ID}/err.txt"), &format!("{error_line}\n")).await;
    fixture.mock_get(INPUT_PATH.to_string(), INPUT_CONTENT).await;

    fixture
        .orchestrator
        .run(vec![Phase::map("grep foo")], "grep-foo", &inputs(), fast_policy(20), &CancellationToken::new())
        .await
        .unwrap();

    for failures in [
        fixture.orchestrator.get_live_job_failures(JOB_ID).await.unwrap(),
        fixture.orchestrator.get_job_failures(JOB_ID).await.unwrap(),
    ] {
        assert_eq!(fixture.orchestrator.read_as_string(&failures[0]).await.unwrap(), INPUT_CONTENT);
    }
    for errors in [
        fixture.orchestrator.get_live_job_errors(JOB_ID).await.unwrap(),
        fixture.orchestrator.get_job_errors(JOB_ID).await.unwrap(),
    ] {
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "UserTaskError");
        assert_eq!(errors[0].input.as_deref(), Some(INPUT_PATH));
    }
}

#[tokio::test]
async fn terminal_state_is_stable() {
    let fixture = Fixture::new().await;
    fixture.mock_accepting_job("done").await;

    for _ in 0..3 {
        assert_eq!(fixture.orchestrator.get_job_state(JOB_ID).await.unwrap(), JobState::Done);
    }
}

#[tokio::test]
async fn poll_bound_times_out_and_cancels() {
    let fixture = Fixture::new().await;
    fixture.mock_accepting_job("running").await;
    let cancel = fixture.mock_post(format!("/acct/jobs/{JOB_ID}/live/cancel"), 202).await;

    let result = fixture
        .orchestrator
        .run(vec![Phase::map("sleep 600")], "slow", &inputs(), fast_policy(3), &CancellationToken::new())
        .await;

    assert_matches!(result, Err(JobClientError::PollTimeout { attempts: 3, last_state: JobState::Running, .. }));
    cancel.assert_async().await;
}

#[tokio::test]
async fn server_side_sealing_is_reported_as_sealed() {
    let fixture = Fixture::new().await;
    fixture
        .server
        .mock_async(|when, then| {
            when.method(POST).path(format!("/acct/jobs/{JOB_ID}/live/in"));
            then.status(409).json_body(json!({ "code": "InvalidJobStateError", "message": "job input is closed" }));
        })
        .await;

    let result = fixture.orchestrator.add_job_inputs(JOB_ID, &inputs()).await;
    assert_matches!(result, Err(JobClientError::JobSealed { reason, .. }) if reason == "job input is closed");
}

#[tokio::test]
async fn list_jobs_works_on_an_empty_account() {
    let fixture = Fixture::new().await;
    fixture
        .server
        .mock_async(|when, then| {
            when.method(GET).path("/acct/jobs");
            then.status(200).header("result-set-size", "0");
        })
        .await;

    let listing = fixture.orchestrator.list_jobs().await.unwrap();
    assert!(listing.data.is_empty());
    assert_eq!(listing.headers.get("result-set-size").unwrap(), "0");
}
