use std::collections::BTreeMap;

use http::HeaderMap;
use manta_job_interface::{CreatedJob, JobListing, ObjectStore, ResultCategory, ResultSource};
use manta_jobs::JobOrchestrator;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::cli::{Commands, ResultArgs};
use crate::error::CliError;

/// Runs `command` and returns what should be printed.
pub async fn execute(
    command: Commands,
    orchestrator: &JobOrchestrator,
    store: &dyn ObjectStore,
    cancellation: &CancellationToken,
) -> Result<Value, CliError> {
    let output = match command {
        Commands::Create { job } => created_json(&orchestrator.create_job(job.phases, &job.name).await?),
        Commands::AddInputs { job_id, inputs } => {
            let headers = orchestrator.add_job_inputs(&job_id, &inputs).await?;
            json!({ "job_id": job_id, "inputs": inputs.len(), "headers": headers_json(&headers) })
        }
        Commands::EndInput { job_id } => {
            let headers = orchestrator.end_job_input(&job_id).await?;
            json!({ "job_id": job_id, "headers": headers_json(&headers) })
        }
        Commands::Cancel { job_id } => {
            let headers = orchestrator.cancel_job(&job_id).await?;
            json!({ "job_id": job_id, "headers": headers_json(&headers) })
        }
        Commands::State { job_id } => {
            let state = orchestrator.get_job_state(&job_id).await?;
            json!({ "job_id": job_id, "state": state })
        }
        Commands::Status { job_id } => serde_json::to_value(orchestrator.get_job_status(&job_id).await?)?,
        Commands::Wait { job_id } => {
            let state = orchestrator.wait_until_terminal(&job_id, cancellation).await?;
            json!({ "job_id": job_id, "state": state })
        }
        Commands::List => listing_json(&orchestrator.list_jobs().await?)?,
        Commands::Inputs(args) => resolve(orchestrator, ResultCategory::Inputs, args).await?,
        Commands::Outputs(args) => resolve(orchestrator, ResultCategory::Outputs, args).await?,
        Commands::Failures(args) => resolve(orchestrator, ResultCategory::Failures, args).await?,
        Commands::Errors(args) => resolve(orchestrator, ResultCategory::Errors, args).await?,
        Commands::Cat { path } => {
            let content = store.get_object_as_string(&path).await?;
            json!({ "path": path, "content": content })
        }
        Commands::Run { job, inputs, archived } => {
            let run = orchestrator
                .run(job.phases, &job.name, &inputs, orchestrator.poll_policy(), cancellation)
                .await?;
            info!(job_id = %run.job_id, state = %run.state, "Reading job outputs.");
            let outputs =
                orchestrator.resolve_contents(&run.job_id, ResultCategory::Outputs, source(archived)).await?;
            json!({ "job": run, "outputs": outputs })
        }
    };
    Ok(output)
}

async fn resolve(orchestrator: &JobOrchestrator, category: ResultCategory, args: ResultArgs) -> Result<Value, CliError> {
    let results = orchestrator.resolve(&args.job_id, category, source(args.archived)).await?;
    Ok(json!({
        "job_id": args.job_id,
        "category": category,
        "source": source(args.archived),
        "results": results,
    }))
}

fn source(archived: bool) -> ResultSource {
    if archived {
        ResultSource::Archived
    } else {
        ResultSource::Live
    }
}

fn created_json(created: &CreatedJob) -> Value {
    json!({
        "job_id": created.job_id,
        "location": created.location,
        "headers": headers_json(&created.headers),
    })
}

fn listing_json(listing: &JobListing) -> Result<Value, CliError> {
    Ok(json!({ "headers": headers_json(&listing.headers), "data": serde_json::to_value(&listing.data)? }))
}

/// Headers whose value is not visible ASCII are skipped
fn headers_json(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .iter()
        .filter_map(|(name, value)| value.to_str().ok().map(|value| (name.to_string(), value.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use http::HeaderValue;

    use super::*;

    #[test]
    fn headers_are_flattened_to_strings() {
        let mut headers = HeaderMap::new();
        headers.insert("location", HeaderValue::from_static("/acct/jobs/job-1"));
        headers.insert("x-binary", HeaderValue::from_bytes(&[0xfa]).unwrap());

        let flattened = headers_json(&headers);
        assert_eq!(flattened.get("location").map(String::as_str), Some("/acct/jobs/job-1"));
        assert!(!flattened.contains_key("x-binary"));
    }

    #[test]
    fn created_job_output() {
        let created =
            CreatedJob { job_id: "job-1".into(), location: "/acct/jobs/job-1".into(), headers: HeaderMap::new() };
        assert_eq!(created_json(&created), json!({ "job_id": "job-1", "location": "/acct/jobs/job-1", "headers": {} }));
    }
}
