use std::sync::Arc;

use manta_job_interface::{
    ErrorRecord, JobApi, JobClientError, JobClientResult, ObjectStore, ResultCategory, ResultSource,
};
use serde::Serialize;
use tracing::debug;

/// Result set of a job. Inputs, outputs and failures are object paths; errors are records.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ResolvedResults {
    Paths(Vec<String>),
    Errors(Vec<ErrorRecord>),
}

impl ResolvedResults {
    pub fn len(&self) -> usize {
        match self {
            ResolvedResults::Paths(paths) => paths.len(),
            ResolvedResults::Errors(errors) => errors.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_paths(self) -> JobClientResult<Vec<String>> {
        match self {
            ResolvedResults::Paths(paths) => Ok(paths),
            ResolvedResults::Errors(_) => Err(JobClientError::validation("error records are not object paths")),
        }
    }

    pub fn into_errors(self) -> JobClientResult<Vec<ErrorRecord>> {
        match self {
            ResolvedResults::Errors(errors) => Ok(errors),
            ResolvedResults::Paths(_) => Err(JobClientError::validation("object paths are not error records")),
        }
    }
}

/// Reads the inputs, outputs, failures and errors of a job from its live view or from the
/// archived objects.
pub struct ResultResolver {
    api: Arc<dyn JobApi>,
    store: Arc<dyn ObjectStore>,
}

impl ResultResolver {
    pub fn new(api: Arc<dyn JobApi>, store: Arc<dyn ObjectStore>) -> Self {
        Self { api, store }
    }

    /// Archived results only exist once the job is terminal; live ones may be incomplete.
    pub async fn resolve(
        &self,
        job_id: &str,
        category: ResultCategory,
        source: ResultSource,
    ) -> JobClientResult<ResolvedResults> {
        let body = match source {
            ResultSource::Live => self.api.get_live_records(job_id, category).await?,
            ResultSource::Archived => {
                let path = self.api.archived_records_path(job_id, category);
                self.store.get_object_as_string(&path).await?
            }
        };

        let results = parse_records(category, &body)?;
        debug!(job_id = %job_id, category = %category, source = %source, records = results.len(), "Resolved job results");
        Ok(results)
    }

    pub async fn resolve_live(&self, job_id: &str, category: ResultCategory) -> JobClientResult<ResolvedResults> {
        self.resolve(job_id, category, ResultSource::Live).await
    }

    pub async fn resolve_archived(&self, job_id: &str, category: ResultCategory) -> JobClientResult<ResolvedResults> {
        self.resolve(job_id, category, ResultSource::Archived).await
    }

    pub async fn read_as_string(&self, reference: &str) -> JobClientResult<String> {
        Ok(self.store.get_object_as_string(reference).await?)
    }
}

/// One record per non-blank line, in order
fn parse_records(category: ResultCategory, body: &str) -> JobClientResult<ResolvedResults> {
    let lines = body.lines().map(str::trim).filter(|line| !line.is_empty());
    match category {
        ResultCategory::Errors => lines
            .map(|line| {
                serde_json::from_str::<ErrorRecord>(line)
                    .map_err(|e| JobClientError::parse_error("resolve_errors", format!("{e}: {line}")))
            })
            .collect::<JobClientResult<Vec<_>>>()
            .map(ResolvedResults::Errors),
        _ => Ok(ResolvedResults::Paths(lines.map(str::to_string).collect())),
    }
}
