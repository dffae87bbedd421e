use std::future::Future;
use std::time::Instant;

use async_trait::async_trait;
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use manta_job_interface::{
    CreatedJob, DirectoryEntry, EntryType, JobApi, JobClientResult, JobListing, JobSpec, JobStatus, ObjectStore,
    ResultCategory, StorageError, StorageResult,
};
use manta_utils::http_client::{HttpClient, RequestBuilder};
use reqwest::header::HeaderMap;
use reqwest::{Response, StatusCode};
use tracing::debug;

use crate::api::MantaApiOperations;
use crate::constants::{DEFAULT_PAGE_SIZE, JOBS_DIRECTORY, MIN_PAGE_SIZE, USER_AGENT};
use crate::error::MantaError;
use crate::metrics::MANTA_METRICS;
use crate::transport::Authentication;
use crate::MantaValidatedArgs;

/// HTTP client for the Manta job and object APIs.
///
/// Every request goes through [`MantaClient::execute`], which applies authentication, sends
/// and records metrics. Nothing is retried.
#[derive(Debug, Clone)]
pub struct MantaClient {
    http: HttpClient,
    account: String,
    auth: Authentication,
    page_size: u32,
}

impl MantaClient {
    pub fn new(args: &MantaValidatedArgs, auth: Authentication) -> Result<Self, MantaError> {
        let http = HttpClient::builder(args.url.as_str())
            .and_then(|builder| builder.timeout(args.timeout).user_agent(USER_AGENT).build())
            .map_err(|e| MantaError::request_error("build_client", e.to_string()))?;

        Ok(Self { http, account: args.user.clone(), auth, page_size: DEFAULT_PAGE_SIZE })
    }

    /// Entries requested per listing page, at least [`MIN_PAGE_SIZE`]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(MIN_PAGE_SIZE);
        self
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    async fn execute<'a, T, F, Fut>(
        &'a self,
        operation: &'static str,
        request: RequestBuilder<'a>,
        parse: F,
    ) -> Result<T, MantaError>
    where
        F: FnOnce(Response) -> Fut,
        Fut: Future<Output = Result<T, MantaError>>,
    {
        let start = Instant::now();
        let request_bytes = request.body_len();

        let result: Result<T, MantaError> = async {
            let request = self.auth.apply(request, operation)?;
            let response =
                request.send().await.map_err(|e| MantaError::from_http_client_error(operation, e))?;
            parse(response).await
        }
        .await;

        let duration = start.elapsed().as_secs_f64();
        match &result {
            Ok(_) => MANTA_METRICS.record_success(operation, duration, request_bytes),
            Err(e) => MANTA_METRICS.record_failure(operation, duration, request_bytes, e.error_type()),
        }
        result
    }

    async fn send_for_headers(&self, operation: &'static str, request: RequestBuilder<'_>) -> Result<HeaderMap, MantaError> {
        self.execute(operation, request, |response| MantaApiOperations::parse_headers_response(response, operation))
            .await
    }

    fn delete_tree<'a>(&'a self, path: &'a str) -> BoxFuture<'a, StorageResult<HeaderMap>> {
        async move {
            for entry in self.list_directory(path).await? {
                let child = format!("{}/{}", path.trim_end_matches('/'), entry.name);
                match entry.entry_type {
                    EntryType::Directory => self.delete_tree(&child).await?,
                    EntryType::Object => self.delete_object(&child).await?,
                };
            }
            self.delete_path("delete_directory", path).await
        }
        .boxed()
    }

    async fn delete_path(&self, operation: &'static str, path: &str) -> StorageResult<HeaderMap> {
        let request = MantaApiOperations::build_delete_request(self.http.request(), path);
        self.send_for_headers(operation, request).await.map_err(|e| not_found_or(path, e))
    }
}

/// Object paths are absolute, e.g. `/<account>/stor/<name>`
fn validate_path(path: &str) -> StorageResult<()> {
    if !path.starts_with('/') {
        return Err(StorageError::InvalidPath { path: path.to_string(), reason: "path must be absolute".into() });
    }
    if path.split('/').all(|segment| segment.is_empty()) {
        return Err(StorageError::InvalidPath { path: path.to_string(), reason: "path has no segments".into() });
    }
    Ok(())
}

fn not_found_or(path: &str, error: MantaError) -> StorageError {
    match error.status() {
        Some(StatusCode::NOT_FOUND) => StorageError::NotFound { path: path.to_string() },
        _ => error.into(),
    }
}

#[async_trait]
impl JobApi for MantaClient {
    async fn create_job(&self, spec: &JobSpec) -> JobClientResult<CreatedJob> {
        let request = MantaApiOperations::build_create_job_request(self.http.request(), &self.account, spec)?;
        Ok(self.execute("create_job", request, MantaApiOperations::parse_create_job_response).await?)
    }

    async fn add_job_inputs(&self, job_id: &str, inputs: &[String]) -> JobClientResult<HeaderMap> {
        let request = MantaApiOperations::build_add_inputs_request(self.http.request(), &self.account, job_id, inputs);
        Ok(self.send_for_headers("add_job_inputs", request).await?)
    }

    async fn end_job_input(&self, job_id: &str) -> JobClientResult<HeaderMap> {
        let request = MantaApiOperations::build_end_input_request(self.http.request(), &self.account, job_id);
        Ok(self.send_for_headers("end_job_input", request).await?)
    }

    async fn cancel_job(&self, job_id: &str) -> JobClientResult<HeaderMap> {
        let request = MantaApiOperations::build_cancel_job_request(self.http.request(), &self.account, job_id);
        Ok(self.send_for_headers("cancel_job", request).await?)
    }

    async fn get_job_status(&self, job_id: &str) -> JobClientResult<JobStatus> {
        let request = MantaApiOperations::build_job_status_request(self.http.request(), &self.account, job_id);
        Ok(self.execute("get_job_status", request, MantaApiOperations::parse_job_status_response).await?)
    }

    async fn list_jobs(&self) -> JobClientResult<JobListing> {
        let request = MantaApiOperations::build_list_jobs_request(self.http.request(), &self.account);
        let (headers, data) = self
            .execute("list_jobs", request, |response| MantaApiOperations::parse_listing_response(response, "list_jobs"))
            .await?;
        Ok(JobListing { headers, data })
    }

    async fn get_live_records(&self, job_id: &str, category: ResultCategory) -> JobClientResult<String> {
        let request =
            MantaApiOperations::build_live_records_request(self.http.request(), &self.account, job_id, category);
        Ok(self
            .execute("get_live_records", request, |response| {
                MantaApiOperations::parse_text_response(response, "get_live_records")
            })
            .await?)
    }

    fn archived_records_path(&self, job_id: &str, category: ResultCategory) -> String {
        format!("/{}/{}/{}/{}", self.account, JOBS_DIRECTORY, job_id, category.archived_object_name())
    }
}

#[async_trait]
impl ObjectStore for MantaClient {
    async fn put_object(&self, data: Bytes, path: &str) -> StorageResult<HeaderMap> {
        validate_path(path)?;
        let request = MantaApiOperations::build_put_object_request(self.http.request(), path, data);
        Ok(self.send_for_headers("put_object", request).await?)
    }

    async fn get_object(&self, path: &str) -> StorageResult<Bytes> {
        validate_path(path)?;
        let request = MantaApiOperations::build_get_object_request(self.http.request(), path);
        self.execute("get_object", request, |response| MantaApiOperations::parse_bytes_response(response, "get_object"))
            .await
            .map_err(|e| not_found_or(path, e))
    }

    async fn get_object_as_string(&self, path: &str) -> StorageResult<String> {
        let bytes = self.get_object(path).await?;
        String::from_utf8(bytes.to_vec()).map_err(|_| StorageError::InvalidUtf8 { path: path.to_string() })
    }

    async fn exists(&self, path: &str) -> StorageResult<bool> {
        validate_path(path)?;
        let request = MantaApiOperations::build_head_object_request(self.http.request(), path);
        Ok(self
            .execute("head_object", request, |response| MantaApiOperations::parse_exists_response(response, "head_object"))
            .await?)
    }

    async fn delete_object(&self, path: &str) -> StorageResult<HeaderMap> {
        validate_path(path)?;
        self.delete_path("delete_object", path).await
    }

    async fn put_directory(&self, path: &str) -> StorageResult<HeaderMap> {
        validate_path(path)?;
        let request = MantaApiOperations::build_put_directory_request(self.http.request(), path);
        Ok(self.send_for_headers("put_directory", request).await?)
    }

    /// Follows `marker` paging until a short page. The marker entry repeated at the top of a
    /// page is dropped.
    async fn list_directory(&self, path: &str) -> StorageResult<Vec<DirectoryEntry>> {
        validate_path(path)?;
        let mut entries = Vec::new();
        let mut marker: Option<String> = None;

        loop {
            let request = MantaApiOperations::build_list_directory_request(
                self.http.request(),
                path,
                self.page_size,
                marker.as_deref(),
            );
            let (_, page) = self
                .execute("list_directory", request, |response| {
                    MantaApiOperations::parse_listing_response(response, "list_directory")
                })
                .await
                .map_err(|e| not_found_or(path, e))?;

            let page_len = page.len();
            let last = page.last().map(|entry| entry.name.clone());
            let before = entries.len();
            entries.extend(page.into_iter().filter(|entry| Some(&entry.name) != marker.as_ref()));

            if page_len < self.page_size as usize || entries.len() == before {
                break;
            }
            match last {
                Some(name) if Some(&name) != marker.as_ref() => marker = Some(name),
                _ => break,
            }
        }

        debug!(operation = "list_directory", path = %path, entries = entries.len(), "Directory listed");
        Ok(entries)
    }

    async fn delete_directory(&self, path: &str, recursive: bool) -> StorageResult<HeaderMap> {
        validate_path(path)?;
        if recursive {
            self.delete_tree(path).await
        } else {
            self.delete_path("delete_directory", path).await
        }
    }
}
