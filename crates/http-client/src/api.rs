//! Manta API operations layer
//!
//! Request building and response parsing for the job and object endpoints. Nothing here
//! sends a request or records metrics; [`crate::client::MantaClient`] does both.
//!
//! ```text
//! ┌─────────────────────────────┐
//! │      Client Layer           │  ← Metrics, trait implementations, paging
//! ├─────────────────────────────┤
//! │     API Layer (here)        │  ← Request building, response parsing
//! ├─────────────────────────────┤
//! │    Transport Layer          │  ← Authentication headers
//! └─────────────────────────────┘
//! ```
//!
//! | Operation | Build Method | Parse Method |
//! |-----------|--------------|--------------|
//! | Create job | `build_create_job_request` | `parse_create_job_response` |
//! | Add inputs | `build_add_inputs_request` | `parse_headers_response` |
//! | End input | `build_end_input_request` | `parse_headers_response` |
//! | Cancel job | `build_cancel_job_request` | `parse_headers_response` |
//! | Job status | `build_job_status_request` | `parse_job_status_response` |
//! | List jobs | `build_list_jobs_request` | `parse_listing_response` |
//! | Live records | `build_live_records_request` | `parse_text_response` |
//! | Put object | `build_put_object_request` | `parse_headers_response` |
//! | Get object | `build_get_object_request` | `parse_bytes_response` |
//! | Head object | `build_head_object_request` | `parse_exists_response` |
//! | Delete object | `build_delete_request` | `parse_headers_response` |
//! | Put directory | `build_put_directory_request` | `parse_headers_response` |
//! | List directory | `build_list_directory_request` | `parse_listing_response` |

use bytes::Bytes;
use manta_job_interface::{CreatedJob, DirectoryEntry, JobSpec, JobStatus, ResultCategory};
use manta_utils::http_client::{extract_http_error_text, RequestBuilder};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE, LOCATION};
use reqwest::{Method, Response, StatusCode};
use tracing::debug;

use crate::constants::{
    CANCEL_SEGMENT, DIRECTORY_CONTENT_TYPE, END_SEGMENT, INPUT_SEGMENT, JOBS_DIRECTORY, LIVE_SEGMENT,
    OBJECT_CONTENT_TYPE, STATUS_SEGMENT,
};
use crate::error::MantaError;

/// Manta API operations - request building and response parsing
pub struct MantaApiOperations;

impl MantaApiOperations {
    fn job_live<'a>(builder: RequestBuilder<'a>, account: &str, job_id: &str) -> RequestBuilder<'a> {
        builder.path(account).path(JOBS_DIRECTORY).path(job_id).path(LIVE_SEGMENT)
    }

    async fn error_response(response: Response, operation: &str) -> MantaError {
        let (error_text, status) = extract_http_error_text(response, operation).await;
        debug!(
            operation = operation,
            status = %status,
            error = %error_text,
            "Request failed"
        );
        MantaError::from_http_error_response(operation, status, error_text)
    }

    // ==================== JOBS ====================

    /// `POST /<account>/jobs` with the phases as JSON
    pub fn build_create_job_request<'a>(
        builder: RequestBuilder<'a>,
        account: &str,
        spec: &JobSpec,
    ) -> Result<RequestBuilder<'a>, MantaError> {
        debug!(
            operation = "create_job",
            name = %spec.name,
            phases = spec.phases.len(),
            "Building create job request"
        );

        builder
            .method(Method::POST)
            .path(account)
            .path(JOBS_DIRECTORY)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
            .body(spec)
            .map_err(|e| MantaError::request_error("create_job", e.to_string()))
    }

    /// The job id is the last segment of the `Location` header
    pub async fn parse_create_job_response(response: Response) -> Result<CreatedJob, MantaError> {
        let operation = "create_job";
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }

        let headers = response.headers().clone();
        let location = headers
            .get(LOCATION)
            .ok_or_else(|| MantaError::parse_error(operation, "response has no location header"))?
            .to_str()
            .map_err(|e| MantaError::parse_error(operation, e.to_string()))?
            .to_string();
        let job_id = job_id_from_location(&location)
            .ok_or_else(|| MantaError::parse_error(operation, format!("no job id in location {location:?}")))?;

        debug!(
            operation = operation,
            status = %status,
            job_id = %job_id,
            location = %location,
            "Job created"
        );

        Ok(CreatedJob { job_id, location, headers })
    }

    /// Inputs are sent as one path per line
    pub fn build_add_inputs_request<'a>(
        builder: RequestBuilder<'a>,
        account: &str,
        job_id: &str,
        inputs: &[String],
    ) -> RequestBuilder<'a> {
        debug!(operation = "add_job_inputs", job_id = %job_id, inputs = inputs.len(), "Building add inputs request");

        Self::job_live(builder, account, job_id).method(Method::POST).path(INPUT_SEGMENT).text_body(inputs.join("\n"))
    }

    pub fn build_end_input_request<'a>(builder: RequestBuilder<'a>, account: &str, job_id: &str) -> RequestBuilder<'a> {
        debug!(operation = "end_job_input", job_id = %job_id, "Building end input request");

        Self::job_live(builder, account, job_id).method(Method::POST).path(INPUT_SEGMENT).path(END_SEGMENT)
    }

    pub fn build_cancel_job_request<'a>(builder: RequestBuilder<'a>, account: &str, job_id: &str) -> RequestBuilder<'a> {
        debug!(operation = "cancel_job", job_id = %job_id, "Building cancel request");

        Self::job_live(builder, account, job_id).method(Method::POST).path(CANCEL_SEGMENT)
    }

    pub fn build_job_status_request<'a>(builder: RequestBuilder<'a>, account: &str, job_id: &str) -> RequestBuilder<'a> {
        Self::job_live(builder, account, job_id)
            .method(Method::GET)
            .path(STATUS_SEGMENT)
            .header(ACCEPT, HeaderValue::from_static("application/json"))
    }

    pub async fn parse_job_status_response(response: Response) -> Result<JobStatus, MantaError> {
        let operation = "get_job_status";
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }

        let job_status: JobStatus =
            response.json().await.map_err(|e| MantaError::parse_error(operation, e.to_string()))?;

        debug!(
            operation = operation,
            status = %status,
            job_id = %job_status.id,
            state = %job_status.state,
            cancelled = job_status.cancelled,
            "Job status parsed successfully"
        );

        Ok(job_status)
    }

    pub fn build_list_jobs_request<'a>(builder: RequestBuilder<'a>, account: &str) -> RequestBuilder<'a> {
        builder.method(Method::GET).path(account).path(JOBS_DIRECTORY)
    }

    /// `GET /<account>/jobs/<id>/live/{in,out,fail,err}`
    pub fn build_live_records_request<'a>(
        builder: RequestBuilder<'a>,
        account: &str,
        job_id: &str,
        category: ResultCategory,
    ) -> RequestBuilder<'a> {
        debug!(operation = "get_live_records", job_id = %job_id, category = %category, "Building live records request");

        Self::job_live(builder, account, job_id).method(Method::GET).path(category.live_segment())
    }

    // ==================== OBJECTS ====================

    pub fn build_put_object_request<'a>(builder: RequestBuilder<'a>, path: &str, data: Bytes) -> RequestBuilder<'a> {
        debug!(operation = "put_object", path = %path, bytes = data.len(), "Building put object request");

        builder
            .method(Method::PUT)
            .object_path(path)
            .header(CONTENT_TYPE, HeaderValue::from_static(OBJECT_CONTENT_TYPE))
            .bytes_body(data)
    }

    pub fn build_get_object_request<'a>(builder: RequestBuilder<'a>, path: &str) -> RequestBuilder<'a> {
        builder.method(Method::GET).object_path(path)
    }

    pub fn build_head_object_request<'a>(builder: RequestBuilder<'a>, path: &str) -> RequestBuilder<'a> {
        builder.method(Method::HEAD).object_path(path)
    }

    /// Deletes an object or an empty directory
    pub fn build_delete_request<'a>(builder: RequestBuilder<'a>, path: &str) -> RequestBuilder<'a> {
        builder.method(Method::DELETE).object_path(path)
    }

    pub fn build_put_directory_request<'a>(builder: RequestBuilder<'a>, path: &str) -> RequestBuilder<'a> {
        builder
            .method(Method::PUT)
            .object_path(path)
            .header(CONTENT_TYPE, HeaderValue::from_static(DIRECTORY_CONTENT_TYPE))
    }

    pub fn build_list_directory_request<'a>(
        builder: RequestBuilder<'a>,
        path: &str,
        limit: u32,
        marker: Option<&str>,
    ) -> RequestBuilder<'a> {
        let builder = builder.method(Method::GET).object_path(path).query_param("limit", &limit.to_string());
        match marker {
            Some(marker) => builder.query_param("marker", marker),
            None => builder,
        }
    }

    // ==================== SHARED PARSERS ====================

    /// Success responses whose body carries nothing of interest
    pub async fn parse_headers_response(response: Response, operation: &str) -> Result<HeaderMap, MantaError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }
        debug!(operation = operation, status = %status, "Request succeeded");
        Ok(response.headers().clone())
    }

    pub async fn parse_text_response(response: Response, operation: &str) -> Result<String, MantaError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }
        let text = response.text().await.map_err(|e| MantaError::from_reqwest_error(operation, e))?;
        debug!(operation = operation, status = %status, bytes = text.len(), "Text response received");
        Ok(text)
    }

    pub async fn parse_bytes_response(response: Response, operation: &str) -> Result<Bytes, MantaError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }
        let bytes = response.bytes().await.map_err(|e| MantaError::from_reqwest_error(operation, e))?;
        debug!(operation = operation, status = %status, bytes = bytes.len(), "Object received");
        Ok(bytes)
    }

    /// `404` means the object is absent; other failures are errors
    pub async fn parse_exists_response(response: Response, operation: &str) -> Result<bool, MantaError> {
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }
        Ok(true)
    }

    /// Directory listings are newline-delimited JSON entries. Returns the headers with them.
    pub async fn parse_listing_response(
        response: Response,
        operation: &str,
    ) -> Result<(HeaderMap, Vec<DirectoryEntry>), MantaError> {
        let status = response.status();
        if !status.is_success() {
            return Err(Self::error_response(response, operation).await);
        }
        let headers = response.headers().clone();
        let body = response.text().await.map_err(|e| MantaError::from_reqwest_error(operation, e))?;
        let entries = parse_listing(&body).map_err(|e| MantaError::parse_error(operation, e.to_string()))?;

        debug!(operation = operation, status = %status, entries = entries.len(), "Listing parsed successfully");
        Ok((headers, entries))
    }
}

/// Last non-empty segment of `/<account>/jobs/<id>`
pub fn job_id_from_location(location: &str) -> Option<String> {
    location.rsplit('/').find(|segment| !segment.is_empty()).map(str::to_string)
}

pub fn parse_listing(body: &str) -> Result<Vec<DirectoryEntry>, serde_json::Error> {
    body.lines().filter(|line| !line.trim().is_empty()).map(serde_json::from_str).collect()
}
