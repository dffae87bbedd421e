use http::StatusCode;

use crate::types::JobState;

/// Error code the service uses for requests that do not fit the job's current state
pub const INVALID_JOB_STATE_CODE: &str = "InvalidJobStateError";

pub type JobClientResult<T> = Result<T, JobClientError>;
pub type StorageResult<T> = Result<T, StorageError>;

/// A non-success answer from the service, kept as received.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Remote request {operation} failed with status {status}: {body}")]
pub struct RemoteError {
    pub operation: String,
    pub status: StatusCode,
    /// `code` of the service's JSON error document, when the body is one
    pub code: Option<String>,
    pub message: Option<String>,
    pub body: String,
}

impl RemoteError {
    /// The job rejected the request because of its state, e.g. inputs after end-of-input
    pub fn is_invalid_job_state(&self) -> bool {
        self.status == StatusCode::CONFLICT || self.code.as_deref() == Some(INVALID_JOB_STATE_CODE)
    }

    /// The service's message when it sent one, the raw body otherwise
    pub fn reason(&self) -> &str {
        self.message.as_deref().unwrap_or(&self.body)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Object {path} not found")]
    NotFound { path: String },

    #[error("Object {path} is not valid UTF-8")]
    InvalidUtf8 { path: String },

    #[error("Invalid storage path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("Failed to parse response during {operation}: {message}")]
    ParseError { operation: String, message: String },

    #[error(transparent)]
    Remote(#[from] RemoteError),

    #[error("Network error during {operation}: {message}")]
    NetworkError { operation: String, message: String },
}

/// Error types for the job lifecycle client
#[derive(Debug, thiserror::Error)]
pub enum JobClientError {
    /// Malformed phases or arguments, detected before any request is sent
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    RemoteRequest(#[from] RemoteError),

    /// Inputs were attached after end-of-input
    #[error("Job {job_id} does not accept inputs anymore: {reason}")]
    JobSealed { job_id: String, reason: String },

    /// Attempts ran out while the job was still in progress. This says nothing about
    /// whether the job itself failed.
    #[error("Gave up waiting for job {job_id} after {attempts} attempts, last state was {last_state}")]
    PollTimeout { job_id: String, attempts: u32, last_state: JobState },

    #[error("Waiting for job {job_id} was cancelled")]
    WaitCancelled { job_id: String },

    #[error("Network error during {operation}: {message}")]
    NetworkError { operation: String, message: String },

    #[error("Failed to parse response during {operation}: {message}")]
    ParseError { operation: String, message: String },

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl JobClientError {
    pub fn validation(message: impl Into<String>) -> Self {
        JobClientError::Validation(message.into())
    }

    pub fn parse_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        JobClientError::ParseError { operation: operation.into(), message: message.into() }
    }

    pub fn network_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        JobClientError::NetworkError { operation: operation.into(), message: message.into() }
    }

    /// Get error type as a string for metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            JobClientError::Validation(_) => "validation_error",
            JobClientError::RemoteRequest(_) => "api_error",
            JobClientError::JobSealed { .. } => "job_sealed",
            JobClientError::PollTimeout { .. } => "poll_timeout",
            JobClientError::WaitCancelled { .. } => "wait_cancelled",
            JobClientError::NetworkError { .. } => "network_error",
            JobClientError::ParseError { .. } => "parse_error",
            JobClientError::Storage(_) => "storage_error",
        }
    }
}
