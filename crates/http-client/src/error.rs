use manta_job_interface::{JobClientError, RemoteError, StorageError};
use manta_utils::http_client::HttpClientError;
use reqwest::StatusCode;

use crate::types::ErrorDocument;

#[derive(Debug, thiserror::Error)]
pub enum MantaError {
    /// Transport failures that produced no response (timeouts, refused connections, etc.)
    #[error("Network error during {operation}: {message}")]
    NetworkError { operation: String, message: String },

    /// The service answered with a non-success status
    #[error(transparent)]
    ApiError(#[from] RemoteError),

    /// Malformed response bodies
    #[error("Failed to parse response during {operation}: {message}")]
    ParseError { operation: String, message: String },

    /// The request could not be built or signed
    #[error("Failed to build request for {operation}: {message}")]
    RequestError { operation: String, message: String },
}

impl MantaError {
    /// Get error type as a string for metrics
    pub fn error_type(&self) -> &'static str {
        match self {
            MantaError::NetworkError { .. } => "network_error",
            MantaError::ApiError(_) => "api_error",
            MantaError::ParseError { .. } => "parse_error",
            MantaError::RequestError { .. } => "request_error",
        }
    }

    /// Classify a failure of the underlying http client
    pub fn from_http_client_error(operation: impl Into<String>, source: HttpClientError) -> Self {
        let operation = operation.into();
        match source {
            HttpClientError::Send(source) => Self::from_reqwest_error(operation, source),
            other => MantaError::RequestError { operation, message: other.to_string() },
        }
    }

    pub fn from_reqwest_error(operation: impl Into<String>, source: reqwest::Error) -> Self {
        let operation = operation.into();
        let message = if source.is_timeout() {
            "request timed out".to_string()
        } else if source.is_connect() {
            format!("connection failed: {}", source)
        } else if source.is_decode() || source.is_body() {
            return MantaError::ParseError { operation, message: source.to_string() };
        } else {
            format!("request failed: {}", source)
        };
        MantaError::NetworkError { operation, message }
    }

    pub fn parse_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        MantaError::ParseError { operation: operation.into(), message: message.into() }
    }

    pub fn request_error(operation: impl Into<String>, message: impl Into<String>) -> Self {
        MantaError::RequestError { operation: operation.into(), message: message.into() }
    }

    /// Keeps the raw body and, when it is a JSON error document, its `code` and `message`
    pub fn from_http_error_response(operation: impl Into<String>, status: StatusCode, body: String) -> Self {
        let document = ErrorDocument::from_body(&body);
        MantaError::ApiError(RemoteError {
            operation: operation.into(),
            status,
            code: document.code,
            message: document.message,
            body,
        })
    }

    pub fn status(&self) -> Option<StatusCode> {
        match self {
            MantaError::ApiError(remote) => Some(remote.status),
            _ => None,
        }
    }
}

impl From<MantaError> for JobClientError {
    fn from(value: MantaError) -> Self {
        match value {
            MantaError::NetworkError { operation, message } => JobClientError::NetworkError { operation, message },
            MantaError::ApiError(remote) => JobClientError::RemoteRequest(remote),
            MantaError::ParseError { operation, message } => JobClientError::ParseError { operation, message },
            MantaError::RequestError { operation, message } => {
                JobClientError::NetworkError { operation, message: format!("request not sent: {message}") }
            }
        }
    }
}

impl From<MantaError> for StorageError {
    fn from(value: MantaError) -> Self {
        match value {
            MantaError::NetworkError { operation, message } => StorageError::NetworkError { operation, message },
            MantaError::ApiError(remote) => StorageError::Remote(remote),
            MantaError::ParseError { operation, message } => StorageError::ParseError { operation, message },
            MantaError::RequestError { operation, message } => {
                StorageError::NetworkError { operation, message: format!("request not sent: {message}") }
            }
        }
    }
}
