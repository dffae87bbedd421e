use manta_http_client::MantaError;
use manta_job_interface::{JobClientError, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Job(#[from] JobClientError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("Failed to set up the Manta client: {0}")]
    Client(#[from] MantaError),

    #[error("Failed to encode output: {0}")]
    Output(#[from] serde_json::Error),
}
