pub mod error;
pub mod types;

use async_trait::async_trait;
use bytes::Bytes;
use http::HeaderMap;
use mockall::automock;

pub use error::{INVALID_JOB_STATE_CODE, JobClientError, JobClientResult, RemoteError, StorageError, StorageResult};
pub use types::{
    CreatedJob, DirectoryEntry, EntryType, ErrorRecord, JobListing, JobSpec, JobState, JobStats, JobStatus, Phase,
    PhaseType, ResultCategory, ResultSource,
};

/// Job API of the storage service. Jobs run remote compute phases over stored objects:
/// - A job is created with its ordered phases and gets a server assigned id
/// - Input object paths are attached in any number of batches until end-of-input
/// - The job moves from `queued`/`running` to a terminal state on its own
/// - Its inputs, outputs, failures and errors are readable live while it runs, and from
///   archived objects once it is done
///
/// Implementations do not retry and hold no state beyond their connection.
#[automock]
#[async_trait]
pub trait JobApi: Send + Sync {
    async fn create_job(&self, spec: &JobSpec) -> JobClientResult<CreatedJob>;
    async fn add_job_inputs(&self, job_id: &str, inputs: &[String]) -> JobClientResult<HeaderMap>;
    async fn end_job_input(&self, job_id: &str) -> JobClientResult<HeaderMap>;
    async fn cancel_job(&self, job_id: &str) -> JobClientResult<HeaderMap>;
    async fn get_job_status(&self, job_id: &str) -> JobClientResult<JobStatus>;
    async fn list_jobs(&self) -> JobClientResult<JobListing>;
    /// Raw newline-delimited body of the live view of `category`
    async fn get_live_records(&self, job_id: &str, category: ResultCategory) -> JobClientResult<String>;
    /// Storage path of the archived object holding `category`
    fn archived_records_path(&self, job_id: &str, category: ResultCategory) -> String;
}

/// Object storage used by the job client to read results and stage inputs.
#[automock]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put_object(&self, data: Bytes, path: &str) -> StorageResult<HeaderMap>;
    async fn get_object(&self, path: &str) -> StorageResult<Bytes>;
    /// Fails with [`StorageError::InvalidUtf8`] when the content is not UTF-8
    async fn get_object_as_string(&self, path: &str) -> StorageResult<String>;
    async fn exists(&self, path: &str) -> StorageResult<bool>;
    async fn delete_object(&self, path: &str) -> StorageResult<HeaderMap>;
    async fn put_directory(&self, path: &str) -> StorageResult<HeaderMap>;
    async fn list_directory(&self, path: &str) -> StorageResult<Vec<DirectoryEntry>>;
    /// With `recursive`, children are removed depth first before the directory itself
    async fn delete_directory(&self, path: &str, recursive: bool) -> StorageResult<HeaderMap>;
}
