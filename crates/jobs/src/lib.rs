//! Job lifecycle client for Manta compute jobs.
//!
//! - [`submitter::JobSubmitter`] creates jobs, adds inputs, ends input and cancels
//! - [`poller::JobPoller`] waits for a job to reach a terminal state
//! - [`resolver::ResultResolver`] reads live or archived inputs, outputs, failures and errors
//! - [`orchestrator::JobOrchestrator`] composes them and exposes the job client operations
//!
//! All of them talk to the service through [`manta_job_interface::JobApi`] and read objects
//! through [`manta_job_interface::ObjectStore`].

pub mod metrics;
pub mod orchestrator;
pub mod poller;
pub mod resolver;
pub mod submitter;

pub use orchestrator::{JobOrchestrator, JobRun};
pub use poller::{JobPoller, PollPolicy, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};
pub use resolver::{ResolvedResults, ResultResolver};
pub use submitter::JobSubmitter;
