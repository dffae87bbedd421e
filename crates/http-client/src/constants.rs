/// Directory of an account that holds its jobs
pub(crate) const JOBS_DIRECTORY: &str = "jobs";

/// Live sub-resource of a job
pub(crate) const LIVE_SEGMENT: &str = "live";

// Live endpoints under `/<account>/jobs/<id>/live/`
pub(crate) const STATUS_SEGMENT: &str = "status";
pub(crate) const CANCEL_SEGMENT: &str = "cancel";
pub(crate) const INPUT_SEGMENT: &str = "in";
pub(crate) const END_SEGMENT: &str = "end";

/// Content type that turns a PUT into a directory creation
pub(crate) const DIRECTORY_CONTENT_TYPE: &str = "application/json; type=directory";
pub(crate) const OBJECT_CONTENT_TYPE: &str = "application/octet-stream";

/// Entries requested per page of a directory listing
pub const DEFAULT_PAGE_SIZE: u32 = 1000;
/// A page after the first repeats its marker, so one slot is always taken by it
pub const MIN_PAGE_SIZE: u32 = 2;

pub const DEFAULT_TIMEOUT_SECONDS: u64 = 30;

pub(crate) const USER_AGENT: &str = concat!("manta-jobs/", env!("CARGO_PKG_VERSION"));
