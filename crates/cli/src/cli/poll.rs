use std::time::Duration;

use clap::Args;
use manta_jobs::{PollPolicy, DEFAULT_POLL_ATTEMPTS, DEFAULT_POLL_INTERVAL};

use crate::error::CliError;

/// Parameters used when waiting for a job.
#[derive(Debug, Clone, Args)]
pub struct PollCliArgs {
    /// Maximum number of status queries.
    #[arg(env = "MANTA_POLL_ATTEMPTS", long, default_value_t = DEFAULT_POLL_ATTEMPTS)]
    pub poll_attempts: u32,

    /// Seconds between status queries.
    #[arg(env = "MANTA_POLL_INTERVAL_SECONDS", long, default_value_t = DEFAULT_POLL_INTERVAL.as_secs())]
    pub poll_interval_seconds: u64,
}

impl TryFrom<PollCliArgs> for PollPolicy {
    type Error = CliError;

    fn try_from(args: PollCliArgs) -> Result<Self, Self::Error> {
        if args.poll_attempts == 0 {
            return Err(CliError::InvalidArgument("poll attempts must be at least 1".to_string()));
        }
        Ok(PollPolicy::new(args.poll_attempts, Duration::from_secs(args.poll_interval_seconds)))
    }
}
