use std::time::Duration;

use clap::Args;
use manta_http_client::constants::DEFAULT_TIMEOUT_SECONDS;
use manta_http_client::MantaValidatedArgs;
use url::Url;

use crate::error::CliError;

/// Parameters used to reach Manta.
#[derive(Debug, Clone, Args)]
pub struct MantaCliArgs {
    /// The URL of the Manta endpoint.
    #[arg(env = "MANTA_URL", long)]
    pub manta_url: Url,

    /// The account that owns the jobs.
    #[arg(env = "MANTA_USER", long)]
    pub manta_user: String,

    /// The sub-user to authenticate as.
    #[arg(env = "MANTA_SUBUSER", long)]
    pub manta_subuser: Option<String>,

    /// The fingerprint of the signing key.
    #[arg(env = "MANTA_KEY_ID", long)]
    pub manta_key_id: Option<String>,

    /// Token sent as `Authorization: Token <token>`.
    #[arg(env = "MANTA_AUTH_TOKEN", long, hide_env_values = true)]
    pub manta_auth_token: Option<String>,

    /// Per request timeout in seconds.
    #[arg(env = "MANTA_TIMEOUT_SECONDS", long, default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    pub manta_timeout_seconds: u64,
}

impl TryFrom<MantaCliArgs> for MantaValidatedArgs {
    type Error = CliError;

    fn try_from(args: MantaCliArgs) -> Result<Self, Self::Error> {
        if args.manta_user.trim().is_empty() {
            return Err(CliError::InvalidArgument("Manta user is required".to_string()));
        }
        if args.manta_timeout_seconds == 0 {
            return Err(CliError::InvalidArgument("Manta timeout must be at least one second".to_string()));
        }
        // Signing keys are not loaded by this binary
        if args.manta_key_id.is_some() && args.manta_auth_token.is_none() {
            return Err(CliError::InvalidArgument(
                "MANTA_KEY_ID needs a request signer, which this binary does not provide; set MANTA_AUTH_TOKEN"
                    .to_string(),
            ));
        }

        Ok(MantaValidatedArgs {
            url: args.manta_url,
            user: args.manta_user,
            subuser: args.manta_subuser.filter(|subuser| !subuser.trim().is_empty()),
            key_id: args.manta_key_id,
            auth_token: args.manta_auth_token.filter(|token| !token.is_empty()),
            timeout: Duration::from_secs(args.manta_timeout_seconds),
        })
    }
}
