#![allow(clippy::print_stdout)]

use std::sync::Arc;

use clap::Parser as _;
use dotenvy::dotenv;
use manta_http_client::{MantaClient, MantaValidatedArgs};
use manta_jobs::{JobOrchestrator, PollPolicy};
use manta_utils::logging::init_logging;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cli::Cli;
use crate::error::CliError;

mod cli;
mod commands;
mod error;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    dotenv().ok();
    init_logging("info")?;

    let cli = Cli::parse();
    match run(cli).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(())
        }
        Err(e) => {
            error!(error = %e, error_chain = ?e, "Command failed");
            Err(e.into())
        }
    }
}

async fn run(cli: Cli) -> Result<serde_json::Value, CliError> {
    let manta_args = MantaValidatedArgs::try_from(cli.manta_args)?;
    let poll_policy = PollPolicy::try_from(cli.poll_args)?;
    info!(url = %manta_args.url, user = %manta_args.user, "Using Manta endpoint");

    let client = Arc::new(MantaClient::new(&manta_args, manta_args.token_authentication())?);
    let orchestrator = JobOrchestrator::new(client.clone(), client.clone(), poll_policy);

    let cancellation = CancellationToken::new();
    let on_interrupt = cancellation.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, stopping the wait");
                on_interrupt.cancel();
            }
            Err(e) => warn!(error = %e, "Failed to listen for ctrl+c"),
        }
    });

    commands::execute(cli.command, &orchestrator, client.as_ref(), &cancellation).await
}
