use clap::{Args, Parser, Subcommand};
use manta_job_interface::Phase;

pub mod manta;
pub mod poll;

pub use manta::MantaCliArgs;
pub use poll::PollCliArgs;

#[derive(Parser, Debug)]
#[command(
    name = "manta-jobs",
    about = "Create, feed, wait for and inspect Manta compute jobs",
    after_help = "Examples:\n  \
    manta-jobs run --phase 'map:grep bb' --phase 'reduce:sort | uniq' /acct/stor/words.txt\n  \
    manta-jobs outputs <job-id> --archived\n  \
    manta-jobs cat /acct/jobs/<job-id>/stor/reduce.1.<uuid>\n\n\
    Output is JSON on stdout, logs go to stderr."
)]
pub struct Cli {
    #[command(flatten)]
    pub manta_args: MantaCliArgs,

    #[command(flatten)]
    pub poll_args: PollCliArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct JobDefinition {
    /// Job name.
    #[arg(long, default_value = "manta-jobs")]
    pub name: String,

    /// Phase as `map:<command>` or `reduce:<command>`, repeated in execution order.
    #[arg(long = "phase", required = true)]
    pub phases: Vec<Phase>,
}

#[derive(Args, Debug, Clone)]
pub struct ResultArgs {
    pub job_id: String,

    /// Read the archived results instead of the live view.
    #[arg(long)]
    pub archived: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a job
    Create {
        #[command(flatten)]
        job: JobDefinition,
    },
    /// Attach input object paths to a job
    AddInputs {
        job_id: String,
        #[arg(required = true)]
        inputs: Vec<String>,
    },
    /// Signal that no more inputs will be added
    EndInput { job_id: String },
    /// Cancel a job
    Cancel { job_id: String },
    /// Print the state of a job
    State { job_id: String },
    /// Print the full status document of a job
    Status { job_id: String },
    /// Wait until a job leaves the queued and running states
    Wait { job_id: String },
    /// List the jobs of the account
    List,
    /// Print the input paths of a job
    Inputs(ResultArgs),
    /// Print the output paths of a job
    Outputs(ResultArgs),
    /// Print the inputs whose tasks failed
    Failures(ResultArgs),
    /// Print the error records of a job
    Errors(ResultArgs),
    /// Print the content of an object
    Cat { path: String },
    /// Create a job, add inputs, end input, wait and print the outputs
    Run {
        #[command(flatten)]
        job: JobDefinition,
        #[arg(required = true)]
        inputs: Vec<String>,
        /// Read outputs from the archive once the job is done.
        #[arg(long)]
        archived: bool,
    },
}
