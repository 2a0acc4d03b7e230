use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use smp_review::error::AppError;

use crate::seed::run_seed;
use crate::server;

#[derive(Parser, Debug)]
#[command(
    name = "SMP Review Portal",
    about = "Run the SMP peer review portal and its seeding tools from the command line",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Validate a user export CSV and report what serving it would seed
    Seed(SeedArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

#[derive(Args, Debug)]
pub(crate) struct SeedArgs {
    /// Path to the user export CSV
    pub(crate) csv: PathBuf,
    /// Print every seeded account instead of a one-line summary
    #[arg(long)]
    pub(crate) verbose: bool,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Seed(args) => run_seed(args),
    }
}
