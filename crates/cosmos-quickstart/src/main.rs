//! CLI entry point for the Cosmos DB Gremlin quickstart.
//!
//! Results go to stdout; logs go to stderr.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use cosmos_core::config::DEFAULT_SETTINGS_FILE;
use cosmos_quickstart::pipeline::{connect, load_settings};
use cosmos_quickstart::{Quickstart, StageError};

#[derive(Parser)]
#[command(name = "cosmos-quickstart")]
#[command(about = "Provision a Cosmos DB graph, seed sample people and print a traversal")]
struct Cli {
    /// Settings file (JSON with an AzureCosmosDb section).
    #[arg(short, long, default_value = DEFAULT_SETTINGS_FILE)]
    settings: PathBuf,

    /// Emit logs as JSON lines.
    #[arg(long)]
    json_logs: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let logs = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if cli.json_logs {
        logs.json().init();
    } else {
        logs.init();
    }

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(stage = ?e.stage, "Quickstart aborted");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<(), StageError> {
    let settings = load_settings(&cli.settings)?;
    let client = connect(&settings)?;

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    Quickstart::new(&client, &settings).run(&mut out).await
}
