//! pulse-ingest: load the configured CSV datasets into a SQL database.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use pulse_ingest::{connect_destination, init_tracing, AppConfig, FileSource, ImportRunner};

#[derive(Debug, Parser)]
#[command(name = "pulse-ingest", version, about = "Import CSV datasets into a SQL database")]
struct CliArgs {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Default log filter when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = CliArgs::parse();
    init_tracing(&args.log);

    let config = match AppConfig::load(args.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config: {e}");
            return ExitCode::FAILURE;
        }
    };

    let jobs = match config.jobs() {
        Ok(jobs) if jobs.is_empty() => {
            eprintln!("Error: no datasets configured");
            return ExitCode::FAILURE;
        }
        Ok(jobs) => jobs,
        Err(e) => {
            eprintln!("Invalid dataset configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    let destination = match connect_destination(&config.database_url, &config.connect_options()).await {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Failed to connect destination: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!("Starting import of {} dataset(s)", jobs.len());

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, stopping after the current batch");
            signal_token.cancel();
        }
    });

    let runner = ImportRunner::new(Arc::new(FileSource::new()), destination).with_cancellation(cancel);
    let reports = runner.run_all(jobs).await;

    match serde_json::to_string_pretty(&reports) {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Failed to render reports: {e}"),
    }

    if reports.iter().all(|r| r.is_success()) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
