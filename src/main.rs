use clap::Parser;
use dotenv::dotenv;
use snapshot_pruner::cli::Cli;
use snapshot_pruner::config::Settings;
use snapshot_pruner::prelude::*;
use snapshot_pruner::pruner::{PruneOptions, Pruner};
use snapshot_pruner::snapshot::GcloudSnapshots;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const EXIT_FATAL: u8 = 1;
const EXIT_PARTIAL: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv().ok();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::from(EXIT_FATAL)
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    init_tracing();

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("Snapshot pruning aborted: {}", e);
            eprintln!("Error: {}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let now = cli.reference_time()?;
    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())?;
    info!("Pruning snapshots in project {} as of {}", settings.project, now);

    if cli.dry_run {
        println!("Dry run: no snapshots will be deleted");
        println!("{}", settings);
        println!("Reference time: {}", now.to_rfc3339());
    }

    let gcloud = Arc::new(GcloudSnapshots::new(&settings.gcloud.binary));
    let options = PruneOptions::from_settings(&settings, now, cli.dry_run);
    let report = Pruner::new(gcloud.clone(), gcloud, options).run().await?;

    for line in report.lines() {
        println!("{}", line);
    }
    if report.dry_run {
        eprintln!("Dry run: {} snapshot(s) would be deleted", report.expired());
    }

    if report.has_failures() {
        for failure in &report.failures {
            eprintln!("Error: {}", failure);
        }
        eprintln!(
            "{} of {} deletions failed",
            report.failures.len(),
            report.failures.len() + report.deleted.len()
        );
        return Ok(ExitCode::from(EXIT_PARTIAL));
    }

    Ok(ExitCode::SUCCESS)
}
