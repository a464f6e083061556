//! flowprobe command line
//!
//! Usage:
//!   flowprobe run [--config FILE] [--json-logs]
//!   flowprobe health [--config FILE]
//!   flowprobe discover [--config FILE]
//!
//! A failed run still exits 0; only an unusable configuration does not.

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use flowprobe_config::{ConfigLoader, HarnessConfig};
use flowprobe_logger::Logger;
use flowprobe_runtime::{oracle, FlowRunner, MemoryOracle};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Register, verify, log in, post a product and audit it
    Run(CommonArgs),

    /// Probe the backend, frontend and dashboard origins
    Health(CommonArgs),

    /// Find which registration path the backend accepts
    Discover(CommonArgs),
}

#[derive(Args)]
struct CommonArgs {
    /// YAML or JSON configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Emit log lines as JSON
    #[arg(long)]
    json_logs: bool,
}

fn load_config(path: Option<&PathBuf>) -> Result<HarnessConfig> {
    let mut config = match path {
        Some(path) => ConfigLoader::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => HarnessConfig::default(),
    };
    ConfigLoader::apply_process_env(&mut config);
    ConfigLoader::validate(&config)?;
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let (Command::Run(args) | Command::Health(args) | Command::Discover(args)) =
        &cli.command;

    Logger::init_tracing(args.json_logs);
    let config = load_config(args.config.as_ref())?;

    match cli.command {
        Command::Run(_) => {
            let oracle = oracle::from_config(&config)
                .context("Failed to set up the state oracle")?;
            let summary = FlowRunner::new(config, oracle).run().await;
            tracing::info!(
                trace_id = %summary.trace_id,
                identity = %summary.identity,
                completed = summary.completed,
                halted_at = summary.halted_at.as_deref().unwrap_or("-"),
                successes = summary.successes,
                warnings = summary.warnings,
                errors = summary.errors,
                "run finished"
            );
        }
        Command::Health(_) => {
            let runner = FlowRunner::new(config, Arc::new(MemoryOracle::new()));
            let reports = runner.check_health().await;
            let up = reports.iter().filter(|r| r.is_up()).count();
            tracing::info!(up, total = reports.len(), "health check finished");
        }
        Command::Discover(_) => {
            let runner = FlowRunner::new(config, Arc::new(MemoryOracle::new()));
            if let Some(found) = runner.discover_registration().await {
                tracing::info!(path = %found.path, status = found.status, "registration endpoint found");
            }
        }
    }

    Ok(())
}
