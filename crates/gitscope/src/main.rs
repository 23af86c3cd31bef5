//! gitscope command-line entry point

mod commands;
mod services;

use crate::commands::Command;
use anyhow::Context;
use clap::Parser;
use gitscope_common::{TracingOptions, init_tracing, initialize_environment};
use gitscope_config::source::{ConfigurationLoader, EnvironmentSource, TomlFileSource};
use gitscope_config::ApplicationConfig;
use std::path::PathBuf;

/// gitscope indexer
///
/// Catalogs projects and groups from a source-control export and scores them
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Optional configuration file (TOML); `GITSCOPE_*` variables still override it
    #[arg(long, short = 'c', global = true)]
    config_file: Option<PathBuf>,

    /// Keep indexed entities in memory instead of PostgreSQL (dry run)
    #[arg(long, global = true)]
    in_memory: bool,

    /// Log directory path; overrides the configured one
    #[arg(long, global = true)]
    log_dir: Option<PathBuf>,
}

fn load_config(args: &Args) -> anyhow::Result<ApplicationConfig> {
    let mut loader = ConfigurationLoader::new();
    if let Some(path) = &args.config_file {
        anyhow::ensure!(path.exists(), "Config file '{}' does not exist", path.display());
        loader = loader.add_source(Box::new(TomlFileSource::new(path)));
    }
    let loader = loader.add_source(Box::new(EnvironmentSource));

    let mut config = loader.load().context("Invalid configuration")?;
    if let Some(log_dir) = &args.log_dir {
        config.telemetry.log_dir = Some(log_dir.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    initialize_environment();
    let args = Args::parse();
    let config = load_config(&args)?;

    let _guards = init_tracing(&TracingOptions {
        level: config.telemetry.tracing_level.clone(),
        json: config.telemetry.json_logs,
        log_dir: config.telemetry.log_dir.clone(),
        ..TracingOptions::default()
    })
    .map_err(|e| anyhow::anyhow!("Failed to initialize tracing: {e}"))?;

    commands::run(args.command, &config, args.in_memory).await
}
