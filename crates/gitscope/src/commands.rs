//! Subcommands

use anyhow::Context;
use clap::Subcommand;
use gitscope_config::ApplicationConfig;
use gitscope_indexing::{
    IndexingError, IndexingOrchestrator, IndexingService, RunHandle, RunReport, TerminalCause,
};

use crate::services::Services;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Index every project from the source
    Reindex {
        /// Derive groups once the project run completes
        #[arg(long)]
        with_groups: bool,
    },
    /// Re-index a single project (does not wait for a running full index)
    ReindexProject { id: i64 },
    /// Derive groups from the indexed projects
    ReindexGroups,
    /// Re-derive a single group
    ReindexGroup { id: i64 },
    /// Re-score every indexed project
    Analyze,
    /// Print the effective configuration as TOML
    ShowConfig,
}

/// Run `command` against freshly built services
///
/// # Errors
/// Fails on configuration, connection or indexing errors, and when a full run
/// ends with a failure
pub async fn run(command: Command, config: &ApplicationConfig, in_memory: bool) -> anyhow::Result<()> {
    if let Command::ShowConfig = command {
        println!("{}", config.to_toml()?);
        return Ok(());
    }

    let services = Services::build(config, in_memory).await?;
    let orchestrator = &services.orchestrator;

    match command {
        Command::Reindex { with_groups } => {
            let report = follow(orchestrator, orchestrator.reindex_all().await?).await?;
            if with_groups && report.is_completed() {
                follow(orchestrator, orchestrator.reindex_groups().await?).await?;
            }
        }
        Command::ReindexProject { id } => {
            let entity = orchestrator.reindex_one(id).await.map_err(explain)?;
            println!(
                "{} (id={}): activity={} criticality={} score={:.1}",
                entity.full_name,
                entity.id,
                entity.scores.activity,
                entity.scores.criticality,
                entity.scores.total
            );
        }
        Command::ReindexGroups => {
            follow(orchestrator, orchestrator.reindex_groups().await?).await?;
        }
        Command::ReindexGroup { id } => {
            let entity = orchestrator.reindex_group(id).await.map_err(explain)?;
            println!(
                "{} (id={}): projects={} stars={} criticality={}",
                entity.full_name,
                entity.id,
                entity.group.project_count,
                entity.stars,
                entity.group.scores.criticality
            );
        }
        Command::Analyze => {
            let report = services.analysis.analyze_all().await.context("Analysis failed")?;
            println!(
                "analyzed {} of {} projects ({} failed) in {:.2?}",
                report.progress.succeeded, report.progress.total, report.progress.failed, report.elapsed
            );
        }
        Command::ShowConfig => {}
    }
    Ok(())
}

fn explain(error: IndexingError) -> anyhow::Error {
    match error {
        IndexingError::Excluded { kind, id, reason } => {
            anyhow::anyhow!("{kind} {id} does not qualify for indexing: {reason}")
        }
        other => other.into(),
    }
}

/// Wait for a run, translating Ctrl-C into forced stops
///
/// The first interrupt lets in-flight items finish; a second abandons them.
async fn follow(orchestrator: &IndexingOrchestrator, handle: RunHandle) -> anyhow::Result<RunReport> {
    let mut interrupts = 0_u8;
    let report = loop {
        tokio::select! {
            report = handle.wait() => break report,
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for Ctrl-C")?;
                interrupts = interrupts.saturating_add(1);
                let immediately = interrupts > 1;
                tracing::warn!(run_id = %handle.run_id(), immediately, "Interrupted, stopping indexing");
                orchestrator.forcibly_stop(immediately);
            }
        }
    };

    println!("{report}");
    match &report.cause {
        TerminalCause::Failed(message) => anyhow::bail!("Indexing failed: {message}"),
        TerminalCause::Completed | TerminalCause::ForciblyStopped { .. } => Ok(report),
    }
}
