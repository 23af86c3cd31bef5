//! Wiring of source, storage and indexing services from configuration

use anyhow::Context;
use gitscope_config::ApplicationConfig;
use gitscope_indexing::{
    AnalysisService, HeuristicScoreCalculator, IndexingOrchestrator, ScoreCalculator,
};
use gitscope_source::{NdjsonSource, ProjectSource};
use gitscope_storage::{
    GroupRepository, InMemoryGroupRepository, InMemoryProjectRepository, PgGroupRepository,
    PgProjectRepository, ProjectRepository,
};
use std::sync::Arc;

pub struct Services {
    pub orchestrator: IndexingOrchestrator,
    pub analysis: AnalysisService,
}

async fn repositories(
    config: &ApplicationConfig,
    in_memory: bool,
) -> anyhow::Result<(Arc<dyn ProjectRepository>, Arc<dyn GroupRepository>)> {
    if in_memory {
        tracing::info!("Using in-memory storage; nothing will be persisted");
        return Ok((
            Arc::new(InMemoryProjectRepository::new()),
            Arc::new(InMemoryGroupRepository::new()),
        ));
    }

    tracing::info!(database = %config.database.safe_connection_string(), "Connecting to database");
    let pool = gitscope_storage::connect(&config.database)
        .await
        .context("Failed to connect to database")?;
    Ok((
        Arc::new(PgProjectRepository::new(pool.clone())),
        Arc::new(PgGroupRepository::new(pool)),
    ))
}

impl Services {
    /// Build the services for one CLI invocation
    ///
    /// # Errors
    /// Fails when the database cannot be reached or migrated
    pub async fn build(config: &ApplicationConfig, in_memory: bool) -> anyhow::Result<Self> {
        let source: Arc<dyn ProjectSource> = Arc::new(NdjsonSource::new(
            config.source.projects_path(),
            config.source.groups_path(),
        ));
        let (projects, groups) = repositories(config, in_memory).await?;
        let scorer: Arc<dyn ScoreCalculator> = Arc::new(HeuristicScoreCalculator);

        let analysis = AnalysisService::new(
            Arc::clone(&projects),
            Arc::clone(&scorer),
            config.indexer.concurrency,
            config.indexer.progress_step_percent,
        );
        let orchestrator = IndexingOrchestrator::new(source, projects, groups, scorer, &config.indexer);

        Ok(Self {
            orchestrator,
            analysis,
        })
    }
}
