//! Re-scoring of already indexed projects

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use gitscope_model::{ProjectEntity, ProjectRecord, Scores};
use gitscope_storage::{ProjectRepository, StorageError};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::IndexingResult;
use crate::progress::{LoggingProgressMonitor, ProgressMonitor, ProgressSnapshot};
use crate::scoring::{ScoreCalculator, ScoringError};

/// Outcome of one `analyze_all` pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnalysisReport {
    pub progress: ProgressSnapshot,
    pub elapsed: Duration,
}

pub struct AnalysisService {
    repository: Arc<dyn ProjectRepository>,
    scorer: Arc<dyn ScoreCalculator>,
    concurrency: usize,
    progress_step_percent: u8,
}

impl AnalysisService {
    pub fn new(
        repository: Arc<dyn ProjectRepository>,
        scorer: Arc<dyn ScoreCalculator>,
        concurrency: usize,
        progress_step_percent: u8,
    ) -> Self {
        Self {
            repository,
            scorer,
            concurrency: concurrency.max(1),
            progress_step_percent,
        }
    }

    /// Score a single project as of now
    ///
    /// # Errors
    /// Returns `ScoringError` when the snapshot cannot be scored.
    pub fn analyze(&self, project: &ProjectRecord) -> Result<Scores, ScoringError> {
        tracing::debug!(project_id = project.id, name = %project.full_name, "Calculating scores");
        self.scorer.calculate(project, Utc::now())
    }

    async fn rescore(&self, entity: ProjectEntity, now: DateTime<Utc>) -> IndexingResult<()> {
        let scores = self.scorer.calculate(&entity.project, now)?;
        self.repository.upsert(&entity.with_scores(scores)).await?;
        Ok(())
    }

    /// Re-score and persist every indexed project
    ///
    /// Failures of single projects are logged and counted. The storage stream
    /// is dropped on every exit path.
    ///
    /// # Errors
    /// Returns the storage error when counting fails or the stream itself
    /// breaks.
    pub async fn analyze_all(&self) -> IndexingResult<AnalysisReport> {
        let started = Instant::now();
        let now = Utc::now();
        let total = self.repository.count_all().await?;
        let monitor = LoggingProgressMonitor::new(total, self.progress_step_percent);
        tracing::info!(total, "Starting analysis");

        self.repository
            .stream_all_for_scoring()
            .try_for_each_concurrent(self.concurrency, |entity| {
                let monitor = &monitor;
                async move {
                    let (id, name) = (entity.id, entity.full_name.clone());
                    match self.rescore(entity, now).await {
                        Ok(()) => monitor.success(),
                        Err(e) => {
                            tracing::error!(project_id = id, %name, error = %e, "Failed to analyze project");
                            monitor.failure();
                        }
                    }
                    Ok::<(), StorageError>(())
                }
            })
            .await?;

        let report = AnalysisReport {
            progress: monitor.snapshot(),
            elapsed: started.elapsed(),
        };
        tracing::info!(
            succeeded = report.progress.succeeded,
            failed = report.progress.failed,
            elapsed_ms = u64::try_from(report.elapsed.as_millis()).unwrap_or(u64::MAX),
            "Analysis finished"
        );
        Ok(report)
    }
}
