//! Project pipeline: source records to scored, persisted project entities

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gitscope_model::{ProjectEntity, ProjectRecord, RecordKind};
use gitscope_source::ProjectSource;
use gitscope_storage::ProjectRepository;
use std::sync::Arc;

use crate::criteria::IndexingCriteria;
use crate::error::{IndexingError, IndexingResult};
use crate::lock::RunHandle;
use crate::observer::RunObserver;
use crate::pipeline::{self, ItemOutcome, ItemProcessor};
use crate::scoring::ScoreCalculator;
use crate::statistics::RunReport;

struct ProjectProcessor {
    criteria: IndexingCriteria,
    repository: Arc<dyn ProjectRepository>,
    scorer: Arc<dyn ScoreCalculator>,
    /// Evaluation instant, fixed for the whole run
    now: DateTime<Utc>,
}

impl ProjectProcessor {
    async fn persist(&self, record: ProjectRecord) -> IndexingResult<ProjectEntity> {
        let scores = self.scorer.calculate(&record, self.now)?;
        let entity = ProjectEntity::from_record(record, scores, Utc::now());
        self.repository.upsert(&entity).await?;
        Ok(entity)
    }
}

#[async_trait]
impl ItemProcessor<ProjectRecord> for ProjectProcessor {
    async fn process(&self, record: ProjectRecord) -> IndexingResult<ItemOutcome> {
        if let Err(reason) = self.criteria.evaluate(&record, self.now) {
            return Ok(ItemOutcome::Excluded(reason));
        }
        self.persist(record).await?;
        Ok(ItemOutcome::Persisted)
    }
}

/// Streams projects from the source, filters them through the criteria and
/// upserts the accepted ones
///
/// The indexer assumes exclusivity was granted by the caller; it does not
/// touch the run lock. Cancellation goes through the [`RunHandle`] passed to
/// [`ProjectIndexer::index_all`].
pub struct ProjectIndexer {
    source: Arc<dyn ProjectSource>,
    repository: Arc<dyn ProjectRepository>,
    scorer: Arc<dyn ScoreCalculator>,
    criteria: IndexingCriteria,
    concurrency: usize,
}

impl ProjectIndexer {
    pub fn new(
        source: Arc<dyn ProjectSource>,
        repository: Arc<dyn ProjectRepository>,
        scorer: Arc<dyn ScoreCalculator>,
        criteria: IndexingCriteria,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            repository,
            scorer,
            criteria,
            concurrency,
        }
    }

    pub const fn criteria(&self) -> &IndexingCriteria {
        &self.criteria
    }

    fn processor(&self) -> ProjectProcessor {
        ProjectProcessor {
            criteria: self.criteria.clone(),
            repository: Arc::clone(&self.repository),
            scorer: Arc::clone(&self.scorer),
            now: Utc::now(),
        }
    }

    /// Index every project the source streams
    ///
    /// Item failures are reported to `observer` and counted; only a
    /// stream-level failure or a stop request on `handle` ends the run early.
    pub async fn index_all(
        &self,
        handle: &RunHandle,
        observer: &dyn RunObserver<ProjectRecord>,
    ) -> RunReport {
        let records = self.source.stream_projects(&self.criteria.project_filter());
        pipeline::execute(
            records,
            Arc::new(self.processor()),
            self.concurrency,
            handle,
            observer,
        )
        .await
    }

    /// Fetch and index exactly one project
    ///
    /// Does not take the run lock; a concurrent full run touching the same
    /// project may overwrite the result, or be overwritten by it.
    ///
    /// # Errors
    /// `NotFound` if the source does not know `id`, `Excluded` if the project
    /// fails the criteria, or the source/scoring/storage error that stopped it.
    pub async fn index_one(&self, id: i64) -> IndexingResult<ProjectEntity> {
        let record = self.source.fetch_project_by_id(id).await?;
        let processor = self.processor();

        processor
            .criteria
            .evaluate(&record, processor.now)
            .map_err(|reason| IndexingError::Excluded {
                kind: RecordKind::Project,
                id,
                reason,
            })?;

        let entity = processor.persist(record).await?;
        tracing::info!(project_id = id, name = %entity.full_name, "Re-indexed project");
        Ok(entity)
    }
}
