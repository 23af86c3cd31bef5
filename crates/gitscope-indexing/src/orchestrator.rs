//! Indexing orchestrator: the surface exposed to the CLI
//!
//! Owns the run lock. Full runs are fire-and-forget: `reindex_*` returns a
//! [`RunHandle`] as soon as the run is spawned, and completion is observed
//! through the handle, the observers, or the log.

use async_trait::async_trait;
use gitscope_config::IndexerConfig;
use gitscope_model::{
    GroupEntity, GroupRecord, ProjectEntity, ProjectRecord, RawRecord, RecordKind,
};
use gitscope_source::ProjectSource;
use gitscope_storage::{GroupRepository, ProjectRepository};
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use crate::criteria::IndexingCriteria;
use crate::error::{IndexingError, IndexingResult};
use crate::group_indexer::GroupIndexer;
use crate::lock::{RunHandle, RunLock};
use crate::observer::{LoggingObserver, RunObserver};
use crate::project_indexer::ProjectIndexer;
use crate::scoring::ScoreCalculator;
use crate::statistics::{RunReport, TerminalCause};

/// Operations callers use to trigger and control indexing
#[async_trait]
pub trait IndexingService: Send + Sync {
    /// Start a full project run
    ///
    /// # Errors
    /// `AlreadyRunning` when another run holds the lock; nothing is started.
    async fn reindex_all(&self) -> IndexingResult<RunHandle>;

    /// Re-index one project without taking the lock
    ///
    /// # Errors
    /// `NotFound`, `Excluded`, or the failure that stopped the item.
    async fn reindex_one(&self, id: i64) -> IndexingResult<ProjectEntity>;

    /// Start a group derivation run; shares the lock with project runs
    ///
    /// # Errors
    /// `AlreadyRunning` when another run holds the lock.
    async fn reindex_groups(&self) -> IndexingResult<RunHandle>;

    /// Re-derive one group without taking the lock
    ///
    /// # Errors
    /// `NotFound`, `Excluded`, or the failure that stopped the group.
    async fn reindex_group(&self, id: i64) -> IndexingResult<GroupEntity>;

    /// Stop the active run; returns `false` when nothing is running
    fn forcibly_stop(&self, terminate_immediately: bool) -> bool;

    fn is_running(&self) -> bool;
}

pub struct IndexingOrchestrator {
    lock: Arc<RunLock>,
    projects: Arc<ProjectIndexer>,
    groups: Arc<GroupIndexer>,
    project_observer: Arc<dyn RunObserver<ProjectRecord>>,
    group_observer: Arc<dyn RunObserver<GroupRecord>>,
}

impl IndexingOrchestrator {
    /// Build both indexers from the indexer configuration
    pub fn new(
        source: Arc<dyn ProjectSource>,
        project_repository: Arc<dyn ProjectRepository>,
        group_repository: Arc<dyn GroupRepository>,
        scorer: Arc<dyn ScoreCalculator>,
        config: &IndexerConfig,
    ) -> Self {
        let criteria = IndexingCriteria::from_config(&config.criteria);
        let group_filter = criteria.group_filter();

        let projects = ProjectIndexer::new(
            Arc::clone(&source),
            Arc::clone(&project_repository),
            scorer,
            criteria,
            config.concurrency,
        );
        let groups = GroupIndexer::new(
            source,
            project_repository,
            group_repository,
            group_filter,
            config.concurrency,
        );

        Self {
            lock: Arc::new(RunLock::new()),
            projects: Arc::new(projects),
            groups: Arc::new(groups),
            project_observer: Arc::new(LoggingObserver),
            group_observer: Arc::new(LoggingObserver),
        }
    }

    #[must_use]
    pub fn with_project_observer(mut self, observer: Arc<dyn RunObserver<ProjectRecord>>) -> Self {
        self.project_observer = observer;
        self
    }

    #[must_use]
    pub fn with_group_observer(mut self, observer: Arc<dyn RunObserver<GroupRecord>>) -> Self {
        self.group_observer = observer;
        self
    }

    /// Handle of the run currently holding the lock
    pub fn active_run(&self) -> Option<RunHandle> {
        self.lock.active()
    }

    fn acquire(&self, kind: RecordKind) -> IndexingResult<RunHandle> {
        self.lock.try_acquire(kind).ok_or_else(|| {
            let run_id = self
                .lock
                .active()
                .map(|active| active.run_id().to_string())
                .unwrap_or_default();
            tracing::warn!(%run_id, requested = %kind, "Indexing is already running");
            IndexingError::AlreadyRunning { run_id }
        })
    }

    /// Spawn `run` under a supervisor that guarantees a final report, one
    /// `on_finished` and a released lock, even if the run task itself dies
    fn supervise<R, F>(&self, handle: &RunHandle, observer: Arc<dyn RunObserver<R>>, run: F)
    where
        R: RawRecord,
        F: Future<Output = RunReport> + Send + 'static,
    {
        let lock = Arc::clone(&self.lock);
        let handle = handle.clone();

        tokio::spawn(async move {
            let report = match tokio::spawn(run).await {
                Ok(report) => report,
                Err(e) => {
                    tracing::error!(run_id = %handle.run_id(), error = %e, "Indexing task died");
                    let report = RunReport {
                        run_id: handle.run_id(),
                        cause: TerminalCause::Failed(e.to_string()),
                        statistics: handle.progress(),
                    };
                    // A panicking observer must not keep the lock taken
                    let notified =
                        catch_unwind(AssertUnwindSafe(|| observer.on_finished(&report)));
                    if notified.is_err() {
                        tracing::error!(run_id = %report.run_id, "Observer panicked in on_finished");
                    }
                    handle.publish_finished(report.clone());
                    report
                }
            };

            lock.release_run(report.run_id);
            tracing::warn!(run_id = %report.run_id, "Indexing has finished\n{report}");
        });
    }
}

#[async_trait]
impl IndexingService for IndexingOrchestrator {
    async fn reindex_all(&self) -> IndexingResult<RunHandle> {
        let handle = self.acquire(RecordKind::Project)?;
        tracing::info!(run_id = %handle.run_id(), "Starting project indexing");

        let indexer = Arc::clone(&self.projects);
        let observer = Arc::clone(&self.project_observer);
        let run_handle = handle.clone();
        self.supervise(&handle, Arc::clone(&observer), async move {
            indexer.index_all(&run_handle, observer.as_ref()).await
        });
        Ok(handle)
    }

    async fn reindex_one(&self, id: i64) -> IndexingResult<ProjectEntity> {
        self.projects.index_one(id).await
    }

    async fn reindex_groups(&self) -> IndexingResult<RunHandle> {
        let handle = self.acquire(RecordKind::Group)?;
        tracing::info!(run_id = %handle.run_id(), "Starting group indexing");

        let indexer = Arc::clone(&self.groups);
        let observer = Arc::clone(&self.group_observer);
        let run_handle = handle.clone();
        self.supervise(&handle, Arc::clone(&observer), async move {
            indexer.index_all(&run_handle, observer.as_ref()).await
        });
        Ok(handle)
    }

    async fn reindex_group(&self, id: i64) -> IndexingResult<GroupEntity> {
        self.groups.index_one(id).await
    }

    fn forcibly_stop(&self, terminate_immediately: bool) -> bool {
        let Some(active) = self.lock.active() else {
            tracing::debug!("Forced stop requested but nothing is running");
            return false;
        };
        tracing::warn!(
            run_id = %active.run_id(),
            kind = %active.kind(),
            terminate_immediately,
            "Forcibly stopping indexing"
        );
        active.request_stop(terminate_immediately);
        true
    }

    fn is_running(&self) -> bool {
        self.lock.is_locked()
    }
}
