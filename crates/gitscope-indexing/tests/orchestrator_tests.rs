//! Orchestrator: run lock, fire-and-forget runs and forced stops

use gitscope_config::IndexerConfig;
use gitscope_indexing::{
    HeuristicScoreCalculator, IndexingError, IndexingOrchestrator, IndexingService, RunObserver,
    RunReport, TerminalCause,
};
use gitscope_model::{Classification, ProjectRecord, RawRecord};
use gitscope_source::InMemorySource;
use gitscope_storage::{InMemoryGroupRepository, InMemoryProjectRepository, ProjectRepository};
use gitscope_test_utils::{
    Event, GatedProjectRepository, RecordingObserver, group_record, project_entity,
    project_record,
};
use std::sync::Arc;
use std::time::Duration;

const DEADLINE: Duration = Duration::from_secs(10);

/// Ten qualifying projects, one at a time; the upsert of project 4 waits at a gate
fn gated_orchestrator() -> (IndexingOrchestrator, GatedProjectRepository, RecordingObserver) {
    gated_orchestrator_with(1)
}

fn gated_orchestrator_with(
    concurrency: usize,
) -> (IndexingOrchestrator, GatedProjectRepository, RecordingObserver) {
    let source = InMemorySource::new().with_projects((1..=10).map(project_record));
    let repository = GatedProjectRepository::new(InMemoryProjectRepository::new(), 4);
    let observer = RecordingObserver::new();
    let config = IndexerConfig {
        concurrency,
        ..IndexerConfig::default()
    };

    let orchestrator = IndexingOrchestrator::new(
        Arc::new(source),
        Arc::new(repository.clone()),
        Arc::new(InMemoryGroupRepository::new()),
        Arc::new(HeuristicScoreCalculator),
        &config,
    )
    .with_project_observer(Arc::new(observer.clone()));

    (orchestrator, repository, observer)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_immediate_stop_abandons_in_flight_item() {
    let (orchestrator, repository, observer) = gated_orchestrator();

    let handle = orchestrator.reindex_all().await.unwrap();
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();

    assert!(orchestrator.forcibly_stop(true));
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();

    assert_eq!(
        report.cause,
        TerminalCause::ForciblyStopped {
            terminate_immediately: true
        }
    );
    assert_eq!(report.statistics.finished, 3);
    assert_eq!(report.statistics.started, 4);
    assert_eq!(repository.inner().upsert_count(), 3);
    assert!(!orchestrator.is_running());
    assert_eq!(observer.finished_reports().len(), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_graceful_stop_lets_in_flight_item_finish() {
    let (orchestrator, repository, _observer) = gated_orchestrator();

    let handle = orchestrator.reindex_all().await.unwrap();
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();

    assert!(orchestrator.forcibly_stop(false));
    repository.open();
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();

    assert_eq!(
        report.cause,
        TerminalCause::ForciblyStopped {
            terminate_immediately: false
        }
    );
    assert_eq!(report.statistics.finished, 4);
    assert_eq!(report.statistics.started, 4);
    assert!(!orchestrator.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_immediate_stop_escalates_graceful_stop() {
    let (orchestrator, repository, observer) = gated_orchestrator();

    let handle = orchestrator.reindex_all().await.unwrap();
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();

    assert!(orchestrator.forcibly_stop(false));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!handle.is_finished());
    assert!(orchestrator.is_running());

    assert!(orchestrator.forcibly_stop(true));
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();

    assert_eq!(
        report.cause,
        TerminalCause::ForciblyStopped {
            terminate_immediately: true
        }
    );
    assert_eq!(report.statistics.finished, 3);
    assert!(!orchestrator.is_running());
    assert_eq!(observer.count(|event| matches!(event, Event::RunFinished(_))), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_immediate_stop_after_stream_ended_abandons_stuck_item() {
    let (orchestrator, repository, _observer) = gated_orchestrator_with(4);

    let handle = orchestrator.reindex_all().await.unwrap();
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();
    tokio::time::timeout(DEADLINE, async {
        while handle.progress().finished < 9 {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();
    assert!(!handle.is_finished());

    assert!(orchestrator.forcibly_stop(true));
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();

    assert_eq!(
        report.cause,
        TerminalCause::ForciblyStopped {
            terminate_immediately: true
        }
    );
    assert_eq!(report.statistics.started, 10);
    assert_eq!(report.statistics.finished, 9);
    assert!(!orchestrator.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_stopping_a_run_leaves_single_reindex_running() {
    let (orchestrator, repository, _observer) = gated_orchestrator();
    let orchestrator = Arc::new(orchestrator);

    let handle = orchestrator.reindex_all().await.unwrap();
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();

    // Same gated id: the single re-index now waits behind the gate too
    let single = tokio::spawn({
        let orchestrator = Arc::clone(&orchestrator);
        async move { orchestrator.reindex_one(4).await }
    });
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();

    assert!(orchestrator.forcibly_stop(true));
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();
    assert!(report.is_forcibly_stopped());
    assert!(!single.is_finished());

    repository.open();
    let entity = tokio::time::timeout(DEADLINE, single)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(entity.id, 4);
    assert!(repository.inner().find_by_id(4).await.unwrap().is_some());
}

/// Panics when project 2 starts; forwards everything else
struct PanicsOnSecondItem(RecordingObserver);

impl RunObserver<ProjectRecord> for PanicsOnSecondItem {
    fn on_item_started(&self, record: &ProjectRecord) {
        assert_ne!(record.id(), 2, "observer failure");
        RunObserver::<ProjectRecord>::on_item_started(&self.0, record);
    }

    fn on_finished(&self, report: &RunReport) {
        RunObserver::<ProjectRecord>::on_finished(&self.0, report);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_dead_run_task_still_reports_finish_once() {
    let recording = RecordingObserver::new();
    let source = InMemorySource::new().with_projects((1..=3).map(project_record));
    let orchestrator = IndexingOrchestrator::new(
        Arc::new(source),
        Arc::new(InMemoryProjectRepository::new()),
        Arc::new(InMemoryGroupRepository::new()),
        Arc::new(HeuristicScoreCalculator),
        &IndexerConfig {
            concurrency: 1,
            ..IndexerConfig::default()
        },
    )
    .with_project_observer(Arc::new(PanicsOnSecondItem(recording.clone())));

    let handle = orchestrator.reindex_all().await.unwrap();
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();

    assert!(matches!(report.cause, TerminalCause::Failed(_)));
    assert_eq!(recording.finished_reports(), vec![report]);
    assert!(!orchestrator.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_second_run_is_rejected_while_locked() {
    let (orchestrator, repository, _observer) = gated_orchestrator();

    let handle = orchestrator.reindex_all().await.unwrap();
    tokio::time::timeout(DEADLINE, repository.arrived()).await.unwrap();

    assert!(orchestrator.is_running());
    assert!(matches!(
        orchestrator.reindex_all().await,
        Err(IndexingError::AlreadyRunning { run_id }) if run_id == handle.run_id().to_string()
    ));
    assert!(matches!(
        orchestrator.reindex_groups().await,
        Err(IndexingError::AlreadyRunning { .. })
    ));

    // Single-project re-index bypasses the lock
    let entity = orchestrator.reindex_one(9).await.unwrap();
    assert_eq!(entity.id, 9);

    repository.open();
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();
    assert!(report.is_completed());
    assert_eq!(report.statistics.finished, 10);

    // The lock is free as soon as the report is visible
    let next = orchestrator.reindex_all().await.unwrap();
    assert_ne!(next.run_id(), handle.run_id());
    tokio::time::timeout(DEADLINE, next.wait()).await.unwrap();
}

#[tokio::test]
async fn test_forcibly_stop_without_run_is_noop() {
    let (orchestrator, _repository, _observer) = gated_orchestrator();
    assert!(!orchestrator.forcibly_stop(true));
    assert!(!orchestrator.is_running());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_group_run_goes_through_orchestrator() {
    let projects = InMemoryProjectRepository::new();
    projects
        .upsert(&project_entity(1, Some(7), 3, Classification::Low))
        .await
        .unwrap();
    let groups = InMemoryGroupRepository::new();
    let source = InMemorySource::new().with_groups([group_record(7)]);

    let orchestrator = IndexingOrchestrator::new(
        Arc::new(source),
        Arc::new(projects),
        Arc::new(groups.clone()),
        Arc::new(HeuristicScoreCalculator),
        &IndexerConfig::default(),
    );

    let handle = orchestrator.reindex_groups().await.unwrap();
    let report = tokio::time::timeout(DEADLINE, handle.wait()).await.unwrap();

    assert!(report.is_completed());
    assert_eq!(report.statistics.finished, 1);
    assert!(orchestrator.reindex_group(7).await.is_ok());
    assert!(!orchestrator.is_running());
}
