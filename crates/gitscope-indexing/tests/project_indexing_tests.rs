//! Project pipeline behavior against in-memory collaborators

use gitscope_indexing::{
    HeuristicScoreCalculator, IndexingCriteria, IndexingError, ProjectIndexer, Rejection,
    RunHandle, TerminalCause,
};
use gitscope_model::{ProjectRecord, RecordKind, Visibility};
use gitscope_source::InMemorySource;
use gitscope_storage::{InMemoryProjectRepository, ProjectRepository};
use gitscope_test_utils::{Event, RecordingObserver, project_record};
use std::sync::Arc;

fn indexer(
    source: InMemorySource,
    repository: &InMemoryProjectRepository,
    concurrency: usize,
) -> ProjectIndexer {
    ProjectIndexer::new(
        Arc::new(source),
        Arc::new(repository.clone()),
        Arc::new(HeuristicScoreCalculator),
        IndexingCriteria::default(),
        concurrency,
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_single_persist_failure_does_not_abort_run() {
    let source = InMemorySource::new()
        .with_projects((1..=10).map(project_record))
        .with_page_size(3);
    let repository = InMemoryProjectRepository::new();
    repository.fail_upsert_for(4);
    let observer = RecordingObserver::new();

    let report = indexer(source, &repository, 3)
        .index_all(&RunHandle::new(RecordKind::Project), &observer)
        .await;

    assert_eq!(report.cause, TerminalCause::Completed);
    assert_eq!(report.statistics.started, 10);
    assert_eq!(report.statistics.finished, 9);
    assert_eq!(report.statistics.errors, 1);
    assert_eq!(observer.finished_reports(), vec![report]);
    assert_eq!(repository.count_all().await.unwrap(), 9);

    let item_four = observer.item_events(4);
    assert_eq!(item_four.len(), 2);
    assert_eq!(item_four[0], Event::ItemStarted(4));
    assert!(matches!(item_four[1], Event::ItemError(4, _)));
}

#[tokio::test]
async fn test_rejected_records_are_excluded_not_persisted() {
    let archived = ProjectRecord {
        archived: true,
        ..project_record(2)
    };
    let private = ProjectRecord {
        visibility: Visibility::Private,
        ..project_record(3)
    };
    let fork = ProjectRecord {
        forked_from_id: Some(1),
        ..project_record(4)
    };
    // Sources may ignore the pre-filter, so the criteria still see these
    let source = InMemorySource::new().with_projects([project_record(1), archived, private, fork]);
    let repository = InMemoryProjectRepository::new();
    let observer = RecordingObserver::new();

    let report = indexer(source, &repository, 2)
        .index_all(&RunHandle::new(RecordKind::Project), &observer)
        .await;

    // Archived and private records never leave the in-memory source
    assert_eq!(report.statistics.started, 2);
    assert_eq!(report.statistics.finished, 1);
    assert_eq!(report.statistics.excluded, 1);
    assert!(observer.events().contains(&Event::ItemExcluded(4, Rejection::ForksExcluded)));
    assert!(repository.find_by_id(4).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stream_failure_ends_run_with_partial_statistics() {
    let source = InMemorySource::new()
        .with_projects((1..=10).map(project_record))
        .fail_stream_after(5);
    let repository = InMemoryProjectRepository::new();
    let observer = RecordingObserver::new();

    let report = indexer(source, &repository, 1)
        .index_all(&RunHandle::new(RecordKind::Project), &observer)
        .await;

    assert!(matches!(report.cause, TerminalCause::Failed(_)));
    assert_eq!(report.statistics.started, 5);
    assert_eq!(report.statistics.finished, 5);
    assert_eq!(observer.finished_reports().len(), 1);
}

#[tokio::test]
async fn test_source_is_pulled_lazily() {
    let source = InMemorySource::new()
        .with_projects((1..=50).map(project_record))
        .with_page_size(10);
    let handle = RunHandle::new(RecordKind::Project);
    handle.request_stop(false);

    let report = indexer(source.clone(), &InMemoryProjectRepository::new(), 1)
        .index_all(&handle, &RecordingObserver::new())
        .await;

    assert!(report.is_forcibly_stopped());
    assert_eq!(report.statistics.started, 0);
    assert_eq!(source.pages_fetched(), 0);
}

#[tokio::test]
async fn test_index_one_persists_single_project() {
    let source = InMemorySource::new().with_projects([project_record(42)]);
    let repository = InMemoryProjectRepository::new();

    let entity = indexer(source, &repository, 1).index_one(42).await.unwrap();

    assert_eq!(entity.id, 42);
    assert!(entity.scores.total > 0.0);
    assert_eq!(repository.find_by_id(42).await.unwrap(), Some(entity));
}

#[tokio::test]
async fn test_index_one_reports_not_found_and_excluded() {
    let stale = ProjectRecord {
        last_activity_at: chrono::Utc::now() - chrono::Duration::days(900),
        ..project_record(2)
    };
    let source = InMemorySource::new().with_projects([stale]);
    let indexer = indexer(source, &InMemoryProjectRepository::new(), 1);

    assert!(matches!(
        indexer.index_one(1).await,
        Err(IndexingError::NotFound {
            kind: RecordKind::Project,
            id: 1
        })
    ));
    assert!(matches!(
        indexer.index_one(2).await,
        Err(IndexingError::Excluded {
            reason: Rejection::Inactive,
            ..
        })
    ));
}
