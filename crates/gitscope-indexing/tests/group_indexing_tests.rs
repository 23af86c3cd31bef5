//! Group derivation from indexed projects

use gitscope_indexing::{GroupIndexer, IndexingError, Rejection, RunHandle};
use gitscope_model::{
    Classification, GroupFilter, GroupRecord, ProjectEntity, RecordKind, RepositoryStatistics,
};
use gitscope_source::InMemorySource;
use gitscope_storage::{
    GroupRepository, InMemoryGroupRepository, InMemoryProjectRepository, ProjectRepository,
};
use gitscope_test_utils::{Event, RecordingObserver, group_record, project_entity};
use std::sync::Arc;

async fn seeded_projects(entities: impl IntoIterator<Item = ProjectEntity>) -> InMemoryProjectRepository {
    let repository = InMemoryProjectRepository::new();
    for entity in entities {
        repository.upsert(&entity).await.unwrap();
    }
    repository
}

fn indexer(
    source: InMemorySource,
    projects: &InMemoryProjectRepository,
    groups: &InMemoryGroupRepository,
) -> GroupIndexer {
    GroupIndexer::new(
        Arc::new(source),
        Arc::new(projects.clone()),
        Arc::new(groups.clone()),
        GroupFilter::default(),
        2,
    )
}

#[tokio::test]
async fn test_group_rolls_up_stars_and_highest_classification() {
    let projects = seeded_projects([
        project_entity(1, Some(7), 3, Classification::Low),
        project_entity(2, Some(7), 7, Classification::Critical),
    ])
    .await;
    let groups = InMemoryGroupRepository::new();
    let source = InMemorySource::new().with_groups([group_record(7)]);

    let report = indexer(source, &projects, &groups)
        .index_all(&RunHandle::new(RecordKind::Group), &RecordingObserver::new())
        .await;

    assert!(report.is_completed());
    let group = groups.find_by_id(7).await.unwrap().unwrap();
    assert_eq!(group.stars, 10);
    assert_eq!(group.group.scores.criticality, Classification::Critical);
    assert_eq!(group.group.project_count, 2);
}

#[tokio::test]
async fn test_groups_need_upstream_record_and_indexed_members() {
    let projects = seeded_projects([
        project_entity(1, Some(7), 1, Classification::Low),
        // Group 8 is unknown upstream
        project_entity(2, Some(8), 1, Classification::Low),
        // Personal projects never contribute to a group
        project_entity(3, None, 50, Classification::High),
    ])
    .await;
    let groups = InMemoryGroupRepository::new();
    let source = InMemorySource::new().with_groups([group_record(7), group_record(9)]);
    let observer = RecordingObserver::new();

    let report = indexer(source, &projects, &groups)
        .index_all(&RunHandle::new(RecordKind::Group), &observer)
        .await;

    assert_eq!(report.statistics.started, 2);
    assert_eq!(report.statistics.finished, 1);
    assert_eq!(report.statistics.excluded, 1);
    assert!(
        observer
            .events()
            .contains(&Event::ItemExcluded(9, Rejection::NoIndexedProjects))
    );
    assert_eq!(groups.count_all().await.unwrap(), 1);
    assert!(groups.find_by_id(8).await.unwrap().is_none());
}

#[tokio::test]
async fn test_source_statistics_take_precedence_per_field() {
    let projects = seeded_projects([project_entity(1, Some(7), 4, Classification::Medium)]).await;
    let groups = InMemoryGroupRepository::new();
    let reported = GroupRecord {
        statistics: Some(RepositoryStatistics {
            commits: Some(9_999),
            ..RepositoryStatistics::default()
        }),
        ..group_record(7)
    };
    let source = InMemorySource::new().with_groups([reported]);

    let group = indexer(source, &projects, &groups).index_one(7).await.unwrap();

    assert_eq!(group.group.statistics.commits, Some(9_999));
    assert_eq!(group.group.statistics.repository_size, Some(4096));
    assert_eq!(group.stars, 4);
}

#[tokio::test]
async fn test_index_one_reports_missing_group_and_empty_group() {
    let projects = seeded_projects([project_entity(1, Some(8), 1, Classification::Low)]).await;
    let source = InMemorySource::new().with_groups([group_record(7)]);
    let indexer = indexer(source, &projects, &InMemoryGroupRepository::new());

    assert!(matches!(
        indexer.index_one(8).await,
        Err(IndexingError::NotFound {
            kind: RecordKind::Group,
            id: 8
        })
    ));
    assert!(matches!(
        indexer.index_one(7).await,
        Err(IndexingError::Excluded {
            reason: Rejection::NoIndexedProjects,
            ..
        })
    ));
}

#[tokio::test]
async fn test_project_load_failure_fails_run_before_start() {
    let projects = InMemoryProjectRepository::new();
    projects.fail_next();
    let source = InMemorySource::new().with_groups([group_record(7)]);
    let observer = RecordingObserver::new();

    let report = indexer(source, &projects, &InMemoryGroupRepository::new())
        .index_all(&RunHandle::new(RecordKind::Group), &observer)
        .await;

    assert!(!report.is_completed());
    assert_eq!(report.statistics.started, 0);
    assert_eq!(observer.finished_reports(), vec![report]);
}
