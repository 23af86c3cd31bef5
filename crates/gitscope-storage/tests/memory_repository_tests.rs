//! In-memory repositories honor the persistence contract

use futures::TryStreamExt;
use gitscope_model::{Classification, Group, GroupEntity, RepositoryStatistics, Scores};
use gitscope_storage::{
    GroupRepository, InMemoryGroupRepository, InMemoryProjectRepository, ProjectRepository,
    StorageError,
};
use gitscope_test_utils::{group_record, project_entity};

#[tokio::test]
async fn test_upsert_is_last_write_wins() {
    let repository = InMemoryProjectRepository::new();
    repository
        .upsert(&project_entity(1, Some(7), 3, Classification::Low))
        .await
        .unwrap();
    repository
        .upsert(&project_entity(1, Some(7), 30, Classification::High))
        .await
        .unwrap();

    assert_eq!(repository.count_all().await.unwrap(), 1);
    let stored = repository.find_by_id(1).await.unwrap().unwrap();
    assert_eq!(stored.stars, 30);
    assert_eq!(stored.scores.criticality, Classification::High);
}

#[tokio::test]
async fn test_find_by_group_skips_other_owners() {
    let repository = InMemoryProjectRepository::new();
    for entity in [
        project_entity(1, Some(7), 1, Classification::Low),
        project_entity(2, Some(8), 1, Classification::Low),
        project_entity(3, None, 1, Classification::Low),
    ] {
        repository.upsert(&entity).await.unwrap();
    }

    let members = repository.find_by_group(7).await.unwrap();
    assert_eq!(members.len(), 1);
    assert_eq!(members[0].id, 1);
    assert_eq!(repository.find_all().await.unwrap().len(), 3);
}

#[tokio::test]
async fn test_stream_all_for_scoring_yields_every_project() {
    let repository = InMemoryProjectRepository::new();
    for id in 1..=5 {
        repository
            .upsert(&project_entity(id, Some(1), 1, Classification::Low))
            .await
            .unwrap();
    }

    let streamed: Vec<_> = repository.stream_all_for_scoring().try_collect().await.unwrap();
    assert_eq!(streamed.len(), 5);
}

#[tokio::test]
async fn test_injected_failures_name_the_operation() {
    let repository = InMemoryProjectRepository::new();
    repository.fail_upsert_for(2);

    let error = repository
        .upsert(&project_entity(2, Some(1), 1, Classification::Low))
        .await
        .unwrap_err();
    assert!(matches!(error, StorageError::Unavailable { .. }));
    assert!(error.to_string().contains('2'));
    assert_eq!(repository.upsert_count(), 0);

    repository.clear_failures();
    repository
        .upsert(&project_entity(2, Some(1), 1, Classification::Low))
        .await
        .unwrap();
    assert_eq!(repository.upsert_count(), 1);
}

#[tokio::test]
async fn test_group_repository_round_trip() {
    let repository = InMemoryGroupRepository::new();
    let group = Group {
        record: group_record(7),
        statistics: RepositoryStatistics {
            stars: Some(10),
            ..RepositoryStatistics::default()
        },
        scores: Scores::default(),
        project_count: 2,
    };
    let entity = GroupEntity::from_group(group, chrono::Utc::now());

    repository.upsert(&entity).await.unwrap();

    assert_eq!(repository.count_all().await.unwrap(), 1);
    assert_eq!(repository.find_by_id(7).await.unwrap(), Some(entity));

    repository.fail_next();
    assert!(repository.find_all().await.is_err());
    assert!(repository.find_all().await.is_ok());
}
