//! Record and entity builders
//!
//! Every builder returns a value that passes the default indexing criteria,
//! so tests only spell out the fields they are about.

use chrono::{Duration, Utc};
use gitscope_model::{
    Classification, GroupRecord, Permissions, ProjectEntity, ProjectRecord, RepositoryStatistics,
    Scores, Visibility,
};

/// Internal project owned by group 1, created 400 days ago, active yesterday
pub fn project_record(id: i64) -> ProjectRecord {
    let now = Utc::now();
    ProjectRecord {
        id,
        name: format!("project-{id}"),
        full_name: format!("platform/project-{id}"),
        description: Some(format!("Fixture project {id}")),
        web_url: Some(format!("https://git.example.com/platform/project-{id}")),
        avatar_url: None,
        visibility: Visibility::Internal,
        created_at: now - Duration::days(400),
        last_activity_at: now - Duration::days(1),
        group_id: Some(1),
        forked_from_id: None,
        archived: false,
        stars: 5,
        forks: 1,
        default_branch: Some("main".to_string()),
        empty_repo: false,
        permissions: Permissions::default(),
        topics: vec!["fixture".to_string()],
        statistics: RepositoryStatistics {
            commits: Some(100),
            repository_size: Some(4096),
            storage_size: Some(8192),
            ..RepositoryStatistics::default()
        },
    }
}

/// Internal top-level group without source statistics
pub fn group_record(id: i64) -> GroupRecord {
    GroupRecord {
        id,
        name: format!("group-{id}"),
        full_name: format!("group-{id}"),
        description: None,
        web_url: Some(format!("https://git.example.com/group-{id}")),
        avatar_url: None,
        visibility: Visibility::Internal,
        created_at: Utc::now() - Duration::days(800),
        parent_id: None,
        statistics: None,
    }
}

/// Indexed project under `group_id` with the given stars and criticality
pub fn project_entity(
    id: i64,
    group_id: Option<i64>,
    stars: u64,
    criticality: Classification,
) -> ProjectEntity {
    let record = ProjectRecord {
        group_id,
        stars,
        ..project_record(id)
    };
    let scores = Scores {
        activity: criticality,
        criticality,
        ..Scores::default()
    };
    ProjectEntity::from_record(record, scores, Utc::now())
}
