//! Persisted forms of projects and groups

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::group::Group;
use crate::project::ProjectRecord;
use crate::score::Scores;

/// Persisted project, keyed by the source platform identifier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntity {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub group_id: Option<i64>,
    pub stars: u64,
    pub project: ProjectRecord,
    pub scores: Scores,
    pub indexed_at: DateTime<Utc>,
}

impl ProjectEntity {
    /// Build the entity for a freshly indexed record
    pub fn from_record(project: ProjectRecord, scores: Scores, indexed_at: DateTime<Utc>) -> Self {
        Self {
            id: project.id,
            name: project.name.clone(),
            full_name: project.full_name.clone(),
            group_id: project.group_id,
            stars: project.stars,
            project,
            scores,
            indexed_at,
        }
    }

    /// Same entity with new scores, as produced by a re-score pass
    #[must_use]
    pub fn with_scores(self, scores: Scores) -> Self {
        Self { scores, ..self }
    }
}

/// Persisted group, derived from its member projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupEntity {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    pub stars: u64,
    pub group: Group,
    pub indexed_at: DateTime<Utc>,
}

impl GroupEntity {
    pub fn from_group(group: Group, indexed_at: DateTime<Utc>) -> Self {
        Self {
            id: group.record.id,
            name: group.record.name.clone(),
            full_name: group.record.full_name.clone(),
            stars: group.statistics.stars.unwrap_or_default(),
            group,
            indexed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::group::GroupRecord;
    use crate::stats::RepositoryStatistics;
    use crate::visibility::Visibility;
    use crate::Classification;

    fn record_json() -> serde_json::Value {
        serde_json::json!({
            "id": 42,
            "name": "api",
            "full_name": "platform/api",
            "visibility": "internal",
            "created_at": "2024-01-01T00:00:00Z",
            "last_activity_at": "2024-06-01T00:00:00Z",
            "group_id": 7,
            "stars": 12,
            "default_branch": "main"
        })
    }

    #[test]
    fn test_project_record_fills_defaults() {
        let record: ProjectRecord = serde_json::from_value(record_json()).unwrap();
        assert!(!record.archived);
        assert!(!record.is_fork());
        assert!(record.permissions.can_fork);
        assert_eq!(record.statistics, RepositoryStatistics::default());
    }

    #[test]
    fn test_project_entity_copies_identity_from_record() {
        let record: ProjectRecord = serde_json::from_value(record_json()).unwrap();
        let entity = ProjectEntity::from_record(record, Scores::default(), Utc::now());

        assert_eq!(entity.id, 42);
        assert_eq!(entity.full_name, "platform/api");
        assert_eq!(entity.group_id, Some(7));
        assert_eq!(entity.stars, 12);

        let rescored = entity.with_scores(Scores {
            criticality: Classification::High,
            ..Scores::default()
        });
        assert_eq!(rescored.scores.criticality, Classification::High);
    }

    #[test]
    fn test_group_entity_takes_stars_from_merged_statistics() {
        let group = Group {
            record: GroupRecord {
                id: 7,
                name: "platform".to_string(),
                full_name: "platform".to_string(),
                description: None,
                web_url: None,
                avatar_url: None,
                visibility: Visibility::Internal,
                created_at: Utc::now(),
                parent_id: None,
                statistics: None,
            },
            statistics: RepositoryStatistics {
                stars: Some(10),
                ..RepositoryStatistics::default()
            },
            scores: Scores::default(),
            project_count: 2,
        };

        let entity = GroupEntity::from_group(group, Utc::now());
        assert_eq!(entity.id, 7);
        assert_eq!(entity.stars, 10);
    }
}
