use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{RawRecord, RecordKind};
use crate::stats::RepositoryStatistics;
use crate::visibility::Visibility;

/// Capability flags the source reports for a project
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permissions {
    pub can_fork: bool,
    pub can_create_merge_request: bool,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            can_fork: true,
            can_create_merge_request: true,
        }
    }
}

/// Immutable project snapshot as fetched from the source platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub id: i64,
    pub name: String,
    pub full_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub web_url: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub visibility: Visibility,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Owning group; `None` for personal projects
    #[serde(default)]
    pub group_id: Option<i64>,
    /// Upstream project when this one is a fork
    #[serde(default)]
    pub forked_from_id: Option<i64>,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub stars: u64,
    #[serde(default)]
    pub forks: u64,
    #[serde(default)]
    pub default_branch: Option<String>,
    #[serde(default)]
    pub empty_repo: bool,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub statistics: RepositoryStatistics,
}

impl ProjectRecord {
    pub const fn is_fork(&self) -> bool {
        self.forked_from_id.is_some()
    }

    pub const fn is_personal(&self) -> bool {
        self.group_id.is_none()
    }

    pub const fn has_default_branch(&self) -> bool {
        self.default_branch.is_some()
    }

    /// Statistics with stars and forks taken from the top-level counters
    pub fn rolled_statistics(&self) -> RepositoryStatistics {
        RepositoryStatistics {
            stars: Some(self.stars),
            forks: Some(self.forks),
            ..self.statistics
        }
    }
}

impl RawRecord for ProjectRecord {
    const KIND: RecordKind = RecordKind::Project;

    fn id(&self) -> i64 {
        self.id
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }
}
