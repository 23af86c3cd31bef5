use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::{RawRecord, RecordKind};
use crate::score::Scores;
use crate::stats::RepositoryStatistics;
use crate::visibility::Visibility;

/// Immutable group snapshot as fetched from the source platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GroupRecord {
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
    #[serde(default)]
    pub parent_id: Option<i64>,
    /// Statistics the source reports for the group itself, if any
    #[serde(default)]
    pub statistics: Option<RepositoryStatistics>,
}

impl RawRecord for GroupRecord {
    const KIND: RecordKind = RecordKind::Group;

    fn id(&self) -> i64 {
        self.id
    }

    fn full_name(&self) -> &str {
        &self.full_name
    }
}

/// Derived group value: source metadata plus statistics and scores rolled up
/// from the group's indexed projects
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub record: GroupRecord,
    pub statistics: RepositoryStatistics,
    pub scores: Scores,
    /// Number of indexed projects the roll-up was computed from
    pub project_count: usize,
}
