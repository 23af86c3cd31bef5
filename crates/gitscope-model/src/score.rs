use serde::{Deserialize, Serialize};
use std::fmt;

/// Ordinal activity/criticality level
///
/// Declaration order is the ranking: a group inherits the highest level found
/// among its member projects.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    #[default]
    None,
    Low,
    Medium,
    High,
    Critical,
}

impl Classification {
    pub const ALL: [Self; 5] = [
        Self::None,
        Self::Low,
        Self::Medium,
        Self::High,
        Self::Critical,
    ];

    /// Stable numeric rank, used as the storage representation
    pub const fn rank(self) -> i16 {
        match self {
            Self::None => 0,
            Self::Low => 1,
            Self::Medium => 2,
            Self::High => 3,
            Self::Critical => 4,
        }
    }

    pub fn from_rank(rank: i16) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.rank() == rank)
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(name)
    }
}

/// Computed scores attached to an indexed project or rolled up into a group
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Scores {
    pub activity: Classification,
    pub criticality: Classification,
    pub activity_score: f64,
    pub criticality_score: f64,
    pub total: f64,
}

impl Scores {
    /// Roll-up of two scores: the higher classification and the higher value win
    #[must_use]
    pub fn max(self, other: &Self) -> Self {
        Self {
            activity: self.activity.max(other.activity),
            criticality: self.criticality.max(other.criticality),
            activity_score: self.activity_score.max(other.activity_score),
            criticality_score: self.criticality_score.max(other.criticality_score),
            total: self.total.max(other.total),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_order() {
        assert!(Classification::Low < Classification::Critical);
        assert_eq!(
            [Classification::Low, Classification::Critical, Classification::Medium]
                .into_iter()
                .max(),
            Some(Classification::Critical)
        );
    }

    #[test]
    fn test_rank_roundtrip_covers_all_levels() {
        for level in Classification::ALL {
            assert_eq!(Classification::from_rank(level.rank()), Some(level));
        }
        assert_eq!(Classification::from_rank(42), None);
    }

    #[test]
    fn test_scores_max_takes_highest_of_each_field() {
        let low = Scores {
            activity: Classification::High,
            criticality: Classification::Low,
            activity_score: 80.0,
            criticality_score: 0.1,
            total: 10.0,
        };
        let critical = Scores {
            activity: Classification::Low,
            criticality: Classification::Critical,
            activity_score: 5.0,
            criticality_score: 0.9,
            total: 12.0,
        };

        let rolled = low.max(&critical);
        assert_eq!(rolled.activity, Classification::High);
        assert_eq!(rolled.criticality, Classification::Critical);
        assert!((rolled.total - 12.0).abs() < f64::EPSILON);
    }
}
