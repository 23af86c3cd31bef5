//! Scoring seam
//!
//! The indexer scores every accepted project through a [`ScoreCalculator`].
//! The formula is not part of the indexing contract; the heuristic here is a
//! reasonable default for the CLI.

use chrono::{DateTime, Utc};
use gitscope_model::{Classification, ProjectRecord, Scores};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Cannot score project {id}: {message}")]
    InvalidInput { id: i64, message: String },
}

/// Pure scoring function over a project snapshot
pub trait ScoreCalculator: Send + Sync {
    /// # Errors
    /// Returns `ScoringError` when the snapshot cannot be scored
    fn calculate(&self, project: &ProjectRecord, now: DateTime<Utc>) -> Result<Scores, ScoringError>;
}

/// Activity from recency and stars, criticality from fan-out (forks, stars)
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicScoreCalculator;

const ACTIVITY_HALF_LIFE_DAYS: f64 = 30.0;

impl HeuristicScoreCalculator {
    fn classify(score: f64) -> Classification {
        match score {
            s if s >= 80.0 => Classification::Critical,
            s if s >= 50.0 => Classification::High,
            s if s >= 20.0 => Classification::Medium,
            s if s > 0.0 => Classification::Low,
            _ => Classification::None,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
impl ScoreCalculator for HeuristicScoreCalculator {
    fn calculate(&self, project: &ProjectRecord, now: DateTime<Utc>) -> Result<Scores, ScoringError> {
        if project.last_activity_at < project.created_at {
            return Err(ScoringError::InvalidInput {
                id: project.id,
                message: "last activity precedes creation".to_string(),
            });
        }

        let idle_days = (now - project.last_activity_at).num_days().max(0) as f64;
        let recency = 100.0 * 0.5_f64.powf(idle_days / ACTIVITY_HALF_LIFE_DAYS);
        let popularity = (project.stars as f64).ln_1p() * 10.0;
        let activity_score = (recency * 0.7 + popularity * 0.3).min(100.0);

        let commits = project.statistics.commits.unwrap_or_default() as f64;
        let criticality_score = ((project.forks as f64).ln_1p() * 15.0
            + (project.stars as f64).ln_1p() * 10.0
            + commits.ln_1p() * 3.0)
            .min(100.0);

        Ok(Scores {
            activity: Self::classify(activity_score),
            criticality: Self::classify(criticality_score),
            activity_score,
            criticality_score,
            total: activity_score * 0.5 + criticality_score * 0.5,
        })
    }
}
