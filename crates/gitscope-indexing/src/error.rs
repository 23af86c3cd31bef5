//! Indexing error types

use gitscope_model::RecordKind;
use gitscope_source::SourceError;
use gitscope_storage::StorageError;
use thiserror::Error;

use crate::criteria::Rejection;
use crate::scoring::ScoringError;

pub type IndexingResult<T> = Result<T, IndexingError>;

#[derive(Debug, Error)]
pub enum IndexingError {
    /// Another run holds the run lock; nothing was started
    #[error("Indexing is already running (run {run_id})")]
    AlreadyRunning { run_id: String },

    /// The source failed at stream or page level
    #[error("Source unavailable: {0}")]
    SourceUnavailable(#[source] SourceError),

    /// One record failed to fetch, evaluate or persist
    #[error("Failed to index {kind} {id}: {message}")]
    ItemProcessing {
        kind: RecordKind,
        id: i64,
        message: String,
    },

    #[error("{kind} {id} not found")]
    NotFound { kind: RecordKind, id: i64 },

    #[error("{kind} {id} excluded: {reason}")]
    Excluded {
        kind: RecordKind,
        id: i64,
        reason: Rejection,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Scoring(#[from] ScoringError),
}

impl From<SourceError> for IndexingError {
    fn from(error: SourceError) -> Self {
        match error {
            SourceError::NotFound { kind, id } => Self::NotFound { kind, id },
            other => Self::SourceUnavailable(other),
        }
    }
}
