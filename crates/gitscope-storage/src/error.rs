//! Errors from the project and group repositories

use std::fmt;
use thiserror::Error;

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Repository call that failed, kept on the error for log context
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageOperation {
    UpsertProject { id: i64 },
    FindProject { id: i64 },
    FindAllProjects,
    FindProjectsByGroup { group_id: i64 },
    CountProjects,
    StreamProjects,
    UpsertGroup { id: i64 },
    FindGroup { id: i64 },
    FindAllGroups,
    CountGroups,
    Migrate,
}

impl fmt::Display for StorageOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UpsertProject { id } => write!(f, "upsert_project(id={id})"),
            Self::FindProject { id } => write!(f, "find_project(id={id})"),
            Self::FindAllProjects => f.write_str("find_all_projects"),
            Self::FindProjectsByGroup { group_id } => {
                write!(f, "find_projects_by_group(group_id={group_id})")
            }
            Self::CountProjects => f.write_str("count_projects"),
            Self::StreamProjects => f.write_str("stream_projects"),
            Self::UpsertGroup { id } => write!(f, "upsert_group(id={id})"),
            Self::FindGroup { id } => write!(f, "find_group(id={id})"),
            Self::FindAllGroups => f.write_str("find_all_groups"),
            Self::CountGroups => f.write_str("count_groups"),
            Self::Migrate => f.write_str("migrate"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StorageError {
    /// The pool could not reach PostgreSQL
    #[error("Cannot reach the database: {message}")]
    ConnectionFailed {
        message: String,
        #[source]
        source: sqlx::Error,
    },

    /// No pooled connection became free in time
    #[error("Timed out waiting for a connection during {operation}")]
    QueryTimeout {
        operation: Box<StorageOperation>,
        #[source]
        source: sqlx::Error,
    },

    #[error("{operation} failed: {message}")]
    QueryFailed {
        operation: Box<StorageOperation>,
        message: String,
        #[source]
        source: sqlx::Error,
    },

    #[error("Schema migration failed: {source}")]
    MigrationFailed {
        #[source]
        source: sqlx::migrate::MigrateError,
    },

    /// Refused without a driver error; raised by the in-memory store
    #[error("{operation} unavailable: {message}")]
    Unavailable {
        operation: Box<StorageOperation>,
        message: String,
    },
}

impl StorageError {
    /// Classify a `sqlx::Error` raised while running `operation`
    pub fn query_failed(operation: StorageOperation, source: sqlx::Error) -> Self {
        match source {
            sqlx::Error::PoolTimedOut => Self::QueryTimeout {
                operation: Box::new(operation),
                source,
            },
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolClosed => {
                Self::ConnectionFailed {
                    message: format!("{operation}: {source}"),
                    source,
                }
            }
            source => Self::QueryFailed {
                operation: Box::new(operation),
                message: source.to_string(),
                source,
            },
        }
    }

    pub fn unavailable(operation: StorageOperation, message: impl Into<String>) -> Self {
        Self::Unavailable {
            operation: Box::new(operation),
            message: message.into(),
        }
    }
}

/// Attach the repository call to a driver error
pub trait StorageErrorExt<T> {
    /// # Errors
    /// The driver error, classified and tagged with `operation`
    fn map_db_err(self, operation: StorageOperation) -> StorageResult<T>;
}

impl<T> StorageErrorExt<T> for std::result::Result<T, sqlx::Error> {
    fn map_db_err(self, operation: StorageOperation) -> StorageResult<T> {
        self.map_err(|e| StorageError::query_failed(operation, e))
    }
}
