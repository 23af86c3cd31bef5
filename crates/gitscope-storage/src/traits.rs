//! Persistence contract consumed by the indexing engine

use async_trait::async_trait;
use futures::stream::BoxStream;
use gitscope_model::{GroupEntity, ProjectEntity};

use crate::error::StorageResult;

/// Project persistence
///
/// Writes are per record and last-write-wins: a single-project re-index racing
/// a full run on the same identifier leaves whichever upsert landed last.
#[async_trait]
pub trait ProjectRepository: Send + Sync {
    /// Insert or update keyed by `entity.id`
    async fn upsert(&self, entity: &ProjectEntity) -> StorageResult<()>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<ProjectEntity>>;

    async fn find_all(&self) -> StorageResult<Vec<ProjectEntity>>;

    async fn find_by_group(&self, group_id: i64) -> StorageResult<Vec<ProjectEntity>>;

    async fn count_all(&self) -> StorageResult<u64>;

    /// Lazily stream every project for re-scoring
    ///
    /// The stream borrows the repository and holds whatever backend resource it
    /// needs (a pooled connection for Postgres) until it is dropped, whether it
    /// was exhausted, abandoned early or ended with an error.
    fn stream_all_for_scoring(&self) -> BoxStream<'_, StorageResult<ProjectEntity>>;
}

/// Group persistence
#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Insert or update keyed by `entity.id`
    async fn upsert(&self, entity: &GroupEntity) -> StorageResult<()>;

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<GroupEntity>>;

    async fn find_all(&self) -> StorageResult<Vec<GroupEntity>>;

    async fn count_all(&self) -> StorageResult<u64>;
}
