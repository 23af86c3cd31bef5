//! Project repository that holds one upsert at a gate

use async_trait::async_trait;
use futures::stream::BoxStream;
use gitscope_model::ProjectEntity;
use gitscope_storage::{InMemoryProjectRepository, ProjectRepository, StorageResult};
use std::sync::Arc;
use tokio::sync::{Notify, watch};

/// Wraps an [`InMemoryProjectRepository`]; the upsert of `gated_id` waits
/// until [`GatedProjectRepository::open`] is called
///
/// Lets a test freeze a run with a known item in flight.
#[derive(Clone)]
pub struct GatedProjectRepository {
    inner: InMemoryProjectRepository,
    gated_id: i64,
    arrived: Arc<Notify>,
    gate: Arc<watch::Sender<bool>>,
}

impl GatedProjectRepository {
    pub fn new(inner: InMemoryProjectRepository, gated_id: i64) -> Self {
        let (gate, _) = watch::channel(false);
        Self {
            inner,
            gated_id,
            arrived: Arc::new(Notify::new()),
            gate: Arc::new(gate),
        }
    }

    pub const fn inner(&self) -> &InMemoryProjectRepository {
        &self.inner
    }

    /// Resolves once the gated upsert is waiting
    pub async fn arrived(&self) {
        self.arrived.notified().await;
    }

    /// Let the gated upsert (and any later one for the same id) through
    pub fn open(&self) {
        self.gate.send_replace(true);
    }
}

#[async_trait]
impl ProjectRepository for GatedProjectRepository {
    async fn upsert(&self, entity: &ProjectEntity) -> StorageResult<()> {
        if entity.id == self.gated_id {
            let mut gate = self.gate.subscribe();
            self.arrived.notify_one();
            // Sender lives in `self`, so the channel cannot close while waiting
            let _ = gate.wait_for(|open| *open).await;
        }
        self.inner.upsert(entity).await
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<ProjectEntity>> {
        self.inner.find_by_id(id).await
    }

    async fn find_all(&self) -> StorageResult<Vec<ProjectEntity>> {
        self.inner.find_all().await
    }

    async fn find_by_group(&self, group_id: i64) -> StorageResult<Vec<ProjectEntity>> {
        self.inner.find_by_group(group_id).await
    }

    async fn count_all(&self) -> StorageResult<u64> {
        self.inner.count_all().await
    }

    fn stream_all_for_scoring(&self) -> BoxStream<'_, StorageResult<ProjectEntity>> {
        self.inner.stream_all_for_scoring()
    }
}
