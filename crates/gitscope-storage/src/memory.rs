//! In-memory repositories
//!
//! Backing store for dry runs and tests. Failures can be injected per project
//! identifier or for the next operation.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use gitscope_model::{GroupEntity, ProjectEntity};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{StorageError, StorageOperation, StorageResult};
use crate::traits::{GroupRepository, ProjectRepository};

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone, Default)]
pub struct InMemoryProjectRepository {
    projects: Arc<Mutex<BTreeMap<i64, ProjectEntity>>>,
    failing_ids: Arc<Mutex<HashSet<i64>>>,
    fail_next: Arc<AtomicBool>,
    upserts: Arc<AtomicUsize>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upsert of project `id` fails until cleared
    pub fn fail_upsert_for(&self, id: i64) {
        locked(&self.failing_ids).insert(id);
    }

    pub fn clear_failures(&self) {
        locked(&self.failing_ids).clear();
        self.fail_next.store(false, Ordering::SeqCst);
    }

    /// The next operation of any kind fails
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Successful upserts so far
    pub fn upsert_count(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    fn check_fail(&self, operation: StorageOperation) -> StorageResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::unavailable(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ProjectRepository for InMemoryProjectRepository {
    async fn upsert(&self, entity: &ProjectEntity) -> StorageResult<()> {
        let operation = StorageOperation::UpsertProject { id: entity.id };
        self.check_fail(operation.clone())?;
        if locked(&self.failing_ids).contains(&entity.id) {
            return Err(StorageError::unavailable(operation, "injected failure"));
        }

        locked(&self.projects).insert(entity.id, entity.clone());
        self.upserts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<ProjectEntity>> {
        self.check_fail(StorageOperation::FindProject { id })?;
        Ok(locked(&self.projects).get(&id).cloned())
    }

    async fn find_all(&self) -> StorageResult<Vec<ProjectEntity>> {
        self.check_fail(StorageOperation::FindAllProjects)?;
        Ok(locked(&self.projects).values().cloned().collect())
    }

    async fn find_by_group(&self, group_id: i64) -> StorageResult<Vec<ProjectEntity>> {
        self.check_fail(StorageOperation::FindProjectsByGroup { group_id })?;
        Ok(locked(&self.projects)
            .values()
            .filter(|p| p.group_id == Some(group_id))
            .cloned()
            .collect())
    }

    async fn count_all(&self) -> StorageResult<u64> {
        self.check_fail(StorageOperation::CountProjects)?;
        Ok(locked(&self.projects).len() as u64)
    }

    fn stream_all_for_scoring(&self) -> BoxStream<'_, StorageResult<ProjectEntity>> {
        if let Err(e) = self.check_fail(StorageOperation::StreamProjects) {
            return stream::once(async move { Err(e) }).boxed();
        }
        let snapshot: Vec<ProjectEntity> = locked(&self.projects).values().cloned().collect();
        stream::iter(snapshot.into_iter().map(Ok)).boxed()
    }
}

#[derive(Clone, Default)]
pub struct InMemoryGroupRepository {
    groups: Arc<Mutex<BTreeMap<i64, GroupEntity>>>,
    fail_next: Arc<AtomicBool>,
}

impl InMemoryGroupRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// The next operation of any kind fails
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    fn check_fail(&self, operation: StorageOperation) -> StorageResult<()> {
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(StorageError::unavailable(operation, "injected failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl GroupRepository for InMemoryGroupRepository {
    async fn upsert(&self, entity: &GroupEntity) -> StorageResult<()> {
        self.check_fail(StorageOperation::UpsertGroup { id: entity.id })?;
        locked(&self.groups).insert(entity.id, entity.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: i64) -> StorageResult<Option<GroupEntity>> {
        self.check_fail(StorageOperation::FindGroup { id })?;
        Ok(locked(&self.groups).get(&id).cloned())
    }

    async fn find_all(&self) -> StorageResult<Vec<GroupEntity>> {
        self.check_fail(StorageOperation::FindAllGroups)?;
        Ok(locked(&self.groups).values().cloned().collect())
    }

    async fn count_all(&self) -> StorageResult<u64> {
        self.check_fail(StorageOperation::CountGroups)?;
        Ok(locked(&self.groups).len() as u64)
    }
}
