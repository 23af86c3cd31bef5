//! In-memory source adapter
//!
//! Serves records from memory in pages, optionally delaying each page and
//! failing the stream after a given number of records. Used by tests and
//! dry runs.

use async_trait::async_trait;
use futures::StreamExt;
use futures::stream::{self, BoxStream};
use gitscope_model::{GroupFilter, GroupRecord, ProjectFilter, ProjectRecord, RecordKind};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{SourceError, SourceResult};
use crate::traits::ProjectSource;

const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Clone)]
pub struct InMemorySource {
    projects: Arc<Mutex<Vec<ProjectRecord>>>,
    groups: Arc<Mutex<Vec<GroupRecord>>>,
    page_size: usize,
    page_delay: Option<Duration>,
    fail_after: Option<usize>,
    pages_fetched: Arc<AtomicUsize>,
}

impl Default for InMemorySource {
    fn default() -> Self {
        Self {
            projects: Arc::default(),
            groups: Arc::default(),
            page_size: DEFAULT_PAGE_SIZE,
            page_delay: None,
            fail_after: None,
            pages_fetched: Arc::default(),
        }
    }
}

impl InMemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_projects(self, projects: impl IntoIterator<Item = ProjectRecord>) -> Self {
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(projects);
        self
    }

    #[must_use]
    pub fn with_groups(self, groups: impl IntoIterator<Item = GroupRecord>) -> Self {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(groups);
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Sleep before serving each page, simulating a slow remote API
    #[must_use]
    pub const fn with_page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = Some(delay);
        self
    }

    /// Yield `SourceError::Unavailable` after `records` records on every stream
    #[must_use]
    pub const fn fail_stream_after(mut self, records: usize) -> Self {
        self.fail_after = Some(records);
        self
    }

    /// Replace or insert a project, as if it changed upstream
    pub fn put_project(&self, project: ProjectRecord) {
        let mut projects = self.projects.lock().unwrap_or_else(PoisonError::into_inner);
        projects.retain(|p| p.id != project.id);
        projects.push(project);
    }

    /// Number of pages served so far across all streams
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched.load(Ordering::Relaxed)
    }

    fn paged<T>(&self, items: Vec<T>) -> BoxStream<'static, SourceResult<T>>
    where
        T: Clone + Send + Sync + 'static,
    {
        let items = Arc::new(items);
        let page_size = self.page_size;
        let delay = self.page_delay;
        let counter = Arc::clone(&self.pages_fetched);

        let pages = stream::unfold(0usize, move |offset| {
            let items = Arc::clone(&items);
            let counter = Arc::clone(&counter);
            async move {
                if offset >= items.len() {
                    return None;
                }
                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
                let end = offset.saturating_add(page_size).min(items.len());
                let page = items.get(offset..end).map(<[T]>::to_vec).unwrap_or_default();
                counter.fetch_add(1, Ordering::Relaxed);
                Some((page, end))
            }
        });

        let records = pages.flat_map(|page| stream::iter(page.into_iter().map(Ok)));

        match self.fail_after {
            Some(limit) => records
                .take(limit)
                .chain(stream::once(async move {
                    Err(SourceError::unavailable(format!(
                        "connection reset after {limit} records"
                    )))
                }))
                .boxed(),
            None => records.boxed(),
        }
    }
}

#[async_trait]
impl ProjectSource for InMemorySource {
    fn stream_projects(
        &self,
        filter: &ProjectFilter,
    ) -> BoxStream<'static, SourceResult<ProjectRecord>> {
        let snapshot: Vec<ProjectRecord> = self
            .projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|p| filter.matches(p.visibility, p.archived))
            .cloned()
            .collect();
        self.paged(snapshot)
    }

    fn stream_groups(&self, filter: &GroupFilter) -> BoxStream<'static, SourceResult<GroupRecord>> {
        let snapshot: Vec<GroupRecord> = self
            .groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|g| filter.matches(g.visibility))
            .cloned()
            .collect();
        self.paged(snapshot)
    }

    async fn fetch_project_by_id(&self, id: i64) -> SourceResult<ProjectRecord> {
        if let Some(delay) = self.page_delay {
            tokio::time::sleep(delay).await;
        }
        self.projects
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .ok_or(SourceError::NotFound {
                kind: RecordKind::Project,
                id,
            })
    }

    async fn fetch_group_by_id(&self, id: i64) -> SourceResult<GroupRecord> {
        self.groups
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or(SourceError::NotFound {
                kind: RecordKind::Group,
                id,
            })
    }
}
