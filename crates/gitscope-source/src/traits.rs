//! Source adapter contract

use async_trait::async_trait;
use futures::stream::BoxStream;
use gitscope_model::{GroupFilter, GroupRecord, ProjectFilter, ProjectRecord};

use crate::error::SourceResult;

/// Read access to the source-control platform
///
/// Streams are lazy, finite and not restartable. Pagination happens inside the
/// adapter. Dropping a stream cancels whatever fetch it has in flight, which is
/// how indexing runs stop an adapter mid-page.
///
/// An `Err` item is a stream-level failure: the adapter yields nothing after it.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    fn stream_projects(&self, filter: &ProjectFilter)
    -> BoxStream<'static, SourceResult<ProjectRecord>>;

    fn stream_groups(&self, filter: &GroupFilter) -> BoxStream<'static, SourceResult<GroupRecord>>;

    /// Fetch one project, `SourceError::NotFound` if the platform does not know it
    async fn fetch_project_by_id(&self, id: i64) -> SourceResult<ProjectRecord>;

    /// Fetch one group, `SourceError::NotFound` if the platform does not know it
    async fn fetch_group_by_id(&self, id: i64) -> SourceResult<GroupRecord>;
}
