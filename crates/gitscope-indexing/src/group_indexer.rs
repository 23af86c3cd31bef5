//! Group pipeline: groups derived from already indexed projects
//!
//! Member projects are rolled up per group, then merged with the group's own
//! record from the source. Groups the source does not stream are skipped, so
//! no group entity exists without upstream confirmation.

use async_trait::async_trait;
use chrono::Utc;
use gitscope_model::{
    Group, GroupEntity, GroupFilter, GroupRecord, ProjectEntity, RecordKind, RepositoryStatistics,
    Scores,
};
use gitscope_source::ProjectSource;
use gitscope_storage::{GroupRepository, ProjectRepository};
use std::collections::HashMap;
use std::sync::Arc;

use crate::criteria::Rejection;
use crate::error::{IndexingError, IndexingResult};
use crate::lock::RunHandle;
use crate::observer::RunObserver;
use crate::pipeline::{self, ItemOutcome, ItemProcessor};
use crate::statistics::RunReport;

/// Roll-up of the indexed projects of one group
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupAggregate {
    /// Sums over member projects; stars and forks are always present
    pub statistics: RepositoryStatistics,
    /// Highest classification and score among members
    pub scores: Scores,
    pub project_count: usize,
}

impl GroupAggregate {
    fn add(&mut self, project: &ProjectEntity) {
        self.statistics
            .accumulate(&project.project.rolled_statistics());
        self.scores = self.scores.max(&project.scores);
        self.project_count = self.project_count.saturating_add(1);
    }

    /// Combine with the group's own record
    ///
    /// Statistics the source reports win field by field; missing fields fall
    /// back to the roll-up. Stars and forks always come from the roll-up.
    pub fn merge(&self, record: GroupRecord) -> Group {
        let local = self.statistics;
        let merged = record
            .statistics
            .map_or(local, |reported| reported.or(&local));

        Group {
            statistics: RepositoryStatistics {
                stars: local.stars.or(Some(0)),
                forks: local.forks.or(Some(0)),
                ..merged
            },
            scores: self.scores,
            project_count: self.project_count,
            record,
        }
    }
}

/// Roll up indexed projects by owning group; personal projects are skipped
pub fn aggregate_by_group<'a>(
    projects: impl IntoIterator<Item = &'a ProjectEntity>,
) -> HashMap<i64, GroupAggregate> {
    let mut aggregates: HashMap<i64, GroupAggregate> = HashMap::new();
    for project in projects {
        if let Some(group_id) = project.group_id {
            aggregates.entry(group_id).or_default().add(project);
        }
    }
    aggregates
}

struct GroupProcessor {
    aggregates: HashMap<i64, GroupAggregate>,
    repository: Arc<dyn GroupRepository>,
}

#[async_trait]
impl ItemProcessor<GroupRecord> for GroupProcessor {
    async fn process(&self, record: GroupRecord) -> IndexingResult<ItemOutcome> {
        let Some(aggregate) = self.aggregates.get(&record.id) else {
            return Ok(ItemOutcome::Excluded(Rejection::NoIndexedProjects));
        };

        let entity = GroupEntity::from_group(aggregate.merge(record), Utc::now());
        self.repository.upsert(&entity).await?;
        Ok(ItemOutcome::Persisted)
    }
}

pub struct GroupIndexer {
    source: Arc<dyn ProjectSource>,
    projects: Arc<dyn ProjectRepository>,
    groups: Arc<dyn GroupRepository>,
    filter: GroupFilter,
    concurrency: usize,
}

impl GroupIndexer {
    pub fn new(
        source: Arc<dyn ProjectSource>,
        projects: Arc<dyn ProjectRepository>,
        groups: Arc<dyn GroupRepository>,
        filter: GroupFilter,
        concurrency: usize,
    ) -> Self {
        Self {
            source,
            projects,
            groups,
            filter,
            concurrency,
        }
    }

    /// Derive and persist every group that has indexed projects
    ///
    /// Streamed groups without an aggregate are reported as excluded. Failing
    /// to load the projects fails the run before any group is pulled.
    pub async fn index_all(
        &self,
        handle: &RunHandle,
        observer: &dyn RunObserver<GroupRecord>,
    ) -> RunReport {
        let projects = match self.projects.find_all().await {
            Ok(projects) => projects,
            Err(e) => {
                tracing::error!(run_id = %handle.run_id(), error = %e, "Cannot load indexed projects");
                return pipeline::fail_before_start(handle, observer, e.to_string());
            }
        };

        let aggregates = aggregate_by_group(&projects);
        tracing::info!(
            run_id = %handle.run_id(),
            projects = projects.len(),
            groups = aggregates.len(),
            "Aggregated indexed projects by group"
        );

        let processor = GroupProcessor {
            aggregates,
            repository: Arc::clone(&self.groups),
        };
        let records = self.source.stream_groups(&self.filter);
        pipeline::execute(records, Arc::new(processor), self.concurrency, handle, observer).await
    }

    /// Re-derive one group from the source record and its indexed members
    ///
    /// # Errors
    /// `NotFound` if the source does not know the group, `Excluded` when it is
    /// outside the visibility filter or has no indexed project, or the storage
    /// error that stopped it.
    pub async fn index_one(&self, id: i64) -> IndexingResult<GroupEntity> {
        let record = self.source.fetch_group_by_id(id).await?;
        let excluded = |reason| IndexingError::Excluded {
            kind: RecordKind::Group,
            id,
            reason,
        };

        if let Some(max) = self.filter.max_visibility
            && !record.visibility.is_within(max)
        {
            return Err(excluded(Rejection::VisibilityAboveMax {
                visibility: record.visibility,
                max,
            }));
        }

        let members = self.projects.find_by_group(id).await?;
        let aggregate = aggregate_by_group(&members)
            .remove(&id)
            .ok_or_else(|| excluded(Rejection::NoIndexedProjects))?;

        let entity = GroupEntity::from_group(aggregate.merge(record), Utc::now());
        self.groups.upsert(&entity).await?;
        tracing::info!(
            group_id = id,
            name = %entity.full_name,
            projects = aggregate.project_count,
            "Re-indexed group"
        );
        Ok(entity)
    }
}
