//! Indexing criteria evaluation
//!
//! A pure predicate over a [`ProjectRecord`]. The evaluation instant is passed
//! in explicitly so the same record and criteria always give the same answer.

use chrono::{DateTime, TimeDelta, Utc};
use gitscope_config::CriteriaConfig;
use gitscope_model::{GroupFilter, ProjectFilter, ProjectRecord, Visibility};
use std::fmt;

/// Why a record was not indexed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    ForksExcluded,
    /// Fork was active more recently than the staleness bound allows
    ForkRecentlyActive,
    VisibilityAboveMax { visibility: Visibility, max: Visibility },
    Archived,
    Inactive,
    NoDefaultBranch,
    EmptyRepository,
    CannotCreateMergeRequest,
    CannotFork,
    PersonalProjectsExcluded,
    NotEnoughStars { stars: u64, required: u64 },
    /// Group has no indexed member project to derive it from
    NoIndexedProjects,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ForksExcluded => f.write_str("forks are excluded"),
            Self::ForkRecentlyActive => f.write_str("fork is not stale enough"),
            Self::VisibilityAboveMax { visibility, max } => {
                write!(f, "visibility {visibility} exceeds {max}")
            }
            Self::Archived => f.write_str("project is archived"),
            Self::Inactive => f.write_str("no activity within the configured window"),
            Self::NoDefaultBranch => f.write_str("no default branch"),
            Self::EmptyRepository => f.write_str("repository is empty"),
            Self::CannotCreateMergeRequest => f.write_str("merge requests cannot be created"),
            Self::CannotFork => f.write_str("project cannot be forked"),
            Self::PersonalProjectsExcluded => f.write_str("personal projects are excluded"),
            Self::NotEnoughStars { stars, required } => {
                write!(f, "{stars} stars, at least {required} required")
            }
            Self::NoIndexedProjects => f.write_str("no indexed projects in group"),
        }
    }
}

fn days(value: u64) -> TimeDelta {
    i64::try_from(value)
        .ok()
        .and_then(TimeDelta::try_days)
        .unwrap_or(TimeDelta::MAX)
}

fn earliest(now: DateTime<Utc>, window: TimeDelta) -> DateTime<Utc> {
    now.checked_sub_signed(window)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingCriteria {
    forks_exclude_all: bool,
    fork_last_activity_not_later_than: Option<TimeDelta>,
    include_archived: bool,
    max_visibility: Visibility,
    last_activity_within: Option<TimeDelta>,
    must_have_default_branch: bool,
    must_have_not_empty_repo: bool,
    must_be_able_to_create_merge_request: bool,
    must_be_able_to_fork: bool,
    personal_exclude_all: bool,
    personal_min_stars: u64,
}

impl IndexingCriteria {
    pub fn from_config(config: &CriteriaConfig) -> Self {
        Self {
            forks_exclude_all: config.forks.exclude_all,
            fork_last_activity_not_later_than: config
                .forks
                .last_activity_not_later_than_days
                .map(days),
            include_archived: config.projects.include_archived,
            max_visibility: config.projects.max_visibility,
            last_activity_within: config.projects.last_activity_within_days.map(days),
            must_have_default_branch: config.projects.must_have_default_branch,
            must_have_not_empty_repo: config.projects.must_have_not_empty_repo,
            must_be_able_to_create_merge_request: config
                .projects
                .must_be_able_to_create_merge_request,
            must_be_able_to_fork: config.projects.must_be_able_to_fork,
            personal_exclude_all: config.personal_projects.exclude_all,
            personal_min_stars: config.personal_projects.must_have_at_least_stars,
        }
    }

    /// Check `record` against every rule in order; the first failing rule wins
    ///
    /// # Errors
    /// Returns the [`Rejection`] of the first rule the record fails
    pub fn evaluate(&self, record: &ProjectRecord, now: DateTime<Utc>) -> Result<(), Rejection> {
        if record.is_fork() {
            if self.forks_exclude_all {
                return Err(Rejection::ForksExcluded);
            }
            if let Some(bound) = self.fork_last_activity_not_later_than
                && record.last_activity_at > earliest(now, bound)
            {
                return Err(Rejection::ForkRecentlyActive);
            }
        }

        if !record.visibility.is_within(self.max_visibility) {
            return Err(Rejection::VisibilityAboveMax {
                visibility: record.visibility,
                max: self.max_visibility,
            });
        }

        if record.archived && !self.include_archived {
            return Err(Rejection::Archived);
        }

        if let Some(window) = self.last_activity_within
            && record.last_activity_at < earliest(now, window)
        {
            return Err(Rejection::Inactive);
        }

        if self.must_have_default_branch && !record.has_default_branch() {
            return Err(Rejection::NoDefaultBranch);
        }

        if self.must_have_not_empty_repo && record.empty_repo {
            return Err(Rejection::EmptyRepository);
        }

        if self.must_be_able_to_create_merge_request && !record.permissions.can_create_merge_request {
            return Err(Rejection::CannotCreateMergeRequest);
        }

        if self.must_be_able_to_fork && !record.permissions.can_fork {
            return Err(Rejection::CannotFork);
        }

        if record.is_personal() {
            if self.personal_exclude_all {
                return Err(Rejection::PersonalProjectsExcluded);
            }
            if record.stars < self.personal_min_stars {
                return Err(Rejection::NotEnoughStars {
                    stars: record.stars,
                    required: self.personal_min_stars,
                });
            }
        }

        Ok(())
    }

    pub fn accepts(&self, record: &ProjectRecord, now: DateTime<Utc>) -> bool {
        self.evaluate(record, now).is_ok()
    }

    /// Pre-filter handed to the source; records are still evaluated one by one
    pub const fn project_filter(&self) -> ProjectFilter {
        ProjectFilter {
            max_visibility: Some(self.max_visibility),
            include_archived: self.include_archived,
        }
    }

    pub const fn group_filter(&self) -> GroupFilter {
        GroupFilter {
            max_visibility: Some(self.max_visibility),
        }
    }
}

impl Default for IndexingCriteria {
    fn default() -> Self {
        Self::from_config(&CriteriaConfig::default())
    }
}
