//! Indexing criteria settings
//!
//! Durations are expressed in whole days. An unset window disables the rule.

use gitscope_model::Visibility;
use serde::{Deserialize, Serialize};

use crate::validation::{self, Validate};
use crate::{ConfigResult, env_or};

const DEFAULT_FORKS_EXCLUDE_ALL: bool = true;
const DEFAULT_PROJECTS_INCLUDE_ARCHIVED: bool = false;
const DEFAULT_PROJECTS_MAX_VISIBILITY: Visibility = Visibility::Internal;
const DEFAULT_PROJECTS_LAST_ACTIVITY_WITHIN_DAYS: u64 = 365;
const DEFAULT_PERSONAL_PROJECTS_EXCLUDE_ALL: bool = false;
const DEFAULT_PERSONAL_PROJECTS_MIN_STARS: u64 = 0;

/// Upper bound for any day-based window (100 years)
const MAX_WINDOW_DAYS: u64 = 36_500;

/// Policy for forked projects
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForksCriteria {
    pub exclude_all: bool,
    /// Forks are only indexed once they have been idle at least this many days
    #[serde(with = "day_window")]
    pub last_activity_not_later_than_days: Option<u64>,
}

impl Default for ForksCriteria {
    fn default() -> Self {
        Self {
            exclude_all: DEFAULT_FORKS_EXCLUDE_ALL,
            last_activity_not_later_than_days: None,
        }
    }
}

/// Rules applied to every project
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsCriteria {
    pub include_archived: bool,
    pub max_visibility: Visibility,
    #[serde(with = "day_window")]
    pub last_activity_within_days: Option<u64>,
    pub must_have_default_branch: bool,
    pub must_have_not_empty_repo: bool,
    pub must_be_able_to_create_merge_request: bool,
    pub must_be_able_to_fork: bool,
}

impl Default for ProjectsCriteria {
    fn default() -> Self {
        Self {
            include_archived: DEFAULT_PROJECTS_INCLUDE_ARCHIVED,
            max_visibility: DEFAULT_PROJECTS_MAX_VISIBILITY,
            last_activity_within_days: Some(DEFAULT_PROJECTS_LAST_ACTIVITY_WITHIN_DAYS),
            must_have_default_branch: true,
            must_have_not_empty_repo: true,
            must_be_able_to_create_merge_request: true,
            must_be_able_to_fork: true,
        }
    }
}

/// Policy for projects that are not owned by a group
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersonalProjectsCriteria {
    pub exclude_all: bool,
    pub must_have_at_least_stars: u64,
}

impl Default for PersonalProjectsCriteria {
    fn default() -> Self {
        Self {
            exclude_all: DEFAULT_PERSONAL_PROJECTS_EXCLUDE_ALL,
            must_have_at_least_stars: DEFAULT_PERSONAL_PROJECTS_MIN_STARS,
        }
    }
}

/// Complete criteria configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CriteriaConfig {
    pub forks: ForksCriteria,
    pub projects: ProjectsCriteria,
    pub personal_projects: PersonalProjectsCriteria,
}

fn is_off(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "off" | "none")
}

/// A day window written as a number of days, or `"off"`/`"none"` to disable
/// the rule (TOML has no null)
mod day_window {
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Written {
        Days(u64),
        Keyword(String),
    }

    #[allow(clippy::ref_option)]
    pub fn serialize<S: Serializer>(days: &Option<u64>, serializer: S) -> Result<S::Ok, S::Error> {
        match days {
            Some(days) => serializer.serialize_u64(*days),
            None => serializer.serialize_str("off"),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<u64>, D::Error> {
        match Written::deserialize(deserializer)? {
            Written::Days(days) => Ok(Some(days)),
            Written::Keyword(keyword) if super::is_off(&keyword) => Ok(None),
            Written::Keyword(other) => Err(D::Error::custom(format!(
                "expected a number of days or \"off\", got \"{other}\""
            ))),
        }
    }
}

/// Read an optional day window; `off` or `none` disables it
fn env_days(name: &str, default: Option<u64>) -> Option<u64> {
    match std::env::var(name) {
        Ok(value) if is_off(&value) => None,
        Ok(value) => value.parse().ok().or(default),
        Err(_) => default,
    }
}

impl CriteriaConfig {
    /// Apply `GITSCOPE_CRITERIA_*` overrides on top of `self`
    #[must_use]
    pub fn overlay_env(self) -> Self {
        let base = self;

        let forks = ForksCriteria {
            exclude_all: env_or(
                "GITSCOPE_CRITERIA_FORKS_EXCLUDE_ALL",
                base.forks.exclude_all,
            ),
            last_activity_not_later_than_days: env_days(
                "GITSCOPE_CRITERIA_FORKS_LAST_ACTIVITY_NOT_LATER_THAN_DAYS",
                base.forks.last_activity_not_later_than_days,
            ),
        };

        let projects = ProjectsCriteria {
            include_archived: env_or(
                "GITSCOPE_CRITERIA_INCLUDE_ARCHIVED",
                base.projects.include_archived,
            ),
            max_visibility: env_or(
                "GITSCOPE_CRITERIA_MAX_VISIBILITY",
                base.projects.max_visibility,
            ),
            last_activity_within_days: env_days(
                "GITSCOPE_CRITERIA_LAST_ACTIVITY_WITHIN_DAYS",
                base.projects.last_activity_within_days,
            ),
            must_have_default_branch: env_or(
                "GITSCOPE_CRITERIA_MUST_HAVE_DEFAULT_BRANCH",
                base.projects.must_have_default_branch,
            ),
            must_have_not_empty_repo: env_or(
                "GITSCOPE_CRITERIA_MUST_HAVE_NOT_EMPTY_REPO",
                base.projects.must_have_not_empty_repo,
            ),
            must_be_able_to_create_merge_request: env_or(
                "GITSCOPE_CRITERIA_MUST_BE_ABLE_TO_CREATE_MERGE_REQUEST",
                base.projects.must_be_able_to_create_merge_request,
            ),
            must_be_able_to_fork: env_or(
                "GITSCOPE_CRITERIA_MUST_BE_ABLE_TO_FORK",
                base.projects.must_be_able_to_fork,
            ),
        };

        let personal_projects = PersonalProjectsCriteria {
            exclude_all: env_or(
                "GITSCOPE_CRITERIA_PERSONAL_EXCLUDE_ALL",
                base.personal_projects.exclude_all,
            ),
            must_have_at_least_stars: env_or(
                "GITSCOPE_CRITERIA_PERSONAL_MIN_STARS",
                base.personal_projects.must_have_at_least_stars,
            ),
        };

        Self {
            forks,
            projects,
            personal_projects,
        }
    }
}

impl Validate for CriteriaConfig {
    fn validate(&self) -> ConfigResult<()> {
        if let Some(days) = self.forks.last_activity_not_later_than_days {
            validation::within(
                "criteria.forks.last_activity_not_later_than_days",
                days,
                0..=MAX_WINDOW_DAYS,
            )?;
        }
        if let Some(days) = self.projects.last_activity_within_days {
            validation::within(
                "criteria.projects.last_activity_within_days",
                days,
                1..=MAX_WINDOW_DAYS,
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let criteria = CriteriaConfig::default();
        assert!(criteria.forks.exclude_all);
        assert_eq!(criteria.forks.last_activity_not_later_than_days, None);
        assert_eq!(criteria.projects.max_visibility, Visibility::Internal);
        assert_eq!(criteria.projects.last_activity_within_days, Some(365));
        assert!(!criteria.projects.include_archived);
        assert!(!criteria.personal_projects.exclude_all);
        assert_eq!(criteria.personal_projects.must_have_at_least_stars, 0);
    }

    #[test]
    fn test_partial_toml_keeps_remaining_defaults() {
        let criteria: CriteriaConfig = toml::from_str(
            r#"
            [forks]
            exclude_all = false
            last_activity_not_later_than_days = 30

            [projects]
            max_visibility = "public"
            "#,
        )
        .unwrap();

        assert!(!criteria.forks.exclude_all);
        assert_eq!(criteria.forks.last_activity_not_later_than_days, Some(30));
        assert_eq!(criteria.projects.max_visibility, Visibility::Public);
        assert!(criteria.projects.must_have_default_branch);
        assert_eq!(criteria.projects.last_activity_within_days, Some(365));
    }

    #[test]
    fn test_zero_activity_window_is_rejected() {
        let mut criteria = CriteriaConfig::default();
        criteria.projects.last_activity_within_days = Some(0);
        assert!(criteria.validate().is_err());
    }

    #[test]
    fn test_file_can_switch_day_windows_off() {
        let criteria: CriteriaConfig = toml::from_str(
            r#"
            [forks]
            last_activity_not_later_than_days = "none"

            [projects]
            last_activity_within_days = "off"
            "#,
        )
        .unwrap();

        assert_eq!(criteria.forks.last_activity_not_later_than_days, None);
        assert_eq!(criteria.projects.last_activity_within_days, None);
    }

    #[test]
    fn test_disabled_window_renders_as_off_and_reads_back() {
        let rendered = toml::to_string(&CriteriaConfig::default()).unwrap();
        assert!(rendered.contains(r#"last_activity_not_later_than_days = "off""#));

        let parsed: CriteriaConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, CriteriaConfig::default());
    }

    #[test]
    fn test_unknown_window_keyword_is_rejected() {
        let result: Result<CriteriaConfig, _> =
            toml::from_str("[projects]\nlast_activity_within_days = \"forever\"\n");
        assert!(result.is_err());
    }
}
