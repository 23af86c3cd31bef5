use serde::{Deserialize, Serialize};

/// Repository statistics reported by the source or rolled up from projects
///
/// Every field is optional: sources omit fields they do not know, and the
/// group merge rule works field by field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryStatistics {
    #[serde(default)]
    pub forks: Option<u64>,
    #[serde(default)]
    pub stars: Option<u64>,
    #[serde(default)]
    pub commits: Option<u64>,
    #[serde(default)]
    pub job_artifacts_size: Option<u64>,
    #[serde(default)]
    pub lfs_objects_size: Option<u64>,
    #[serde(default)]
    pub packages_size: Option<u64>,
    #[serde(default)]
    pub repository_size: Option<u64>,
    #[serde(default)]
    pub storage_size: Option<u64>,
    #[serde(default)]
    pub wiki_size: Option<u64>,
}

fn add(total: Option<u64>, value: Option<u64>) -> Option<u64> {
    match (total, value) {
        (Some(a), Some(b)) => Some(a.saturating_add(b)),
        (a, b) => a.or(b),
    }
}

impl RepositoryStatistics {
    /// Field-by-field precedence merge: values present in `self` win, missing
    /// ones are taken from `fallback`
    #[must_use]
    pub fn or(self, fallback: &Self) -> Self {
        Self {
            forks: self.forks.or(fallback.forks),
            stars: self.stars.or(fallback.stars),
            commits: self.commits.or(fallback.commits),
            job_artifacts_size: self.job_artifacts_size.or(fallback.job_artifacts_size),
            lfs_objects_size: self.lfs_objects_size.or(fallback.lfs_objects_size),
            packages_size: self.packages_size.or(fallback.packages_size),
            repository_size: self.repository_size.or(fallback.repository_size),
            storage_size: self.storage_size.or(fallback.storage_size),
            wiki_size: self.wiki_size.or(fallback.wiki_size),
        }
    }

    /// Add `other` into `self`; a field stays `None` only if it is missing on both sides
    pub fn accumulate(&mut self, other: &Self) {
        self.forks = add(self.forks, other.forks);
        self.stars = add(self.stars, other.stars);
        self.commits = add(self.commits, other.commits);
        self.job_artifacts_size = add(self.job_artifacts_size, other.job_artifacts_size);
        self.lfs_objects_size = add(self.lfs_objects_size, other.lfs_objects_size);
        self.packages_size = add(self.packages_size, other.packages_size);
        self.repository_size = add(self.repository_size, other.repository_size);
        self.storage_size = add(self.storage_size, other.storage_size);
        self.wiki_size = add(self.wiki_size, other.wiki_size);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_prefers_present_fields() {
        let source = RepositoryStatistics {
            commits: Some(120),
            ..RepositoryStatistics::default()
        };
        let local = RepositoryStatistics {
            commits: Some(40),
            storage_size: Some(2048),
            ..RepositoryStatistics::default()
        };

        let merged = source.or(&local);
        assert_eq!(merged.commits, Some(120));
        assert_eq!(merged.storage_size, Some(2048));
        assert_eq!(merged.wiki_size, None);
    }

    #[test]
    fn test_accumulate_sums_and_keeps_missing_as_none() {
        let mut total = RepositoryStatistics::default();
        total.accumulate(&RepositoryStatistics {
            stars: Some(3),
            commits: Some(10),
            ..RepositoryStatistics::default()
        });
        total.accumulate(&RepositoryStatistics {
            stars: Some(7),
            ..RepositoryStatistics::default()
        });

        assert_eq!(total.stars, Some(10));
        assert_eq!(total.commits, Some(10));
        assert_eq!(total.forks, None);
    }
}
