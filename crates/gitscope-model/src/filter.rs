use serde::{Deserialize, Serialize};

use crate::visibility::Visibility;

/// Server-side pre-filter passed to the source when streaming projects
///
/// Sources may ignore it; the criteria evaluator is still applied to every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectFilter {
    pub max_visibility: Option<Visibility>,
    pub include_archived: bool,
}

/// Server-side pre-filter passed to the source when streaming groups
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupFilter {
    pub max_visibility: Option<Visibility>,
}

impl GroupFilter {
    pub fn matches(&self, visibility: Visibility) -> bool {
        self.max_visibility.is_none_or(|max| visibility.is_within(max))
    }
}

impl ProjectFilter {
    pub fn matches(&self, visibility: Visibility, archived: bool) -> bool {
        (self.include_archived || !archived)
            && self.max_visibility.is_none_or(|max| visibility.is_within(max))
    }
}
