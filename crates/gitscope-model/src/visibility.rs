use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Visibility level of a project or group
///
/// Ordered from the most open to the most restricted, so that
/// `record.visibility > max_visibility` means "more restricted than allowed".
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    #[default]
    Internal,
    Private,
}

impl Visibility {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Internal => "internal",
            Self::Private => "private",
        }
    }

    /// Whether this visibility is allowed under the given ceiling
    pub fn is_within(self, max: Self) -> bool {
        self <= max
    }
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a visibility string is not one of public/internal/private
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid visibility '{0}' (expected public, internal or private)")]
pub struct ParseVisibilityError(pub String);

impl FromStr for Visibility {
    type Err = ParseVisibilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "public" => Ok(Self::Public),
            "internal" => Ok(Self::Internal),
            "private" => Ok(Self::Private),
            _ => Err(ParseVisibilityError(s.to_string())),
        }
    }
}
