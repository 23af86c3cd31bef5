//! Domain model for gitscope
//!
//! Raw records as delivered by a project source, the persisted entities derived
//! from them, and the ordinal classification used for roll-ups.

pub mod entity;
pub mod filter;
pub mod group;
pub mod project;
pub mod record;
pub mod score;
pub mod stats;
pub mod visibility;

pub use entity::{GroupEntity, ProjectEntity};
pub use filter::{GroupFilter, ProjectFilter};
pub use group::{Group, GroupRecord};
pub use project::{Permissions, ProjectRecord};
pub use record::{RawRecord, RecordKind};
pub use score::{Classification, Scores};
pub use stats::RepositoryStatistics;
pub use visibility::{ParseVisibilityError, Visibility};
