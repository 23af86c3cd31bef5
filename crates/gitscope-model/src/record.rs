use std::fmt;

/// Kind of raw record flowing through an indexing pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Project,
    Group,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Project => f.write_str("project"),
            Self::Group => f.write_str("group"),
        }
    }
}

/// Common view over raw records, used for logging and statistics
pub trait RawRecord: Clone + Send + Sync + 'static {
    const KIND: RecordKind;

    /// Identifier assigned by the source platform
    fn id(&self) -> i64;

    /// Full path-like name, e.g. `platform/backend/api`
    fn full_name(&self) -> &str;
}
