//! Source adapters for gitscope
//!
//! The [`ProjectSource`] trait is what the indexing engine consumes. Two
//! adapters ship here: [`InMemorySource`] for tests and dry runs, and
//! [`NdjsonSource`] for indexing from a newline-delimited JSON export.

pub mod error;
pub mod memory;
pub mod ndjson;
pub mod traits;

pub use error::{SourceError, SourceResult};
pub use memory::InMemorySource;
pub use ndjson::NdjsonSource;
pub use traits::ProjectSource;
