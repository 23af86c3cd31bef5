//! Persistence for indexed projects and groups
//!
//! [`ProjectRepository`] and [`GroupRepository`] are the contract the indexing
//! engine writes through. In-memory implementations back dry runs and tests;
//! the Postgres implementations are the durable store.

pub mod error;
pub mod memory;
pub mod migrations;
pub mod postgres;
pub mod traits;

pub use error::{StorageError, StorageErrorExt, StorageOperation, StorageResult};
pub use memory::{InMemoryGroupRepository, InMemoryProjectRepository};
pub use migrations::{connect, run_migrations};
pub use postgres::{PgGroupRepository, PgProjectRepository};
pub use traits::{GroupRepository, ProjectRepository};
