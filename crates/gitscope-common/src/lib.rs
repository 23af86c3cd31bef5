//! Common utilities shared across gitscope crates
//!
//! Run identifiers, one-time environment loading and tracing setup live here so
//! that every crate logs and correlates runs the same way.

pub mod init;
pub mod tracing;

pub use init::{TracingGuards, TracingOptions, init_tracing, initialize_environment};
pub use tracing::CorrelationId;
