//! Shared test utilities for gitscope integration tests
//!
//! Provides a persistent Tokio runtime, record/entity fixtures, a repository that
//! can hold one upsert at a gate, and an observer that records run events.
//!
//! In your test crate's `Cargo.toml`:
//! ```toml
//! [dev-dependencies]
//! gitscope-test-utils = { path = "../gitscope-test-utils" }
//! ```

pub mod fixtures;
pub mod gated;
pub mod observer;

pub use fixtures::{group_record, project_entity, project_record};
pub use gated::GatedProjectRepository;
pub use observer::{Event, RecordingObserver};

use std::sync::OnceLock;

static TEST_RUNTIME: OnceLock<tokio::runtime::Runtime> = OnceLock::new();

/// Shared Tokio runtime for tests that keep a connection pool across cases
///
/// A pool created on one `#[tokio::test]` runtime is unusable from the next,
/// so database tests run on this runtime through `block_on` instead.
/// Workers default to the CPU count; override with `TEST_RUNTIME_WORKERS`.
///
/// # Panics
/// Panics if the runtime cannot be created
#[allow(clippy::expect_used)] // Test infrastructure - panic on init failure is acceptable
pub fn get_test_runtime() -> &'static tokio::runtime::Runtime {
    TEST_RUNTIME.get_or_init(|| {
        let workers = std::env::var("TEST_RUNTIME_WORKERS")
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(std::num::NonZero::get)
                    .unwrap_or(4)
            });

        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .thread_name("test-runtime")
            .worker_threads(workers)
            .build()
            .expect("Failed to create test runtime")
    })
}
