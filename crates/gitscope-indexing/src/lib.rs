//! Indexing engine for gitscope
//!
//! Streams project and group records from a [`gitscope_source::ProjectSource`],
//! filters them through the configured criteria and persists the result
//! through the `gitscope-storage` repositories. At most one full run is
//! active at a time; see [`RunLock`].

pub mod analysis;
pub mod criteria;
pub mod error;
pub mod group_indexer;
pub mod lock;
pub mod observer;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod project_indexer;
pub mod scoring;
pub mod statistics;

pub use analysis::{AnalysisReport, AnalysisService};
pub use criteria::{IndexingCriteria, Rejection};
pub use error::{IndexingError, IndexingResult};
pub use group_indexer::{GroupAggregate, GroupIndexer, aggregate_by_group};
pub use lock::{RunHandle, RunLock, RunStatus};
pub use observer::{LoggingObserver, RunObserver};
pub use orchestrator::{IndexingOrchestrator, IndexingService};
pub use pipeline::{ItemOutcome, ItemProcessor};
pub use progress::{LoggingProgressMonitor, ProgressMonitor, ProgressSnapshot};
pub use project_indexer::ProjectIndexer;
pub use scoring::{HeuristicScoreCalculator, ScoreCalculator, ScoringError};
pub use statistics::{IndexingStatistics, RunReport, StatisticsReport, TerminalCause};
