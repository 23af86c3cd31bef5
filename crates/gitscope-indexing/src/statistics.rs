//! Per-run statistics
//!
//! Owned by exactly one run and written only from that run's loop, even when
//! item processing is dispatched to worker tasks.

use gitscope_common::CorrelationId;
use gitscope_model::RecordKind;
use std::fmt;
use std::time::{Duration, Instant};

use crate::error::IndexingError;

#[derive(Debug)]
pub struct IndexingStatistics {
    kind: RecordKind,
    started: u64,
    finished: u64,
    excluded: u64,
    errors: u64,
    last_error: Option<String>,
    started_at: Option<Instant>,
    elapsed: Option<Duration>,
}

impl IndexingStatistics {
    pub const fn new(kind: RecordKind) -> Self {
        Self {
            kind,
            started: 0,
            finished: 0,
            excluded: 0,
            errors: 0,
            last_error: None,
            started_at: None,
            elapsed: None,
        }
    }

    pub fn start_timing(&mut self) {
        self.started_at = Some(Instant::now());
        self.elapsed = None;
    }

    pub fn stop_timing(&mut self) {
        self.elapsed = self.started_at.map(|start| start.elapsed());
    }

    pub const fn record_started(&mut self) {
        self.started = self.started.saturating_add(1);
    }

    pub const fn record_finished(&mut self) {
        self.finished = self.finished.saturating_add(1);
    }

    pub const fn record_excluded(&mut self) {
        self.excluded = self.excluded.saturating_add(1);
    }

    pub fn record_error(&mut self, cause: &IndexingError) {
        self.errors = self.errors.saturating_add(1);
        self.last_error = Some(cause.to_string());
    }

    /// Snapshot of the counters; valid mid-run as well as after `stop_timing`
    pub fn report(&self) -> StatisticsReport {
        let elapsed = self
            .elapsed
            .or_else(|| self.started_at.map(|start| start.elapsed()))
            .unwrap_or_default();

        StatisticsReport {
            kind: self.kind,
            started: self.started,
            finished: self.finished,
            excluded: self.excluded,
            errors: self.errors,
            last_error: self.last_error.clone(),
            elapsed,
            running: self.started_at.is_some() && self.elapsed.is_none(),
        }
    }
}

/// Point-in-time view of a run's statistics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatisticsReport {
    pub kind: RecordKind,
    pub started: u64,
    pub finished: u64,
    pub excluded: u64,
    pub errors: u64,
    pub last_error: Option<String>,
    pub elapsed: Duration,
    pub running: bool,
}

impl StatisticsReport {
    pub const fn empty(kind: RecordKind) -> Self {
        Self {
            kind,
            started: 0,
            finished: 0,
            excluded: 0,
            errors: 0,
            last_error: None,
            elapsed: Duration::ZERO,
            running: false,
        }
    }

    /// Items started but not yet settled (or abandoned by a forced stop)
    pub const fn unsettled(&self) -> u64 {
        self.started
            .saturating_sub(self.finished)
            .saturating_sub(self.excluded)
            .saturating_sub(self.errors)
    }
}

impl fmt::Display for StatisticsReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}s: started={}, finished={}, excluded={}, errors={}, took {:.3}s",
            self.kind,
            self.started,
            self.finished,
            self.excluded,
            self.errors,
            self.elapsed.as_secs_f64()
        )?;
        if let Some(error) = &self.last_error {
            write!(f, " (last error: {error})")?;
        }
        Ok(())
    }
}

/// How a run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminalCause {
    Completed,
    /// Stream-level failure; items processed before it are kept
    Failed(String),
    ForciblyStopped { terminate_immediately: bool },
}

impl fmt::Display for TerminalCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => f.write_str("completed"),
            Self::Failed(message) => write!(f, "failed: {message}"),
            Self::ForciblyStopped {
                terminate_immediately: true,
            } => f.write_str("forcibly stopped (terminated immediately)"),
            Self::ForciblyStopped {
                terminate_immediately: false,
            } => f.write_str("forcibly stopped (in-flight items finished)"),
        }
    }
}

/// Final report of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub run_id: CorrelationId,
    pub cause: TerminalCause,
    pub statistics: StatisticsReport,
}

impl RunReport {
    pub const fn is_completed(&self) -> bool {
        matches!(self.cause, TerminalCause::Completed)
    }

    pub const fn is_forcibly_stopped(&self) -> bool {
        matches!(self.cause, TerminalCause::ForciblyStopped { .. })
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "run {} {}; {}",
            self.run_id.short(),
            self.cause,
            self.statistics
        )
    }
}
