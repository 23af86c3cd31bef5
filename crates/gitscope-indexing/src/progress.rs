//! Progress reporting for long batch operations

use std::sync::atomic::{AtomicU64, Ordering};

/// Receives one call per processed item
pub trait ProgressMonitor: Send + Sync {
    fn success(&self);

    fn failure(&self);
}

/// Counts at a point in time
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressSnapshot {
    pub total: u64,
    pub succeeded: u64,
    pub failed: u64,
}

impl ProgressSnapshot {
    pub const fn processed(&self) -> u64 {
        self.succeeded.saturating_add(self.failed)
    }

    /// Whole percent processed, capped at 100; an empty batch is complete
    pub fn percent(&self) -> u64 {
        if self.total == 0 {
            return 100;
        }
        (self.processed().saturating_mul(100) / self.total).min(100)
    }
}

/// Logs every time another `step_percent` percent of `total` is processed
#[derive(Debug)]
pub struct LoggingProgressMonitor {
    total: u64,
    step_percent: u64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    last_step: AtomicU64,
}

impl LoggingProgressMonitor {
    pub fn new(total: u64, step_percent: u8) -> Self {
        Self {
            total,
            step_percent: u64::from(step_percent.clamp(1, 100)),
            succeeded: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            last_step: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> ProgressSnapshot {
        ProgressSnapshot {
            total: self.total,
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
        }
    }

    fn advance(&self) {
        let snapshot = self.snapshot();
        let step = snapshot.percent() / self.step_percent;

        // Only the caller that moves the step forward logs it
        if step > self.last_step.fetch_max(step, Ordering::Relaxed) {
            tracing::info!(
                processed = snapshot.processed(),
                total = snapshot.total,
                failed = snapshot.failed,
                "Progress: {}%",
                snapshot.percent()
            );
        }
    }
}

impl ProgressMonitor for LoggingProgressMonitor {
    fn success(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.advance();
    }

    fn failure(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
        self.advance();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_counts_both_outcomes() {
        let monitor = LoggingProgressMonitor::new(4, 25);
        monitor.success();
        monitor.success();
        monitor.failure();

        let snapshot = monitor.snapshot();
        assert_eq!(snapshot.processed(), 3);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.percent(), 75);
    }

    #[test]
    fn test_step_advances_monotonically() {
        let monitor = LoggingProgressMonitor::new(10, 20);
        for _ in 0..5 {
            monitor.success();
        }
        assert_eq!(monitor.last_step.load(Ordering::Relaxed), 2);

        for _ in 0..5 {
            monitor.success();
        }
        assert_eq!(monitor.last_step.load(Ordering::Relaxed), 5);
    }

    #[test]
    fn test_empty_batch_is_complete() {
        assert_eq!(LoggingProgressMonitor::new(0, 10).snapshot().percent(), 100);
    }

    #[test]
    fn test_zero_step_is_clamped() {
        let monitor = LoggingProgressMonitor::new(3, 0);
        monitor.failure();
        assert_eq!(monitor.last_step.load(Ordering::Relaxed), 33);
    }
}
