//! Run lifecycle callbacks

use gitscope_common::CorrelationId;
use gitscope_model::RawRecord;

use crate::criteria::Rejection;
use crate::error::IndexingError;
use crate::statistics::RunReport;

/// Receives the lifecycle events of one run
///
/// Events are delivered from the run loop, one at a time. For a single item the
/// order is always `started` then exactly one of `excluded`, `finished` or
/// `error`. Across items no order is guaranteed once `concurrency > 1`.
/// Items abandoned by an immediate stop get `started` only.
pub trait RunObserver<R: RawRecord>: Send + Sync {
    fn on_started(&self, _run_id: CorrelationId) {}

    fn on_item_started(&self, _record: &R) {}

    fn on_item_excluded(&self, _record: &R, _reason: &Rejection) {}

    fn on_item_finished(&self, _record: &R) {}

    fn on_item_error(&self, _error: &IndexingError, _record: &R) {}

    /// Fires exactly once per run, whatever the terminal cause
    fn on_finished(&self, _report: &RunReport) {}
}

/// Observer that logs item events
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingObserver;

impl<R: RawRecord> RunObserver<R> for LoggingObserver {
    fn on_started(&self, run_id: CorrelationId) {
        tracing::info!(run_id = %run_id, kind = %R::KIND, "Indexing started");
    }

    fn on_item_started(&self, record: &R) {
        tracing::debug!(kind = %R::KIND, id = record.id(), name = record.full_name(), "Indexing");
    }

    fn on_item_excluded(&self, record: &R, reason: &Rejection) {
        tracing::debug!(
            kind = %R::KIND,
            id = record.id(),
            name = record.full_name(),
            %reason,
            "Excluded by criteria"
        );
    }

    fn on_item_finished(&self, record: &R) {
        tracing::info!(kind = %R::KIND, id = record.id(), name = record.full_name(), "Indexed");
    }

    fn on_item_error(&self, error: &IndexingError, record: &R) {
        tracing::error!(
            kind = %R::KIND,
            id = record.id(),
            name = record.full_name(),
            error = %error,
            "Failed to index"
        );
    }
}
