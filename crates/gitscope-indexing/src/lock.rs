//! Process-wide run lock and the handle of the run holding it

use gitscope_common::CorrelationId;
use gitscope_model::RecordKind;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::statistics::{RunReport, StatisticsReport, TerminalCause};

/// Live state of a run, as published by its loop
#[derive(Debug, Clone)]
pub enum RunStatus {
    Running(StatisticsReport),
    Finished(RunReport),
}

impl RunStatus {
    pub const fn is_finished(&self) -> bool {
        matches!(self, Self::Finished(_))
    }
}

type Slot = Mutex<Option<RunHandle>>;

fn occupied(slot: &Slot) -> MutexGuard<'_, Option<RunHandle>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Handle on one run: its identity, cancellation tokens and progress channel
///
/// Cheap to clone; every clone observes and controls the same run.
#[derive(Debug, Clone)]
pub struct RunHandle {
    run_id: CorrelationId,
    kind: RecordKind,
    stop: CancellationToken,
    abort: CancellationToken,
    status: Arc<watch::Sender<RunStatus>>,
    /// Lock slot this run holds, empty for runs started outside a lock
    held: Weak<Slot>,
}

impl RunHandle {
    pub fn new(kind: RecordKind) -> Self {
        let (status, _) = watch::channel(RunStatus::Running(StatisticsReport::empty(kind)));
        Self {
            run_id: CorrelationId::new(),
            kind,
            stop: CancellationToken::new(),
            abort: CancellationToken::new(),
            status: Arc::new(status),
            held: Weak::new(),
        }
    }

    pub const fn run_id(&self) -> CorrelationId {
        self.run_id
    }

    pub const fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Ask the run to stop pulling records
    ///
    /// With `terminate_immediately` in-flight items are abandoned as well;
    /// otherwise they are allowed to finish.
    pub fn request_stop(&self, terminate_immediately: bool) {
        if terminate_immediately {
            self.abort.cancel();
        }
        self.stop.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop.is_cancelled()
    }

    pub(crate) const fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    pub(crate) const fn abort_token(&self) -> &CancellationToken {
        &self.abort
    }

    /// Current statistics, mid-run or final
    pub fn progress(&self) -> StatisticsReport {
        match &*self.status.borrow() {
            RunStatus::Running(report) => report.clone(),
            RunStatus::Finished(report) => report.statistics.clone(),
        }
    }

    /// Final report, once the run has finished
    pub fn report(&self) -> Option<RunReport> {
        match &*self.status.borrow() {
            RunStatus::Running(_) => None,
            RunStatus::Finished(report) => Some(report.clone()),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.status.borrow().is_finished()
    }

    /// Wait for the run to finish
    pub async fn wait(&self) -> RunReport {
        let mut receiver = self.status.subscribe();
        let finished = receiver
            .wait_for(RunStatus::is_finished)
            .await
            .ok()
            .and_then(|status| match &*status {
                RunStatus::Finished(report) => Some(report.clone()),
                RunStatus::Running(_) => None,
            });

        finished.unwrap_or_else(|| RunReport {
            run_id: self.run_id,
            cause: TerminalCause::Failed("run ended without a report".to_string()),
            statistics: self.progress(),
        })
    }

    pub(crate) fn publish_progress(&self, report: StatisticsReport) {
        self.status.send_if_modified(|status| match status {
            RunStatus::Running(current) => {
                *current = report;
                true
            }
            RunStatus::Finished(_) => false,
        });
    }

    /// Publish the terminal report; later calls are ignored
    ///
    /// The lock held by this run is released first, so anyone woken by the
    /// report can start the next run straight away.
    pub(crate) fn publish_finished(&self, report: RunReport) {
        if let Some(slot) = self.held.upgrade() {
            release_if_held_by(&slot, self.run_id);
        }
        self.status.send_if_modified(|status| {
            if status.is_finished() {
                false
            } else {
                *status = RunStatus::Finished(report);
                true
            }
        });
    }
}

fn release_if_held_by(slot: &Slot, run_id: CorrelationId) {
    let mut state = occupied(slot);
    if state.as_ref().is_some_and(|active| active.run_id == run_id) {
        state.take();
    }
}

/// Mutual-exclusion gate: at most one run at a time
///
/// Callers that fail to acquire get `None` immediately; there is no queueing.
/// A run started from an acquired handle releases the lock when it publishes
/// its final report.
#[derive(Debug, Default)]
pub struct RunLock {
    active: Arc<Slot>,
}

impl RunLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idle to Locked with a fresh handle, or `None` if a run is active
    pub fn try_acquire(&self, kind: RecordKind) -> Option<RunHandle> {
        let mut state = occupied(&self.active);
        if state.is_some() {
            return None;
        }
        let handle = RunHandle {
            held: Arc::downgrade(&self.active),
            ..RunHandle::new(kind)
        };
        *state = Some(handle.clone());
        Some(handle)
    }

    /// Back to Idle; a no-op when already idle
    pub fn release(&self) {
        occupied(&self.active).take();
    }

    /// Release only if `run_id` still holds the lock
    pub fn release_run(&self, run_id: CorrelationId) {
        release_if_held_by(&self.active, run_id);
    }

    pub fn is_locked(&self) -> bool {
        occupied(&self.active).is_some()
    }

    /// Handle of the run holding the lock
    pub fn active(&self) -> Option<RunHandle> {
        occupied(&self.active).clone()
    }
}
