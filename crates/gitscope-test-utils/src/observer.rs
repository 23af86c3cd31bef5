//! Observer that records run events in delivery order

use gitscope_common::CorrelationId;
use gitscope_indexing::{IndexingError, Rejection, RunObserver, RunReport};
use gitscope_model::RawRecord;
use std::sync::{Arc, Mutex, PoisonError};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    RunStarted,
    ItemStarted(i64),
    ItemExcluded(i64, Rejection),
    ItemFinished(i64),
    ItemError(i64, String),
    RunFinished(RunReport),
}

/// Cloneable; every clone appends to the same log
#[derive(Debug, Clone, Default)]
pub struct RecordingObserver {
    events: Arc<Mutex<Vec<Event>>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: Event) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn count(&self, predicate: impl Fn(&Event) -> bool) -> usize {
        self.events().iter().filter(|event| predicate(event)).count()
    }

    /// Reports delivered through `on_finished`
    pub fn finished_reports(&self) -> Vec<RunReport> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::RunFinished(report) => Some(report),
                _ => None,
            })
            .collect()
    }

    /// Events of one item, in delivery order
    pub fn item_events(&self, id: i64) -> Vec<Event> {
        self.events()
            .into_iter()
            .filter(|event| match event {
                Event::ItemStarted(item)
                | Event::ItemExcluded(item, _)
                | Event::ItemFinished(item)
                | Event::ItemError(item, _) => *item == id,
                Event::RunStarted | Event::RunFinished(_) => false,
            })
            .collect()
    }
}

impl<R: RawRecord> RunObserver<R> for RecordingObserver {
    fn on_started(&self, _run_id: CorrelationId) {
        self.push(Event::RunStarted);
    }

    fn on_item_started(&self, record: &R) {
        self.push(Event::ItemStarted(record.id()));
    }

    fn on_item_excluded(&self, record: &R, reason: &Rejection) {
        self.push(Event::ItemExcluded(record.id(), *reason));
    }

    fn on_item_finished(&self, record: &R) {
        self.push(Event::ItemFinished(record.id()));
    }

    fn on_item_error(&self, error: &IndexingError, record: &R) {
        self.push(Event::ItemError(record.id(), error.to_string()));
    }

    fn on_finished(&self, report: &RunReport) {
        self.push(Event::RunFinished(report.clone()));
    }
}
