//! Run loop shared by the project and group indexers
//!
//! Pulls records lazily from a source stream and dispatches each one to a
//! bounded set of worker tasks. The loop itself is the only writer of the
//! run's statistics and the only caller of the observer.

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::{FutureExt, StreamExt};
use gitscope_model::RawRecord;
use gitscope_source::SourceResult;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::task::JoinSet;

use crate::criteria::Rejection;
use crate::error::{IndexingError, IndexingResult};
use crate::lock::RunHandle;
use crate::observer::RunObserver;
use crate::statistics::{IndexingStatistics, RunReport, TerminalCause};

/// Result of processing one accepted-or-rejected record
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemOutcome {
    Persisted,
    Excluded(Rejection),
}

/// Work done for each record of a run
#[async_trait]
pub trait ItemProcessor<R: RawRecord>: Send + Sync + 'static {
    async fn process(&self, record: R) -> IndexingResult<ItemOutcome>;
}

type Settled<R> = (R, IndexingResult<ItemOutcome>);

struct RunLoop<'a, R: RawRecord> {
    handle: &'a RunHandle,
    observer: &'a dyn RunObserver<R>,
    statistics: IndexingStatistics,
}

impl<R: RawRecord> RunLoop<'_, R> {
    fn publish(&self) {
        self.handle.publish_progress(self.statistics.report());
    }

    fn started(&mut self, record: &R) {
        self.statistics.record_started();
        self.observer.on_item_started(record);
        self.publish();
    }

    fn settle(&mut self, (record, outcome): Settled<R>) {
        match outcome {
            Ok(ItemOutcome::Persisted) => {
                self.statistics.record_finished();
                self.observer.on_item_finished(&record);
            }
            Ok(ItemOutcome::Excluded(reason)) => {
                self.statistics.record_excluded();
                self.observer.on_item_excluded(&record, &reason);
            }
            Err(error) => {
                self.statistics.record_error(&error);
                self.observer.on_item_error(&error, &record);
            }
        }
        self.publish();
    }
}

fn spawn_item<R, P>(in_flight: &mut JoinSet<Settled<R>>, processor: &Arc<P>, record: R)
where
    R: RawRecord,
    P: ItemProcessor<R> + ?Sized,
{
    let processor = Arc::clone(processor);
    in_flight.spawn(async move {
        let id = record.id();
        let outcome = AssertUnwindSafe(processor.process(record.clone()))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                Err(IndexingError::ItemProcessing {
                    kind: R::KIND,
                    id,
                    message: "processing panicked".to_string(),
                })
            });
        (record, outcome)
    });
}

/// Execute one run to completion and return its report
///
/// `on_started` fires before the first record is pulled and `on_finished`
/// exactly once at the end, whatever the terminal cause. The terminal report
/// is also published on `handle`.
pub async fn execute<R, P>(
    records: BoxStream<'static, SourceResult<R>>,
    processor: Arc<P>,
    concurrency: usize,
    handle: &RunHandle,
    observer: &dyn RunObserver<R>,
) -> RunReport
where
    R: RawRecord,
    P: ItemProcessor<R> + ?Sized,
{
    let mut run = RunLoop {
        handle,
        observer,
        statistics: IndexingStatistics::new(R::KIND),
    };

    run.statistics.start_timing();
    observer.on_started(handle.run_id());
    run.publish();

    let cause = drive(records, &processor, concurrency.max(1), &mut run).await;

    run.statistics.stop_timing();
    let report = RunReport {
        run_id: handle.run_id(),
        cause,
        statistics: run.statistics.report(),
    };
    observer.on_finished(&report);
    handle.publish_finished(report.clone());
    report
}

/// Report a run that failed before its first record could be pulled
///
/// Fires `on_started` and `on_finished` like any other run.
pub fn fail_before_start<R: RawRecord>(
    handle: &RunHandle,
    observer: &dyn RunObserver<R>,
    message: String,
) -> RunReport {
    let mut statistics = IndexingStatistics::new(R::KIND);
    statistics.start_timing();
    observer.on_started(handle.run_id());
    statistics.stop_timing();

    let report = RunReport {
        run_id: handle.run_id(),
        cause: TerminalCause::Failed(message),
        statistics: statistics.report(),
    };
    observer.on_finished(&report);
    handle.publish_finished(report.clone());
    report
}

async fn drive<R, P>(
    mut records: BoxStream<'static, SourceResult<R>>,
    processor: &Arc<P>,
    concurrency: usize,
    run: &mut RunLoop<'_, R>,
) -> TerminalCause
where
    R: RawRecord,
    P: ItemProcessor<R> + ?Sized,
{
    let stop = run.handle.stop_token().clone();
    let abort = run.handle.abort_token().clone();
    let mut in_flight: JoinSet<Settled<R>> = JoinSet::new();

    let mut cause = 'run: loop {
        // Backpressure: never more than `concurrency` items in flight
        while in_flight.len() >= concurrency {
            tokio::select! {
                biased;
                () = abort.cancelled() => break 'run forced(&abort),
                Some(joined) = in_flight.join_next() => {
                    if let Ok(settled) = joined {
                        run.settle(settled);
                    }
                }
            }
        }

        tokio::select! {
            biased;
            () = stop.cancelled() => break 'run forced(&abort),
            next = records.next() => match next {
                Some(Ok(record)) => {
                    run.started(&record);
                    spawn_item(&mut in_flight, processor, record);
                }
                Some(Err(error)) => {
                    tracing::error!(run_id = %run.handle.run_id(), error = %error, "Source stream failed");
                    break 'run TerminalCause::Failed(error.to_string());
                }
                None => break 'run TerminalCause::Completed,
            },
        }
    };

    // Release the source (and any page fetch it has pending) before draining
    drop(records);

    // An immediate stop may still arrive while draining, after the stream
    // ended or on top of an earlier graceful stop
    let mut abandoned = false;
    loop {
        if !abandoned && abort.is_cancelled() {
            in_flight.abort_all();
            cause = forced(&abort);
            abandoned = true;
        }

        let joined = tokio::select! {
            biased;
            () = abort.cancelled(), if !abandoned => continue,
            joined = in_flight.join_next() => joined,
        };
        match joined {
            None => break,
            Some(Ok(settled)) => run.settle(settled),
            Some(Err(e)) if e.is_cancelled() => {}
            Some(Err(e)) => tracing::error!(error = %e, "Item task failed"),
        }
    }

    cause
}

fn forced(abort: &tokio_util::sync::CancellationToken) -> TerminalCause {
    TerminalCause::ForciblyStopped {
        terminate_immediately: abort.is_cancelled(),
    }
}
