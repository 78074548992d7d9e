use crossbeam_channel::{Receiver, Sender};
use tracing::trace;

use super::matcher::{LineClass, LineClassifier};
use crate::metrics::ScanMetrics;

/// Partial totals reported by one worker
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct WorkerTally {
    pub worker: usize,
    pub lines: u64,
    pub counted: u64,
    pub ignored: u64,
}

/// Classifies lines until the queue is closed and drained, then reports its tally.
///
/// Dropping `results` on return is the worker's completion signal.
pub(crate) fn run_worker(
    worker: usize,
    classifier: &LineClassifier,
    lines: Receiver<String>,
    results: Sender<WorkerTally>,
    metrics: &ScanMetrics,
) {
    let mut tally = WorkerTally {
        worker,
        ..WorkerTally::default()
    };

    for line in lines.iter() {
        tally.lines += 1;
        match classifier.classify(&line) {
            LineClass::Counted => tally.counted += 1,
            LineClass::Ignored => tally.ignored += 1,
            LineClass::Unmatched => {}
        }
    }

    metrics.record_classified(tally.counted, tally.ignored);
    trace!(
        "Worker {} done: {} lines, {} counted, {} ignored",
        worker,
        tally.lines,
        tally.counted,
        tally.ignored
    );
    // The aggregator only stops listening once every worker has reported
    let _ = results.send(tally);
}
