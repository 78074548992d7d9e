/// This module implements the concurrent scan pipeline.
///
/// # Shape of a Run
///
/// ```text
///              +-----------+   bounded line queue   +----------+
///  files ----> | producer  | ---------------------> | worker 0 | --+
///              | (1 thread)|          ...           | worker N | --+--> aggregator --> total
///              +-----------+                        +----------+
///                    |
///                    +--> OffsetStore (get before, set after each file, save once)
/// ```
///
/// A single producer reads files strictly in request order, so every line of file
/// `i` is queued before any line of file `i + 1`. Workers consume in any order; since
/// counting is commutative the total does not depend on scheduling.
///
/// # Shutdown Ordering
///
/// Shutdown is driven entirely by channel disconnection rather than by flags:
/// ```rust,ignore
/// store.finish();   // producer: persist offsets once every file is read
/// drop(lines);      // producer: close the queue, always the last step
/// for line in lines.iter() { .. }  // workers: drain until closed and empty
/// results.send(tally);             // workers: report, then drop the sender
/// for tally in tallies.iter() { .. } // aggregator: ends when all workers are done
/// ```
///
/// The offset store is owned by the producer for the whole run; workers never see it.
pub mod engine;
pub mod matcher;
mod producer;
mod worker;

pub use engine::{check_logs, ScanPipeline, DEFAULT_QUEUE_FACTOR};
pub use matcher::{LineClass, LineClassifier, MatchStrategy};

use std::path::{Path, PathBuf};

/// The per-invocation input of a scan
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRequest {
    /// Files to scan, in order
    pub files: Vec<PathBuf>,
    pub pattern: String,
    /// Empty means nothing is ignored
    pub ignore_pattern: String,
}

impl ScanRequest {
    pub fn new<I>(files: I, pattern: impl Into<String>, ignore_pattern: impl Into<String>) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<Path>,
    {
        Self {
            files: files
                .into_iter()
                .map(|f| f.as_ref().to_path_buf())
                .collect(),
            pattern: pattern.into(),
            ignore_pattern: ignore_pattern.into(),
        }
    }
}
