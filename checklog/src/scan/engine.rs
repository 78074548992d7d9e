use crossbeam_channel::{bounded, Receiver};
use std::num::NonZeroUsize;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

use super::matcher::LineClassifier;
use super::producer::LineProducer;
use super::worker::{run_worker, WorkerTally};
use super::ScanRequest;
use crate::config::ScanConfig;
use crate::errors::{CheckError, CheckResult};
use crate::files::expand_logfiles;
use crate::metrics::ScanMetrics;
use crate::results::ScanReport;
use crate::state::{resolve_location, OffsetStore, PersistGuard};

/// Work queue capacity per worker
pub const DEFAULT_QUEUE_FACTOR: usize = 4;

/// One producer, a fixed pool of classifying workers and one aggregator
#[derive(Debug)]
pub struct ScanPipeline {
    request: ScanRequest,
    classifier: LineClassifier,
    workers: NonZeroUsize,
    queue_factor: NonZeroUsize,
}

impl ScanPipeline {
    /// Compiles the request's patterns. Fails before any file is touched if either
    /// pattern is invalid.
    pub fn new(request: ScanRequest, workers: NonZeroUsize) -> CheckResult<Self> {
        let classifier = LineClassifier::new(&request.pattern, &request.ignore_pattern)?;
        Ok(Self {
            request,
            classifier,
            workers,
            queue_factor: NonZeroUsize::new(DEFAULT_QUEUE_FACTOR).unwrap_or(NonZeroUsize::MIN),
        })
    }

    pub fn with_queue_factor(mut self, queue_factor: NonZeroUsize) -> Self {
        self.queue_factor = queue_factor;
        self
    }

    pub fn request(&self) -> &ScanRequest {
        &self.request
    }

    pub fn workers(&self) -> usize {
        self.workers.get()
    }

    /// Bounded so a fast producer can't outrun slow workers by more than this
    pub fn queue_capacity(&self) -> usize {
        self.workers.get().saturating_mul(self.queue_factor.get())
    }

    /// Scans the request's files, updating and finally saving `store`.
    ///
    /// The store is saved exactly once, after the producer has read every file, even
    /// if the producer panics part way.
    pub fn run(&self, store: &mut OffsetStore) -> CheckResult<ScanReport> {
        let started = Instant::now();
        let worker_count = self.workers.get();
        let metrics = ScanMetrics::new();
        info!(
            "Scanning {} files for {:?} (ignoring {:?}) with {} workers",
            self.request.files.len(),
            self.request.pattern,
            self.request.ignore_pattern,
            worker_count
        );

        let (line_tx, line_rx) = bounded::<String>(self.queue_capacity());
        let (tally_tx, tally_rx) = bounded::<WorkerTally>(worker_count);
        let guard = PersistGuard::new(store);

        let (files, aggregated, failed_workers) = thread::scope(|s| {
            let producer = LineProducer::new(&self.request, metrics.clone());
            let producer = s.spawn(move || producer.run(guard, line_tx));

            let workers: Vec<_> = (0..worker_count)
                .map(|id| {
                    let lines = line_rx.clone();
                    let results = tally_tx.clone();
                    let classifier = &self.classifier;
                    let metrics = &metrics;
                    s.spawn(move || run_worker(id, classifier, lines, results, metrics))
                })
                .collect();
            // Only the spawned tasks may keep the channels open
            drop(line_rx);
            drop(tally_tx);

            let aggregator = s.spawn(move || aggregate(tally_rx));

            let files = producer.join();
            let failed_workers = workers
                .into_iter()
                .map(|handle| handle.join())
                .filter(Result::is_err)
                .count();
            (files, aggregator.join(), failed_workers)
        });

        let files = files.map_err(|_| CheckError::pipeline_error("line producer panicked"))?;
        let (total_matches, reported) =
            aggregated.map_err(|_| CheckError::pipeline_error("aggregator panicked"))?;
        if failed_workers > 0 || reported != worker_count {
            return Err(CheckError::pipeline_error(format!(
                "only {} of {} workers reported",
                reported, worker_count
            )));
        }

        metrics.log_stats();
        info!(
            "Scan complete. Found {} matches in {} files in {}",
            total_matches,
            files.len(),
            humantime::format_duration(started.elapsed())
        );

        Ok(ScanReport {
            total_matches,
            files,
            stats: metrics.snapshot(),
        })
    }
}

/// Sums worker tallies. The channel disconnects once every worker has reported
/// and dropped its sender.
fn aggregate(tallies: Receiver<WorkerTally>) -> (u64, usize) {
    let mut total = 0u64;
    let mut reported = 0usize;
    for tally in tallies.iter() {
        debug!("Worker {} reported {} matches", tally.worker, tally.counted);
        total += tally.counted;
        reported += 1;
    }
    (total, reported)
}

/// Runs a complete check as configured: expands the log file pattern, compiles the
/// patterns, resolves and loads the store, then scans.
///
/// Configuration problems are returned before any log file or the store is read.
pub fn check_logs(config: &ScanConfig) -> CheckResult<ScanReport> {
    let files = expand_logfiles(&config.logfile);
    if files.is_empty() {
        warn!("No files match {}", config.logfile);
    }

    let request = ScanRequest::new(files, &config.pattern, &config.ignore_pattern);
    let pipeline =
        ScanPipeline::new(request, config.thread_count)?.with_queue_factor(config.queue_factor);
    let location = resolve_location(config.state_path.as_deref())?;

    let mut store = OffsetStore::load(Some(&location));
    pipeline.run(&mut store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn workers(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    #[test]
    fn test_total_independent_of_worker_count() {
        let dir = tempdir().unwrap();
        let mut files = Vec::new();
        for i in 0..5 {
            let path = dir.path().join(format!("app{}.log", i));
            let mut content = String::new();
            for j in 0..200 {
                match j % 4 {
                    0 => content.push_str("ERROR disk full\n"),
                    1 => content.push_str("ERROR retrying\n"),
                    2 => content.push_str("INFO all good\n"),
                    _ => content.push('\n'),
                }
            }
            fs::write(&path, content).unwrap();
            files.push(path);
        }

        for n in [1, 2, 3, 8] {
            let state = dir.path().join(format!("workers{}.state", n));
            let request = ScanRequest::new(&files, "ERROR", "retrying");
            let pipeline = ScanPipeline::new(request, workers(n)).unwrap();
            let mut store = OffsetStore::load(Some(&state));

            let report = pipeline.run(&mut store).unwrap();
            assert_eq!(report.total_matches, 5 * 50, "workers = {}", n);
            assert_eq!(report.stats.lines_ignored, 5 * 50);
            assert_eq!(report.lines_read(), 5 * 150);
        }
    }

    #[test]
    fn test_tiny_queue_still_completes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("app.log");
        fs::write(&path, "ERROR\n".repeat(1000)).unwrap();

        let request = ScanRequest::new([&path], "ERROR", "");
        let pipeline = ScanPipeline::new(request, workers(2))
            .unwrap()
            .with_queue_factor(workers(1));
        assert_eq!(pipeline.queue_capacity(), 2);

        let mut store = OffsetStore::load(Some(&dir.path().join("s.state")));
        let report = pipeline.run(&mut store).unwrap();
        assert_eq!(report.total_matches, 1000);
        assert_eq!(report.files[0].end_offset, 6000);
    }

    #[test]
    fn test_empty_request_saves_store() {
        let dir = tempdir().unwrap();
        let state = dir.path().join("empty.state");
        let pipeline = ScanPipeline::new(
            ScanRequest::new(Vec::<PathBuf>::new(), "ERROR", ""),
            workers(4),
        )
        .unwrap();

        let mut store = OffsetStore::load(Some(&state));
        let report = pipeline.run(&mut store).unwrap();
        assert_eq!(report.total_matches, 0);
        assert!(report.files.is_empty());
        assert!(state.exists());
    }

    #[test]
    fn test_invalid_pattern_fails_before_scanning() {
        let request = ScanRequest::new(["whatever.log"], "ERROR(", "");
        let err = ScanPipeline::new(request, workers(1)).unwrap_err();
        assert!(matches!(err, CheckError::InvalidPattern { .. }));
    }

    #[test]
    fn test_check_logs_rejects_bad_ignore_pattern_without_touching_store() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        fs::write(&log, "ERROR\n").unwrap();
        let state = dir.path().join("check.state");

        let config = ScanConfig {
            logfile: log.display().to_string(),
            pattern: "ERROR".to_string(),
            ignore_pattern: "[unclosed".to_string(),
            state_path: Some(state.clone()),
            ..ScanConfig::default()
        };

        assert!(matches!(
            check_logs(&config),
            Err(CheckError::InvalidPattern { .. })
        ));
        assert!(!state.exists());
    }

    #[test]
    fn test_check_logs_rejects_unusable_state_location() {
        let dir = tempdir().unwrap();
        let log = dir.path().join("app.log");
        fs::write(&log, "ERROR\n").unwrap();

        let config = ScanConfig {
            logfile: log.display().to_string(),
            state_path: Some(dir.path().join("missing").join("check.state")),
            ..ScanConfig::default()
        };

        assert!(matches!(
            check_logs(&config),
            Err(CheckError::ConfigError(_))
        ));
    }
}
