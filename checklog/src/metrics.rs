use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters shared between the producer and the workers of one scan
#[derive(Debug, Clone)]
pub struct ScanMetrics {
    files_scanned: Arc<AtomicU64>,
    files_failed: Arc<AtomicU64>,
    bytes_read: Arc<AtomicU64>,
    lines_queued: Arc<AtomicU64>,
    lines_counted: Arc<AtomicU64>,
    lines_ignored: Arc<AtomicU64>,
}

impl ScanMetrics {
    pub fn new() -> Self {
        Self {
            files_scanned: Arc::new(AtomicU64::new(0)),
            files_failed: Arc::new(AtomicU64::new(0)),
            bytes_read: Arc::new(AtomicU64::new(0)),
            lines_queued: Arc::new(AtomicU64::new(0)),
            lines_counted: Arc::new(AtomicU64::new(0)),
            lines_ignored: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records a file that was read to the end (or to a read error)
    pub fn record_file(&self, bytes: u64) {
        self.files_scanned.fetch_add(1, Ordering::Relaxed);
        let total = self.bytes_read.fetch_add(bytes, Ordering::Relaxed) + bytes;
        debug!("Read {} bytes, total: {} bytes", bytes, total);
    }

    /// Records a file that could not be opened
    pub fn record_failure(&self) {
        self.files_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_queued(&self, lines: u64) {
        self.lines_queued.fetch_add(lines, Ordering::Relaxed);
    }

    /// Records one worker's classification totals
    pub fn record_classified(&self, counted: u64, ignored: u64) {
        self.lines_counted.fetch_add(counted, Ordering::Relaxed);
        self.lines_ignored.fetch_add(ignored, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ScanStats {
        ScanStats {
            files_scanned: self.files_scanned.load(Ordering::Relaxed),
            files_failed: self.files_failed.load(Ordering::Relaxed),
            bytes_read: self.bytes_read.load(Ordering::Relaxed),
            lines_queued: self.lines_queued.load(Ordering::Relaxed),
            lines_counted: self.lines_counted.load(Ordering::Relaxed),
            lines_ignored: self.lines_ignored.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.snapshot();
        info!(
            "Scan stats:\n\
             Files scanned/failed: {}/{}\n\
             Bytes read: {}\n\
             Lines queued: {}\n\
             Lines counted/ignored: {}/{}",
            stats.files_scanned,
            stats.files_failed,
            stats.bytes_read,
            stats.lines_queued,
            stats.lines_counted,
            stats.lines_ignored
        );
    }
}

impl Default for ScanMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time copy of [`ScanMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScanStats {
    pub files_scanned: u64,
    pub files_failed: u64,
    pub bytes_read: u64,
    pub lines_queued: u64,
    pub lines_counted: u64,
    pub lines_ignored: u64,
}
