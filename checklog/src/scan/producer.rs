use crossbeam_channel::Sender;
use std::borrow::Cow;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::Path;
use tracing::{debug, trace, warn};

use super::ScanRequest;
use crate::metrics::ScanMetrics;
use crate::results::{FileScan, FileStatus};
use crate::state::{OffsetStore, PersistGuard};

const BUFFER_CAPACITY: usize = 65536;

/// The single producer of a scan: reads files strictly in request order and feeds
/// their new lines to the workers
pub(crate) struct LineProducer<'a> {
    request: &'a ScanRequest,
    metrics: ScanMetrics,
}

impl<'a> LineProducer<'a> {
    pub(crate) fn new(request: &'a ScanRequest, metrics: ScanMetrics) -> Self {
        Self { request, metrics }
    }

    /// Scans every file, persists the store, then closes the line queue.
    pub(crate) fn run(&self, mut store: PersistGuard<'_>, lines: Sender<String>) -> Vec<FileScan> {
        let scans = self
            .request
            .files
            .iter()
            .map(|path| self.scan_file(path, &mut store, &lines))
            .collect();

        store.finish();
        // Closing the queue must come last: workers treat it as end of input
        drop(lines);
        scans
    }

    fn scan_file(&self, path: &Path, store: &mut OffsetStore, lines: &Sender<String>) -> FileScan {
        let pattern = self.request.pattern.as_str();
        let ignore_pattern = self.request.ignore_pattern.as_str();
        let resume_at = store.get(path, pattern, ignore_pattern);

        let mut file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                warn!("Failed to open {}: {}", path.display(), e);
                self.metrics.record_failure();
                return FileScan::open_failed(path.to_path_buf(), resume_at, e);
            }
        };

        let start_offset = match file.seek(SeekFrom::Start(resume_at)) {
            Ok(position) => position,
            Err(e) => {
                warn!(
                    "Failed to seek {} to {}: {}",
                    path.display(),
                    resume_at,
                    e
                );
                file.stream_position().unwrap_or(0)
            }
        };
        trace!("Reading {} from offset {}", path.display(), start_offset);

        let mut reader = BufReader::with_capacity(BUFFER_CAPACITY, file);
        let mut buf = Vec::with_capacity(256);
        let mut offset = start_offset;
        let mut sent = 0u64;
        let mut status = FileStatus::Scanned;

        loop {
            buf.clear();
            let read = match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(read) => read as u64,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    warn!(
                        "Failed to finish reading {} at offset {}: {}",
                        path.display(),
                        offset,
                        e
                    );
                    status = FileStatus::ReadInterrupted(e.to_string());
                    break;
                }
            };

            let line = trim_line_end(&buf);
            if !line.is_empty() {
                if lines.send(decode_line(line, path)).is_err() {
                    // Every worker is gone; leave this line for the next run
                    warn!("No workers left to classify lines from {}", path.display());
                    status = FileStatus::ReadInterrupted("line queue closed".to_string());
                    break;
                }
                sent += 1;
            }
            offset += read;
        }

        store.set_from_open(reader.get_ref(), path, pattern, ignore_pattern, offset);
        self.metrics.record_file(offset - start_offset);
        self.metrics.record_queued(sent);
        debug!(
            "{}: queued {} lines, offset {} -> {}",
            path.display(),
            sent,
            start_offset,
            offset
        );

        FileScan {
            path: path.to_path_buf(),
            start_offset,
            end_offset: offset,
            lines: sent,
            status,
        }
    }
}

/// Strips every trailing `\n` and `\r`
fn trim_line_end(line: &[u8]) -> &[u8] {
    let end = line
        .iter()
        .rposition(|&b| b != b'\n' && b != b'\r')
        .map_or(0, |i| i + 1);
    &line[..end]
}

fn decode_line(line: &[u8], path: &Path) -> String {
    match String::from_utf8_lossy(line) {
        Cow::Borrowed(text) => text.to_owned(),
        Cow::Owned(text) => {
            debug!("Invalid UTF-8 replaced in a line of {}", path.display());
            text
        }
    }
}
