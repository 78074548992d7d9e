use serde::Serialize;
use std::path::PathBuf;

use crate::metrics::ScanStats;

/// How far the producer got with a single file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum FileStatus {
    /// Read to end of file
    Scanned,
    /// Could not be opened; contributed nothing and its offset was left unset
    OpenFailed(String),
    /// A read error stopped the scan early; the offset reached so far was recorded
    ReadInterrupted(String),
}

/// Per-file outcome of one scan
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileScan {
    pub path: PathBuf,
    /// Offset the scan resumed from
    pub start_offset: u64,
    /// Offset recorded for the next run
    pub end_offset: u64,
    /// Non-empty lines handed to the workers
    pub lines: u64,
    #[serde(flatten)]
    pub status: FileStatus,
}

impl FileScan {
    pub fn open_failed(path: PathBuf, start_offset: u64, reason: impl ToString) -> Self {
        Self {
            path,
            start_offset,
            end_offset: start_offset,
            lines: 0,
            status: FileStatus::OpenFailed(reason.to_string()),
        }
    }

    pub fn bytes_read(&self) -> u64 {
        self.end_offset.saturating_sub(self.start_offset)
    }
}

/// Result of one scan run
#[derive(Debug, Clone, Default, Serialize)]
pub struct ScanReport {
    /// Lines matching the pattern and not the ignore pattern, across all files
    pub total_matches: u64,
    pub files: Vec<FileScan>,
    pub stats: ScanStats,
}

impl ScanReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines_read(&self) -> u64 {
        self.files.iter().map(|f| f.lines).sum()
    }

    /// Files that failed to open or were cut short
    pub fn failed_files(&self) -> impl Iterator<Item = &FileScan> {
        self.files
            .iter()
            .filter(|f| f.status != FileStatus::Scanned)
    }
}
