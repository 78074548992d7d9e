mod probe;

#[cfg(unix)]
pub use probe::InodeProbe;
pub use probe::{platform_probe, IdentityProbe, SizeOnlyProbe};

use serde::{Deserialize, Serialize};

/// A snapshot of a file's physical identity, used to detect rotation and truncation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileIdentity {
    /// File length in bytes at the time of the snapshot
    pub size: u64,
    /// Device the file lives on
    pub device_id: u64,
    /// Stable per-file identifier on that device (inode number on unix)
    pub file_serial: u64,
}

impl FileIdentity {
    pub fn new(size: u64, device_id: u64, file_serial: u64) -> Self {
        Self {
            size,
            device_id,
            file_serial,
        }
    }

    /// Returns true if `later` describes the same physical file, possibly grown.
    ///
    /// Log files are append-only, so a shrink means truncation or replacement.
    pub fn same_state(&self, later: &FileIdentity) -> bool {
        self.device_id == later.device_id
            && self.file_serial == later.file_serial
            && later.size >= self.size
    }
}
