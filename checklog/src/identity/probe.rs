use std::fmt::Debug;
use std::fs::{File, Metadata};
use std::path::Path;
use std::sync::Arc;

use super::FileIdentity;
use crate::errors::{CheckError, CheckResult};

/// Platform capability for fingerprinting files
pub trait IdentityProbe: Send + Sync + Debug {
    /// Stats `path` and returns its current identity
    fn identity_of(&self, path: &Path) -> CheckResult<FileIdentity>;

    /// Fingerprints an open handle. Unlike `identity_of`, the answer describes the
    /// file that was actually read even if `path` has since been replaced.
    fn identity_of_open(&self, file: &File, path: &Path) -> CheckResult<FileIdentity>;

    /// Returns true if `path` still refers to the file described by `earlier`.
    /// A path that cannot be stat-ed is never the same file.
    fn same_file(&self, earlier: &FileIdentity, path: &Path) -> bool {
        match self.identity_of(path) {
            Ok(current) => earlier.same_state(&current),
            Err(_) => false,
        }
    }
}

/// Identifies files by device and inode number
#[cfg(unix)]
#[derive(Debug, Default, Clone, Copy)]
pub struct InodeProbe;

#[cfg(unix)]
impl InodeProbe {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl IdentityProbe for InodeProbe {
    fn identity_of(&self, path: &Path) -> CheckResult<FileIdentity> {
        let metadata = std::fs::metadata(path).map_err(|e| CheckError::from_io(path, e))?;
        Ok(Self::from_metadata(&metadata))
    }

    fn identity_of_open(&self, file: &File, path: &Path) -> CheckResult<FileIdentity> {
        let metadata = file.metadata().map_err(|e| CheckError::from_io(path, e))?;
        Ok(Self::from_metadata(&metadata))
    }
}

#[cfg(unix)]
impl InodeProbe {
    fn from_metadata(metadata: &Metadata) -> FileIdentity {
        use std::os::unix::fs::MetadataExt;

        FileIdentity {
            size: metadata.len(),
            device_id: metadata.dev(),
            file_serial: metadata.ino(),
        }
    }
}

/// Identifies files by size alone.
///
/// Used where the platform exposes no stable device/serial pair. Rotation is only
/// detected when the replacement is smaller than the recorded size.
#[derive(Debug, Default, Clone, Copy)]
pub struct SizeOnlyProbe;

impl SizeOnlyProbe {
    pub fn new() -> Self {
        Self
    }
}

impl IdentityProbe for SizeOnlyProbe {
    fn identity_of(&self, path: &Path) -> CheckResult<FileIdentity> {
        let metadata = std::fs::metadata(path).map_err(|e| CheckError::from_io(path, e))?;
        Ok(size_only(&metadata))
    }

    fn identity_of_open(&self, file: &File, path: &Path) -> CheckResult<FileIdentity> {
        let metadata = file.metadata().map_err(|e| CheckError::from_io(path, e))?;
        Ok(size_only(&metadata))
    }
}

fn size_only(metadata: &Metadata) -> FileIdentity {
    FileIdentity {
        size: metadata.len(),
        device_id: 0,
        file_serial: 0,
    }
}

/// Returns the best identity probe available on this platform
pub fn platform_probe() -> Arc<dyn IdentityProbe> {
    #[cfg(unix)]
    {
        Arc::new(InodeProbe::new())
    }
    #[cfg(not(unix))]
    {
        Arc::new(SizeOnlyProbe::new())
    }
}
