use std::path::{Path, PathBuf};
use tracing::debug;

use crate::errors::{CheckError, CheckResult};

/// File name of the store when no explicit location is configured
pub const STATE_FILE_NAME: &str = ".check-log.state";

/// `<home>/.check-log.state`, or `./.check-log.state` when there is no usable home
/// directory (common for daemon users)
pub fn default_location() -> PathBuf {
    match dirs::home_dir() {
        Some(home) if home.is_dir() => home.join(STATE_FILE_NAME),
        _ => {
            debug!("No home directory, keeping state in the current directory");
            PathBuf::from(".").join(STATE_FILE_NAME)
        }
    }
}

/// Resolves the store location for a run.
///
/// An explicit override must be an existing file or live in an existing, writable
/// directory; anything else is a configuration error.
pub fn resolve_location(requested: Option<&Path>) -> CheckResult<PathBuf> {
    match requested {
        None => Ok(default_location()),
        Some(path) if path.as_os_str().is_empty() => Ok(default_location()),
        Some(path) if is_usable_location(path) => Ok(path.to_path_buf()),
        Some(path) => Err(CheckError::config_error(format!(
            "unusable state file location: {}",
            path.display()
        ))),
    }
}

fn is_usable_location(path: &Path) -> bool {
    if path.is_file() {
        return true;
    }
    if path.exists() {
        // Directories and other non-files can't hold the store
        return false;
    }

    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    match std::fs::metadata(parent) {
        Ok(metadata) => metadata.is_dir() && !metadata.permissions().readonly(),
        Err(_) => false,
    }
}
