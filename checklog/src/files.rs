use std::path::PathBuf;
use tracing::{debug, warn};

/// Expands a log file path or glob into the files to scan.
///
/// An invalid glob is taken literally as a single path. A valid glob matching
/// nothing yields no files. Matches come back in sorted order.
pub fn expand_logfiles(pattern: &str) -> Vec<PathBuf> {
    match glob::glob(pattern) {
        Ok(paths) => paths
            .filter_map(|entry| match entry {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!("Skipping unreadable glob match: {}", e);
                    None
                }
            })
            .collect(),
        Err(e) => {
            debug!("{:?} is not a valid glob ({}), using it as a path", pattern, e);
            vec![PathBuf::from(pattern)]
        }
    }
}
