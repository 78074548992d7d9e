mod guard;
pub mod location;

pub use guard::PersistGuard;
pub use location::{default_location, resolve_location, STATE_FILE_NAME};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::errors::{CheckError, CheckResult};
use crate::identity::{platform_probe, FileIdentity, IdentityProbe};

/// The persisted record: every offset the tool has recorded, keyed by file,
/// match pattern and ignore pattern
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreState {
    /// When the store was last saved
    pub timestamp: DateTime<Utc>,
    /// The location this record was saved to
    pub file: PathBuf,
    /// Maps log file paths to their recorded identity and offsets
    #[serde(default)]
    pub logfiles: BTreeMap<PathBuf, LogfileState>,
}

impl StoreState {
    fn new(file: PathBuf) -> Self {
        Self {
            timestamp: Utc::now(),
            file,
            logfiles: BTreeMap::new(),
        }
    }
}

/// Offsets recorded for a single log file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LogfileState {
    /// Identity of the file when the offsets were recorded. `None` when the file
    /// could not be stat-ed at that time.
    pub identity: Option<FileIdentity>,
    /// match pattern -> ignore pattern -> entry
    #[serde(default)]
    pub patterns: BTreeMap<String, BTreeMap<String, OffsetEntry>>,
}

/// A resumable read position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OffsetEntry {
    pub offset: u64,
    pub last_updated: DateTime<Utc>,
}

/// Persistent, identity-aware offset store.
///
/// Exclusively owned by one run. Nothing coordinates concurrent processes sharing a
/// location; the last one to save wins.
pub struct OffsetStore {
    state: StoreState,
    location: PathBuf,
    probe: Arc<dyn IdentityProbe>,
}

impl fmt::Debug for OffsetStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OffsetStore")
            .field("location", &self.location)
            .field("logfiles", &self.state.logfiles.len())
            .field("probe", &self.probe)
            .finish()
    }
}

impl OffsetStore {
    /// Creates an empty store bound to `location`
    pub fn new(location: impl Into<PathBuf>) -> Self {
        Self::with_probe(location, platform_probe())
    }

    /// Creates an empty store that fingerprints files with `probe`
    pub fn with_probe(location: impl Into<PathBuf>, probe: Arc<dyn IdentityProbe>) -> Self {
        let location = location.into();
        Self {
            state: StoreState::new(location.clone()),
            location,
            probe,
        }
    }

    /// Loads the store from `location`, or from the default location when `None`.
    ///
    /// Never fails: a missing or unreadable store yields an empty one still bound to
    /// the resolved location.
    pub fn load(location: Option<&Path>) -> Self {
        Self::load_with_probe(location, platform_probe())
    }

    pub fn load_with_probe(location: Option<&Path>, probe: Arc<dyn IdentityProbe>) -> Self {
        let location = match location {
            Some(path) if !path.as_os_str().is_empty() => path.to_path_buf(),
            _ => default_location(),
        };

        if !location.exists() {
            debug!("No state at {}, starting fresh", location.display());
            return Self::with_probe(location, probe);
        }

        let data = match std::fs::read(&location) {
            Ok(data) => data,
            Err(e) => {
                warn!("Failed to read state {}: {}", location.display(), e);
                return Self::with_probe(location, probe);
            }
        };

        match serde_json::from_slice::<StoreState>(&data) {
            Ok(mut state) => {
                // Always bind to where we actually loaded from
                state.file = location.clone();
                debug!(
                    "Loaded state for {} files from {}",
                    state.logfiles.len(),
                    location.display()
                );
                Self {
                    state,
                    location,
                    probe,
                }
            }
            Err(e) => {
                warn!(
                    "State {} is corrupted, starting fresh: {}",
                    location.display(),
                    e
                );
                Self::with_probe(location, probe)
            }
        }
    }

    pub fn location(&self) -> &Path {
        &self.location
    }

    /// When the store was last saved (or created, if never saved)
    pub fn last_saved(&self) -> DateTime<Utc> {
        self.state.timestamp
    }

    pub fn state(&self) -> &StoreState {
        &self.state
    }

    /// The identity recorded for `path`, if any
    pub fn recorded_identity(&self, path: &Path) -> Option<FileIdentity> {
        self.state.logfiles.get(path).and_then(|l| l.identity)
    }

    /// The raw entry for a (file, pattern, ignore pattern) triple, without any
    /// identity check
    pub fn entry(&self, path: &Path, pattern: &str, ignore_pattern: &str) -> Option<&OffsetEntry> {
        self.state
            .logfiles
            .get(path)?
            .patterns
            .get(pattern)?
            .get(ignore_pattern)
    }

    /// Returns where to resume reading `path` for this pattern pair.
    ///
    /// Unknown files, unknown pattern pairs and files whose identity changed all
    /// resume from 0.
    pub fn get(&self, path: &Path, pattern: &str, ignore_pattern: &str) -> u64 {
        let Some(logfile) = self.state.logfiles.get(path) else {
            return 0;
        };

        match &logfile.identity {
            Some(identity) if self.probe.same_file(identity, path) => {}
            _ => {
                debug!("{} was rotated or replaced, reading from start", path.display());
                return 0;
            }
        }

        logfile
            .patterns
            .get(pattern)
            .and_then(|ignores| ignores.get(ignore_pattern))
            .map_or(0, |entry| entry.offset)
    }

    /// Records `offset` for the triple and refreshes the file's identity from `path`.
    ///
    /// A changed identity discards every pattern's offset for the path.
    pub fn set(&mut self, path: &Path, pattern: &str, ignore_pattern: &str, offset: u64) {
        let current = match self.probe.identity_of(path) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Could not access metadata of {}: {}", path.display(), e);
                None
            }
        };
        self.record(path, pattern, ignore_pattern, offset, current);
    }

    /// Like [`OffsetStore::set`], but fingerprints the handle `offset` was read
    /// through, so a file rotated in after the read is never credited with it.
    pub fn set_from_open(
        &mut self,
        file: &File,
        path: &Path,
        pattern: &str,
        ignore_pattern: &str,
        offset: u64,
    ) {
        match self.probe.identity_of_open(file, path) {
            Ok(identity) => self.record(path, pattern, ignore_pattern, offset, Some(identity)),
            Err(e) => {
                debug!("Could not stat open handle of {}: {}", path.display(), e);
                self.set(path, pattern, ignore_pattern, offset);
            }
        }
    }

    fn record(
        &mut self,
        path: &Path,
        pattern: &str,
        ignore_pattern: &str,
        mut offset: u64,
        current: Option<FileIdentity>,
    ) {
        let logfile = self.state.logfiles.entry(path.to_path_buf()).or_default();

        match current {
            Some(current) => {
                let unchanged = logfile
                    .identity
                    .is_some_and(|recorded| recorded.same_state(&current));
                if !unchanged {
                    if !logfile.patterns.is_empty() {
                        info!(
                            "{} changed identity, discarding {} recorded patterns",
                            path.display(),
                            logfile.patterns.len()
                        );
                    }
                    logfile.patterns.clear();
                }
                logfile.identity = Some(current);

                // An offset is only valid within the file it is recorded against
                if offset > current.size {
                    warn!(
                        "{} is {} bytes, less than offset {}; replaced during the read",
                        path.display(),
                        current.size,
                        offset
                    );
                    offset = 0;
                }
            }
            None => {
                if let Some(recorded) = logfile.identity {
                    if offset > recorded.size {
                        // The old identity can't vouch for the new offset
                        warn!(
                            "Offset {} for {} exceeds recorded size {}, dropping identity",
                            offset,
                            path.display(),
                            recorded.size
                        );
                        logfile.identity = None;
                    }
                }
            }
        }

        logfile
            .patterns
            .entry(pattern.to_string())
            .or_default()
            .insert(
                ignore_pattern.to_string(),
                OffsetEntry {
                    offset,
                    last_updated: Utc::now(),
                },
            );
        debug!(
            "Recorded offset {} for {} ({:?} / {:?})",
            offset,
            path.display(),
            pattern,
            ignore_pattern
        );
    }

    /// Writes the store to its location, replacing any previous contents
    pub fn try_save(&mut self) -> CheckResult<()> {
        if let Some(parent) = self.location.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        self.state.timestamp = Utc::now();
        self.state.file = self.location.clone();

        // Write to a sibling first so a crash never leaves a half-written store
        let tmp_path = temp_path_for(&self.location);
        let data = serde_json::to_vec_pretty(&self.state)?;
        std::fs::write(&tmp_path, data)
            .map_err(|e| CheckError::state_error(format!("{}: {}", tmp_path.display(), e)))?;
        std::fs::rename(&tmp_path, &self.location)
            .map_err(|e| CheckError::state_error(format!("{}: {}", self.location.display(), e)))?;

        info!("Saved state to {}", self.location.display());
        Ok(())
    }

    /// Best-effort save. Failures are logged and reported as `false`.
    pub fn save(&mut self) -> bool {
        match self.try_save() {
            Ok(()) => true,
            Err(e) => {
                warn!(
                    "Could not save state to {}: {}",
                    self.location.display(),
                    e
                );
                false
            }
        }
    }
}

/// `<location>.tmp`, keeping the full file name so distinct stores never collide
fn temp_path_for(location: &Path) -> PathBuf {
    let mut name = location.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    location.with_file_name(name)
}
