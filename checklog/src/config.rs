use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::errors::CheckResult;
use crate::scan::DEFAULT_QUEUE_FACTOR;

/// Configuration for a check run.
///
/// # Configuration Locations
///
/// Values are layered from, in increasing order of precedence:
/// 1. Global `$CONFIG_DIR/check-log/config.yaml`
/// 2. Local `.check-log.yaml` in the current directory
/// 3. Custom config file specified via `--config`
///
/// Command-line arguments are applied on top with [`ScanConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Log file path or glob
/// logfile: "/var/log/app/*.log"
///
/// # Lines matching this regex are counted...
/// pattern: "ERROR|FATAL"
///
/// # ...unless they also match this one
/// ignore_pattern: "health-check"
///
/// # Monitoring threshold ranges
/// warning: "5"
/// critical: "20"
///
/// # Where offsets are kept between runs (default: ~/.check-log.state)
/// state_path: "/var/lib/nagios/check-log.state"
///
/// # Worker count (default: CPU cores)
/// thread_count: 4
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Log file path or glob pattern
    #[serde(default = "default_logfile")]
    pub logfile: String,

    /// Pattern a line must match to be counted (regex)
    #[serde(default = "default_pattern")]
    pub pattern: String,

    /// Pattern that excludes an otherwise matching line (regex, empty for none)
    #[serde(default)]
    pub ignore_pattern: String,

    /// Warning threshold range
    #[serde(default = "default_threshold")]
    pub warning: String,

    /// Critical threshold range
    #[serde(default = "default_threshold")]
    pub critical: String,

    /// Explicit state file location, overriding the home directory default
    #[serde(default)]
    pub state_path: Option<PathBuf>,

    /// Number of classifying workers
    /// Defaults to number of CPU cores if not specified
    #[serde(default = "default_thread_count")]
    pub thread_count: NonZeroUsize,

    /// Work queue slots per worker
    #[serde(default = "default_queue_factor")]
    pub queue_factor: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_logfile() -> String {
    "/var/log/syslog".to_string()
}

fn default_pattern() -> String {
    "ERROR".to_string()
}

fn default_threshold() -> String {
    "1".to_string()
}

pub fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_queue_factor() -> NonZeroUsize {
    NonZeroUsize::new(DEFAULT_QUEUE_FACTOR).unwrap_or(NonZeroUsize::MIN)
}

pub fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            logfile: default_logfile(),
            pattern: default_pattern(),
            ignore_pattern: String::new(),
            warning: default_threshold(),
            critical: default_threshold(),
            state_path: None,
            thread_count: default_thread_count(),
            queue_factor: default_queue_factor(),
            log_level: default_log_level(),
        }
    }
}

/// Command-line overrides; `None` leaves the file value in place
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOverrides {
    pub logfile: Option<String>,
    pub pattern: Option<String>,
    pub ignore_pattern: Option<String>,
    pub warning: Option<String>,
    pub critical: Option<String>,
    pub state_path: Option<PathBuf>,
    pub thread_count: Option<NonZeroUsize>,
    pub log_level: Option<String>,
}

impl ScanConfig {
    /// Loads configuration from the default locations
    pub fn load() -> CheckResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration from the default locations plus a specific file, which
    /// must exist
    pub fn load_from(config_path: Option<&Path>) -> CheckResult<Self> {
        let mut builder = ConfigBuilder::builder();

        let defaults = [
            dirs::config_dir().map(|p| p.join("check-log/config.yaml")),
            Some(PathBuf::from(".check-log.yaml")),
        ];
        for path in defaults.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }
        if let Some(path) = config_path {
            builder = builder.add_source(File::from(path).required(true));
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: CliOverrides) -> Self {
        // CLI values take precedence over config file values
        if let Some(logfile) = cli.logfile {
            self.logfile = logfile;
        }
        if let Some(pattern) = cli.pattern {
            self.pattern = pattern;
        }
        if let Some(ignore_pattern) = cli.ignore_pattern {
            self.ignore_pattern = ignore_pattern;
        }
        if let Some(warning) = cli.warning {
            self.warning = warning;
        }
        if let Some(critical) = cli.critical {
            self.critical = critical;
        }
        if cli.state_path.is_some() {
            self.state_path = cli.state_path;
        }
        if let Some(thread_count) = cli.thread_count {
            self.thread_count = thread_count;
        }
        if let Some(log_level) = cli.log_level {
            self.log_level = log_level;
        }
        self
    }
}
