pub mod config;
pub mod errors;
pub mod files;
pub mod identity;
pub mod metrics;
pub mod results;
pub mod scan;
pub mod state;
pub mod threshold;

pub use config::{CliOverrides, ScanConfig};
pub use errors::{CheckError, CheckResult};
pub use identity::{FileIdentity, IdentityProbe};
pub use results::{FileScan, FileStatus, ScanReport};
pub use scan::{check_logs, ScanPipeline, ScanRequest};
pub use state::OffsetStore;
pub use threshold::{Range, Status};
