use checklog::{Range, ScanConfig, ScanReport, Status};

/// Everything the plugin output is rendered from
pub struct CheckOutcome {
    pub config: ScanConfig,
    pub report: ScanReport,
    pub status: Status,
    pub warning: Range,
    pub critical: Range,
}

impl CheckOutcome {
    /// `STATUS: message | perfdata`, the single line a monitoring host parses
    pub fn plugin_line(&self) -> String {
        format!(
            "{}: Found {} matches for {} in {} | {}",
            self.status,
            self.report.total_matches,
            self.config.pattern,
            self.config.logfile,
            self.perf_data()
        )
    }

    fn perf_data(&self) -> String {
        format!(
            "matches={};{};{};0;",
            self.report.total_matches, self.warning, self.critical
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.report)
    }
}

pub fn unknown_line(err: &anyhow::Error) -> String {
    format!("{}: {:#}", Status::Unknown, err)
}
