use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::errors::{CheckError, CheckResult};

/// A monitoring-plugin threshold range.
///
/// | syntax  | alerts when            |
/// |---------|------------------------|
/// | `10`    | `< 0` or `> 10`        |
/// | `10:`   | `< 10`                 |
/// | `~:10`  | `> 10`                 |
/// | `10:20` | `< 10` or `> 20`       |
/// | `@10:20`| `>= 10` and `<= 20`    |
#[derive(Debug, Clone, PartialEq)]
pub struct Range {
    start: f64,
    end: f64,
    /// Alert inside the range instead of outside it
    inside: bool,
    source: String,
}

impl Range {
    pub fn parse(text: &str) -> CheckResult<Self> {
        let source = text.trim();
        let (inside, body) = match source.strip_prefix('@') {
            Some(rest) => (true, rest),
            None => (false, source),
        };
        if body.is_empty() {
            return Err(CheckError::invalid_threshold(format!("empty range {:?}", text)));
        }

        let (start, end) = match body.split_once(':') {
            Some((start, end)) => {
                let start = match start {
                    "~" => f64::NEG_INFINITY,
                    "" => 0.0,
                    s => parse_bound(s, text)?,
                };
                let end = match end {
                    "" => f64::INFINITY,
                    e => parse_bound(e, text)?,
                };
                (start, end)
            }
            None => (0.0, parse_bound(body, text)?),
        };

        if start > end {
            return Err(CheckError::invalid_threshold(format!(
                "start exceeds end in {:?}",
                text
            )));
        }

        Ok(Self {
            start,
            end,
            inside,
            source: source.to_string(),
        })
    }

    /// Returns true if `value` should raise an alert
    pub fn alerts(&self, value: u64) -> bool {
        let value = value as f64;
        let within = value >= self.start && value <= self.end;
        within == self.inside
    }
}

fn parse_bound(bound: &str, range: &str) -> CheckResult<f64> {
    bound
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            CheckError::invalid_threshold(format!("bad bound {:?} in {:?}", bound, range))
        })
}

impl FromStr for Range {
    type Err = CheckError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Monitoring status, ordered by severity except for `Unknown`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Status {
    Ok,
    Warning,
    Critical,
    Unknown,
}

impl Status {
    /// Process exit code expected by monitoring hosts
    pub fn exit_code(self) -> u8 {
        match self {
            Status::Ok => 0,
            Status::Warning => 1,
            Status::Critical => 2,
            Status::Unknown => 3,
        }
    }

    /// Critical wins over warning
    pub fn evaluate(value: u64, warning: &Range, critical: &Range) -> Self {
        if critical.alerts(value) {
            Status::Critical
        } else if warning.alerts(value) {
            Status::Warning
        } else {
            Status::Ok
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Status::Ok => "OK",
            Status::Warning => "WARNING",
            Status::Critical => "CRITICAL",
            Status::Unknown => "UNKNOWN",
        };
        f.write_str(label)
    }
}
