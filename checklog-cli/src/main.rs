use anyhow::Context;
use checklog::{check_logs, CliOverrides, Range, ScanConfig, Status};
use clap::Parser;
use std::{num::NonZeroUsize, path::PathBuf, process::ExitCode};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod report;

use report::CheckOutcome;

/// Counts new lines matching a pattern in log files since the last run
#[derive(Parser)]
#[command(name = "check_log", author, version, about, long_about = None)]
struct Cli {
    /// Log file to check (glob patterns allowed) [default: /var/log/syslog]
    #[arg(short = 'F', long)]
    logfile: Option<String>,

    /// Pattern to apply (regex) [default: ERROR]
    #[arg(short = 'q', long)]
    pattern: Option<String>,

    /// Pattern to ignore after a match (regex)
    #[arg(short = 'i', long = "ignore")]
    ignore_pattern: Option<String>,

    /// Warning threshold range [default: 1]
    #[arg(short = 'w', long)]
    warning: Option<String>,

    /// Critical threshold range [default: 1]
    #[arg(short = 'c', long)]
    critical: Option<String>,

    /// Alternate state file location [default: ~/.check-log.state]
    #[arg(short = 'O', long = "state-file")]
    state_file: Option<PathBuf>,

    /// Number of worker threads [default: CPU cores]
    #[arg(short = 'j', long)]
    threads: Option<NonZeroUsize>,

    /// Additional YAML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log level for diagnostics on stderr (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Print the full scan report as JSON instead of the plugin line
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn overrides(&self) -> CliOverrides {
        CliOverrides {
            logfile: self.logfile.clone(),
            pattern: self.pattern.clone(),
            ignore_pattern: self.ignore_pattern.clone(),
            warning: self.warning.clone(),
            critical: self.critical.clone(),
            state_path: self.state_file.clone(),
            thread_count: self.threads,
            log_level: self.log_level.clone(),
        }
    }
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            // Usage errors must not read as CRITICAL to the monitoring host
            let code = if e.use_stderr() {
                Status::Unknown.exit_code()
            } else {
                Status::Ok.exit_code()
            };
            return ExitCode::from(code);
        }
    };

    let rendered = run(&cli).and_then(|outcome| {
        let output = if cli.json {
            outcome.to_json()?
        } else {
            outcome.plugin_line()
        };
        Ok((output, outcome.status))
    });

    let status = match rendered {
        Ok((output, status)) => {
            println!("{}", output);
            status
        }
        Err(e) => {
            println!("{}", report::unknown_line(&e));
            Status::Unknown
        }
    };

    ExitCode::from(status.exit_code())
}

fn run(cli: &Cli) -> anyhow::Result<CheckOutcome> {
    let config = ScanConfig::load_from(cli.config.as_deref())
        .context("failed to load configuration")?
        .merge_with_cli(cli.overrides());
    init_logging(&config.log_level);
    debug!("Resolved configuration: {:?}", config);

    // Thresholds are validated before any file is read
    let warning = Range::parse(&config.warning).context("bad warning threshold")?;
    let critical = Range::parse(&config.critical).context("bad critical threshold")?;

    let report = check_logs(&config)?;
    let status = Status::evaluate(report.total_matches, &warning, &critical);

    Ok(CheckOutcome {
        config,
        report,
        status,
        warning,
        critical,
    })
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    // stdout carries the plugin output, diagnostics go to stderr
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
