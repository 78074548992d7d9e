use anyhow::Result;
use checklog::{check_logs, FileStatus, OffsetStore, ScanConfig, ScanPipeline, ScanRequest};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn write_lines(path: &Path, lines: &[&str]) -> Result<()> {
    let mut file = File::create(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

fn append_lines(path: &Path, lines: &[&str]) -> Result<()> {
    let mut file = OpenOptions::new().append(true).open(path)?;
    for line in lines {
        writeln!(file, "{}", line)?;
    }
    Ok(())
}

fn scan<P: AsRef<Path>>(files: &[P], pattern: &str, ignore: &str, state: &Path) -> Result<u64> {
    let request = ScanRequest::new(files, pattern, ignore);
    let pipeline = ScanPipeline::new(request, NonZeroUsize::new(4).unwrap())?;
    let mut store = OffsetStore::load(Some(state));
    Ok(pipeline.run(&mut store)?.total_matches)
}

fn config_for(logfile: &Path, pattern: &str, ignore: &str, state: &Path) -> ScanConfig {
    ScanConfig {
        logfile: logfile.display().to_string(),
        pattern: pattern.to_string(),
        ignore_pattern: ignore.to_string(),
        state_path: Some(state.to_path_buf()),
        ..ScanConfig::default()
    }
}

#[test]
fn test_ignore_pattern_scenario() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    // Last line without a newline still counts
    fs::write(&log, "foo\nfoobar\nfoo")?;

    let total = scan(&[&log], "foo", "foobar", &dir.path().join("s.state"))?;
    assert_eq!(total, 2);
    Ok(())
}

#[test]
fn test_empty_ignore_pattern_excludes_nothing() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    write_lines(&log, &["foo", "foobar", "foo"])?;

    let total = scan(&[&log], "foo", "", &dir.path().join("s.state"))?;
    assert_eq!(total, 3);
    Ok(())
}

#[test]
fn test_rescan_of_unchanged_file_finds_nothing() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    write_lines(&log, &["ERROR one", "INFO two", "ERROR three"])?;

    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 2);
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 0);
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 0);
    Ok(())
}

#[test]
fn test_appended_lines_are_counted_once() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    let history: Vec<String> = (0..500).map(|i| format!("ERROR old {}", i)).collect();
    let history: Vec<&str> = history.iter().map(String::as_str).collect();
    write_lines(&log, &history)?;

    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 500);

    append_lines(&log, &["ERROR new 1", "INFO noise", "ERROR new 2", "ERROR new 3"])?;
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 3);
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_rotated_file_is_read_from_start() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    write_lines(&log, &["ERROR a", "ERROR b", "ERROR c", "ERROR d"])?;
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 4);

    // New file, shorter than the recorded offset, renamed into place
    let fresh = dir.path().join("app.log.1");
    write_lines(&fresh, &["ERROR z"])?;
    fs::rename(&fresh, &log)?;

    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 1);
    Ok(())
}

#[test]
fn test_truncated_file_is_read_from_start() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    write_lines(&log, &["ERROR a", "ERROR b", "ERROR c"])?;
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 3);

    write_lines(&log, &["ERROR x"])?;
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 1);
    Ok(())
}

#[test]
fn test_patterns_keep_independent_offsets() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    write_lines(&log, &["ERROR a", "WARN b", "ERROR c", "WARN d", "WARN e"])?;

    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 2);
    assert_eq!(scan(&[&log], "WARN", "", &state)?, 3);
    // WARN's run touched the file, ERROR still resumes where it stopped
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 0);

    append_lines(&log, &["ERROR f", "WARN g"])?;
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 1);
    assert_eq!(scan(&[&log], "WARN", "", &state)?, 1);

    // A new ignore pattern is a new namespace too
    assert_eq!(scan(&[&log], "WARN", "g$", &state)?, 3);
    Ok(())
}

#[test]
fn test_glob_of_four_files() -> Result<()> {
    let dir = tempdir()?;
    let mut logs = Vec::new();
    for i in 0..4 {
        let log = dir.path().join(format!("service{}.log", i));
        write_lines(&log, &["foo start", "bar", "foo end"])?;
        logs.push(log);
    }
    fs::write(dir.path().join("notes.txt"), "foo foo foo\n")?;
    let state = dir.path().join("s.state");

    let config = config_for(&dir.path().join("*.log"), "foo", "", &state);
    let report = check_logs(&config)?;
    assert_eq!(report.total_matches, 8);
    assert_eq!(report.files.len(), 4);

    let store = OffsetStore::load(Some(&state));
    for log in &logs {
        let size = fs::metadata(log)?.len();
        assert_eq!(store.get(log, "foo", ""), size);
    }
    Ok(())
}

#[test]
fn test_unreadable_file_does_not_abort_run() -> Result<()> {
    let dir = tempdir()?;
    let good = dir.path().join("good.log");
    let missing = dir.path().join("missing.log");
    write_lines(&good, &["ERROR a", "ERROR b"])?;
    let state = dir.path().join("s.state");

    let request = ScanRequest::new([&missing, &good], "ERROR", "");
    let pipeline = ScanPipeline::new(request, NonZeroUsize::new(2).unwrap())?;
    let mut store = OffsetStore::load(Some(&state));
    let report = pipeline.run(&mut store)?;

    assert_eq!(report.total_matches, 2);
    assert!(matches!(report.files[0].status, FileStatus::OpenFailed(_)));
    assert_eq!(report.files[1].status, FileStatus::Scanned);
    assert_eq!(report.stats.files_failed, 1);

    let reloaded = OffsetStore::load(Some(&state));
    assert!(reloaded.entry(&missing, "ERROR", "").is_none());
    Ok(())
}

#[test]
fn test_corrupted_state_rescans_everything() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    write_lines(&log, &["ERROR a", "ERROR b"])?;

    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 2);
    fs::write(&state, "garbage")?;

    // Double counting after a lost store is expected
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 2);
    assert_eq!(scan(&[&log], "ERROR", "", &state)?, 0);
    Ok(())
}

#[test]
fn test_state_file_is_inspectable_json() -> Result<()> {
    let dir = tempdir()?;
    let log = dir.path().join("app.log");
    let state = dir.path().join("s.state");
    write_lines(&log, &["ERROR a"])?;

    scan(&[&log], "ERROR", "debug", &state)?;

    let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&state)?)?;
    assert_eq!(json["file"], state.display().to_string());
    assert!(json["timestamp"].is_string());
    let logfile = &json["logfiles"][log.display().to_string()];
    assert_eq!(logfile["identity"]["size"], 8);
    assert_eq!(logfile["patterns"]["ERROR"]["debug"]["offset"], 8);
    assert!(logfile["patterns"]["ERROR"]["debug"]["last_updated"].is_string());
    Ok(())
}

#[test]
fn test_many_files_many_workers_totals_match() -> Result<()> {
    let dir = tempdir()?;
    let mut logs: Vec<PathBuf> = Vec::new();
    let mut expected = 0u64;
    for i in 0..12 {
        let log = dir.path().join(format!("shard{:02}.log", i));
        let mut file = File::create(&log)?;
        for j in 0..(i * 37 + 5) {
            if j % 3 == 0 {
                writeln!(file, "ERROR shard {} line {}", i, j)?;
                if j % 2 == 0 {
                    expected += 1;
                }
            } else {
                writeln!(file, "INFO shard {} line {}", i, j)?;
            }
        }
        logs.push(log);
    }

    for workers in [1, 2, 5, 16] {
        let state = dir.path().join(format!("w{}.state", workers));
        let request = ScanRequest::new(&logs, "ERROR", r"line \d*[13579]$");
        let pipeline = ScanPipeline::new(request, NonZeroUsize::new(workers).unwrap())?;
        let mut store = OffsetStore::load(Some(&state));
        assert_eq!(pipeline.run(&mut store)?.total_matches, expected);
    }
    Ok(())
}
