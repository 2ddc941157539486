//! Observability: tracing init and the JSONL audit log.
//!
//! Uses config::ObservabilityConfig for FORKRUN_QUIET, FORKRUN_LOG_LEVEL, FORKRUN_AUDIT_LOG.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use chrono::Utc;
use forkrun_core::config::ObservabilityConfig;
use serde_json::json;
use tracing_subscriber::{prelude::*, EnvFilter};

/// Initialize tracing. Call at process startup.
/// When FORKRUN_QUIET=1 only WARN and above are logged. RUST_LOG wins over both.
pub fn init_tracing() {
    let cfg = ObservabilityConfig::from_env();
    let level = if cfg.quiet {
        "forkrun=warn".to_string()
    } else {
        cfg.log_level.clone()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    // Logs go to stderr so captured output replayed on stdout stays clean.
    let _ = if cfg.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(true)
                    .with_thread_ids(false),
            )
            .try_init()
    };
}

fn audit_path() -> Option<&'static str> {
    let path = ObservabilityConfig::from_env().audit_log.as_deref()?;
    if let Some(parent) = Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    Some(path)
}

fn append_jsonl(path: &str, record: &serde_json::Value) {
    if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(path) {
        if let Ok(line) = serde_json::to_string(record) {
            let _ = writeln!(f, "{}", line);
        }
    }
}

fn now() -> String {
    Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}

pub fn execution_started_record(pid: i32, cmd: &[String]) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": "execution_started",
        "pid": pid,
        "cmd": cmd,
    })
}

pub fn execution_completed_record(
    pid: i32,
    exit_status: i32,
    signal: i32,
    duration_ms: u64,
    stdout_len: usize,
    stderr_len: usize,
) -> serde_json::Value {
    json!({
        "ts": now(),
        "event": "execution_completed",
        "pid": pid,
        "exit_status": exit_status,
        "signal": signal,
        "duration_ms": duration_ms,
        "stdout_len": stdout_len,
        "stderr_len": stderr_len,
        "success": exit_status == 0 && signal == 0,
    })
}

/// Audit: execution_started (right after fork)
pub fn audit_execution_started(pid: i32, cmd: &[String]) {
    if let Some(path) = audit_path() {
        append_jsonl(path, &execution_started_record(pid, cmd));
    }
}

/// Audit: execution_completed (after the child was reaped)
pub fn audit_execution_completed(
    pid: i32,
    exit_status: i32,
    signal: i32,
    duration_ms: u64,
    stdout_len: usize,
    stderr_len: usize,
) {
    if let Some(path) = audit_path() {
        let record = execution_completed_record(
            pid,
            exit_status,
            signal,
            duration_ms,
            stdout_len,
            stderr_len,
        );
        append_jsonl(path, &record);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completed_record_marks_signal_as_failure() {
        let r = execution_completed_record(10, 137, 9, 5, 0, 0);
        assert_eq!(r["event"], "execution_completed");
        assert_eq!(r["success"], false);
        assert_eq!(r["signal"], 9);
        assert!(r["ts"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn test_append_jsonl_writes_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let path = path.to_str().unwrap();
        append_jsonl(path, &execution_started_record(1, &["true".to_string()]));
        append_jsonl(path, &execution_completed_record(1, 0, 0, 1, 0, 0));
        let content = std::fs::read_to_string(path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["cmd"][0], "true");
    }
}
