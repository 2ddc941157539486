//! `forkrun run`: fork, spawn PROGRAM inside the child with captured stdio, report.

use std::io::{self, Write};
use std::os::unix::process::ExitStatusExt;
use std::path::PathBuf;
use std::process::{Command, ExitStatus};
use std::time::Instant;

use anyhow::{Context, Result};
use forkrun_core::config::ForkConfig;
use forkrun_process::{ForkBuilder, Outcome, SIGNAL_EXIT_OFFSET};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::observability;

/// Return value of the forked child: how the wrapped program ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandReport {
    pub code: Option<i32>,
    pub signal: Option<i32>,
}

impl CommandReport {
    pub fn from_status(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
            signal: status.signal(),
        }
    }

    /// Shell-style exit code: the program's code, or `128 + signal`.
    pub fn exit_code(&self) -> i32 {
        match (self.code, self.signal) {
            (Some(code), _) => code,
            (None, Some(sig)) => SIGNAL_EXIT_OFFSET + sig,
            (None, None) => 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub command: Vec<String>,
    pub config: ForkConfig,
    pub json: bool,
}

/// Environment defaults with CLI flags applied on top.
pub fn resolve_config(
    base: ForkConfig,
    no_capture_stdout: bool,
    no_capture_stderr: bool,
    nice: Option<i32>,
    workspace_root: Option<PathBuf>,
) -> ForkConfig {
    ForkConfig {
        workspace_root: workspace_root.or(base.workspace_root),
        nice_level: nice.unwrap_or(base.nice_level),
        capture_stdout: base.capture_stdout && !no_capture_stdout,
        capture_stderr: base.capture_stderr && !no_capture_stderr,
    }
}

/// Fork, run the program in the child, and wait for the outcome.
pub fn execute(opts: &RunOptions) -> Result<Outcome<CommandReport>> {
    let (program, args) = opts
        .command
        .split_first()
        .context("missing PROGRAM to run")?;
    let program = program.clone();
    let args = args.to_vec();

    let started = Instant::now();
    let child = ForkBuilder::from_config(
        move |_ctx| {
            let status = Command::new(&program)
                .args(&args)
                .status()
                .with_context(|| format!("failed to spawn '{}'", program))?;
            Ok(CommandReport::from_status(status))
        },
        &opts.config,
    )
    .spawn()
    .context("failed to fork child")?;

    let pid = child.pid().as_raw();
    tracing::debug!(pid, cmd = ?opts.command, "child started");
    observability::audit_execution_started(pid, &opts.command);

    let outcome = child.wait().context("failed to collect child outcome")?;

    observability::audit_execution_completed(
        pid,
        outcome.exit_status(),
        outcome.signal(),
        started.elapsed().as_millis() as u64,
        outcome.stdout().len(),
        outcome.stderr().len(),
    );
    if outcome.signal() != 0 {
        tracing::warn!(pid, signal = outcome.signal(), "child killed by signal");
    }
    Ok(outcome)
}

/// Exit code for the forkrun process itself.
pub fn exit_code_for(outcome: &Outcome<CommandReport>) -> i32 {
    outcome
        .retval()
        .map(CommandReport::exit_code)
        .unwrap_or_else(|| outcome.exit_status())
}

pub fn outcome_json(outcome: &Outcome<CommandReport>) -> serde_json::Value {
    json!({
        "exit_status": outcome.exit_status(),
        "signal": outcome.signal(),
        "termination": outcome.termination(),
        "retval": outcome.retval(),
        "stdout": outcome.stdout_lossy(),
        "stderr": outcome.stderr_lossy(),
    })
}

/// Print the outcome: JSON document, or captured bytes replayed on our own streams.
pub fn report(outcome: &Outcome<CommandReport>, as_json: bool) -> Result<()> {
    if as_json {
        let doc = serde_json::to_string_pretty(&outcome_json(outcome))?;
        println!("{}", doc);
        return Ok(());
    }
    let mut stdout = io::stdout().lock();
    stdout.write_all(outcome.stdout())?;
    stdout.flush()?;
    let mut stderr = io::stderr().lock();
    stderr.write_all(outcome.stderr())?;
    stderr.flush()?;
    Ok(())
}

pub fn run(opts: &RunOptions) -> Result<i32> {
    let outcome = execute(opts)?;
    report(&outcome, opts.json)?;
    Ok(exit_code_for(&outcome))
}
