//! Child side of the fork: capture, run, encode, exit.
//!
//! Everything here executes in the forked process and ends in `_exit`, so the
//! parent's destructors never run in the child. Nothing logs through `tracing`
//! because stderr may be a capture file.

use std::fs::File;
use std::io::{self, Write};
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Mutex;

use anyhow::Context;
use nix::unistd;
use serde::Serialize;

use crate::capture::{write_std, CaptureStream, StdStream};
use crate::codec::ResultCodec;
use crate::error::EXIT_STATUS_FAULT;

/// Zero-argument hook run inside the child.
pub type Hook = Box<dyn FnOnce() -> anyhow::Result<()>>;

/// Unit of work executed inside the child.
pub type Task<T> = Box<dyn FnOnce(&mut ChildContext) -> anyhow::Result<T>>;

/// Execution context passed to the task.
///
/// `stdout()` and `stderr()` write without user-space buffering, so output produced
/// right before a crash is still on disk. Plain `print!` reaches the same capture
/// file through fd 1; whatever the std line buffer still holds is flushed before
/// the child exits.
#[derive(Debug)]
pub struct ChildContext {
    stdout: CaptureStream,
    stderr: CaptureStream,
}

impl ChildContext {
    fn open(paths: &ChildPaths, capture_stdout: bool, capture_stderr: bool) -> io::Result<Self> {
        let stdout = if capture_stdout {
            CaptureStream::redirect(StdStream::Stdout, &paths.stdout)?
        } else {
            CaptureStream::Inherited(StdStream::Stdout)
        };
        let stderr = if capture_stderr {
            CaptureStream::redirect(StdStream::Stderr, &paths.stderr)?
        } else {
            CaptureStream::Inherited(StdStream::Stderr)
        };
        Ok(Self { stdout, stderr })
    }

    pub fn stdout(&mut self) -> &mut CaptureStream {
        &mut self.stdout
    }

    pub fn stderr(&mut self) -> &mut CaptureStream {
        &mut self.stderr
    }

    /// Pid of the child process.
    pub fn pid(&self) -> u32 {
        std::process::id()
    }
}

/// Workspace file paths, resolved in the parent before forking.
#[derive(Debug, Clone)]
pub(crate) struct ChildPaths {
    pub retval: PathBuf,
    pub stdout: PathBuf,
    pub stderr: PathBuf,
}

/// What the child does, in order.
pub(crate) struct ChildPlan<T> {
    pub task: Task<T>,
    pub nice_level: i32,
    pub on_start: Option<Hook>,
    pub on_exit: Option<Hook>,
    pub capture_stdout: bool,
    pub capture_stderr: bool,
}

static PANIC_REPORT: Mutex<Option<String>> = Mutex::new(None);

/// Child entry point. Never returns.
pub(crate) fn run_child<T, C>(plan: ChildPlan<T>, paths: &ChildPaths, codec: &C) -> !
where
    T: Serialize,
    C: ResultCodec,
{
    record_panics();

    let status = match ChildContext::open(paths, plan.capture_stdout, plan.capture_stderr) {
        Ok(mut ctx) => {
            let status = execute(plan, &mut ctx, paths, codec);
            drop(ctx);
            flush_std_streams();
            status
        }
        Err(e) => {
            let msg = format!("forkrun: failed to set up output capture: {}\n", e);
            let _ = write_std(StdStream::Stderr, msg.as_bytes());
            EXIT_STATUS_FAULT
        }
    };

    terminate(status)
}

fn execute<T, C>(plan: ChildPlan<T>, ctx: &mut ChildContext, paths: &ChildPaths, codec: &C) -> i32
where
    T: Serialize,
    C: ResultCodec,
{
    let ChildPlan {
        task,
        nice_level,
        on_start,
        on_exit,
        ..
    } = plan;

    if nice_level != 0 {
        adjust_priority(nice_level);
    }

    let result = panic::catch_unwind(AssertUnwindSafe(|| -> anyhow::Result<()> {
        let mut retval = File::create(&paths.retval).context("failed to open retval file")?;
        if let Some(hook) = on_start {
            hook().context("child_on_start hook failed")?;
        }
        let value = task(&mut *ctx)?;
        let bytes = codec
            .encode(&value)
            .with_context(|| format!("failed to encode return value ({})", codec.name()))?;
        retval
            .write_all(&bytes)
            .context("failed to write retval file")?;
        drop(retval);
        if let Some(hook) = on_exit {
            hook().context("child_on_exit hook failed")?;
        }
        Ok(())
    }));

    let description = match result {
        Ok(Ok(())) => return 0,
        Ok(Err(e)) => format!("{:#}", e),
        Err(payload) => take_panic_report().unwrap_or_else(|| panic_message(payload.as_ref())),
    };
    let _ = writeln!(ctx.stderr(), "{}", description.trim_end());
    EXIT_STATUS_FAULT
}

/// Best-effort niceness change; failures are ignored.
fn adjust_priority(increment: i32) {
    // SAFETY: nice(2) has no memory-safety preconditions.
    unsafe {
        libc::nice(increment);
    }
}

/// Replace the panic hook so the report (message and location) can be written to the
/// captured stderr instead of whatever sink the parent had installed.
fn record_panics() {
    panic::set_hook(Box::new(|info| {
        if let Ok(mut slot) = PANIC_REPORT.lock() {
            *slot = Some(info.to_string());
        }
    }));
}

fn take_panic_report() -> Option<String> {
    PANIC_REPORT.lock().ok().and_then(|mut slot| slot.take())
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panicked: {}", s)
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panicked: {}", s)
    } else {
        "panicked with a non-string payload".to_string()
    }
}

/// Push out `print!`/`eprint!` text that has no trailing newline yet.
fn flush_std_streams() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}

fn terminate(status: i32) -> ! {
    let _ = unistd::close(libc::STDOUT_FILENO);
    let _ = unistd::close(libc::STDERR_FILENO);
    // SAFETY: `_exit` skips destructors and atexit handlers, which belong to the
    // parent's copy of the program state.
    unsafe { libc::_exit(status) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_panic_message_from_payloads() {
        let p: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(p.as_ref()), "panicked: boom");
        let p: Box<dyn std::any::Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(p.as_ref()), "panicked: owned");
        let p: Box<dyn std::any::Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(p.as_ref()), "panicked with a non-string payload");
    }
}
