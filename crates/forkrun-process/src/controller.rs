//! Fork controller: build a run, fork it, wait for it, decode what it left behind.

use std::fs;
use std::io::{self, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use forkrun_core::config::ForkConfig;
use forkrun_core::info_log;
use nix::errno::Errno;
use nix::sys::wait::WaitStatus;
use nix::unistd::Pid;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::child::{run_child, ChildContext, ChildPaths, ChildPlan, Hook, Task};
use crate::codec::{JsonCodec, ResultCodec};
use crate::error::{ForkError, Result};
use crate::outcome::Outcome;
use crate::role::{fork_role, Role};
use crate::status::{waitpid_blocking, Termination};
use crate::workspace::Workspace;

/// Describes a forked run before it starts.
///
/// ```no_run
/// use forkrun_process::ForkBuilder;
/// use std::io::Write;
///
/// let outcome = ForkBuilder::new(|ctx| {
///     writeln!(ctx.stdout(), "hello")?;
///     Ok(42)
/// })
/// .spawn()?
/// .wait()?;
/// assert_eq!(outcome.retval(), Some(&42));
/// # Ok::<(), forkrun_process::ForkError>(())
/// ```
pub struct ForkBuilder<T, C = JsonCodec> {
    task: Task<T>,
    nice_level: i32,
    on_start: Option<Hook>,
    on_exit: Option<Hook>,
    capture_stdout: bool,
    capture_stderr: bool,
    workspace_root: Option<PathBuf>,
    codec: C,
}

impl<T> ForkBuilder<T, JsonCodec>
where
    T: Serialize + DeserializeOwned,
{
    /// Run `fun` in the child. Arguments travel as captures of the closure.
    pub fn new<F>(fun: F) -> Self
    where
        F: FnOnce(&mut ChildContext) -> anyhow::Result<T> + 'static,
    {
        Self::from_config(fun, &ForkConfig::default())
    }

    /// Run `fun(ctx, args)` in the child. Use a tuple for positional arguments or a
    /// struct for named ones.
    pub fn with_args<A, F>(fun: F, args: A) -> Self
    where
        A: 'static,
        F: FnOnce(&mut ChildContext, A) -> anyhow::Result<T> + 'static,
    {
        Self::new(move |ctx| fun(ctx, args))
    }

    /// Like [`ForkBuilder::new`], with defaults taken from `config`.
    pub fn from_config<F>(fun: F, config: &ForkConfig) -> Self
    where
        F: FnOnce(&mut ChildContext) -> anyhow::Result<T> + 'static,
    {
        Self {
            task: Box::new(fun),
            nice_level: config.nice_level,
            on_start: None,
            on_exit: None,
            capture_stdout: config.capture_stdout,
            capture_stderr: config.capture_stderr,
            workspace_root: config.workspace_root.clone(),
            codec: JsonCodec,
        }
    }
}

impl<T, C> ForkBuilder<T, C>
where
    T: Serialize + DeserializeOwned,
    C: ResultCodec,
{
    /// Niceness increment applied in the child before any user code. 0 = unchanged.
    pub fn nice_level(mut self, level: i32) -> Self {
        self.nice_level = level;
        self
    }

    /// Hook run first in the child.
    pub fn child_on_start<H>(mut self, hook: H) -> Self
    where
        H: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.on_start = Some(Box::new(hook));
        self
    }

    /// Hook run after the task's value has been stored; skipped when anything failed.
    pub fn child_on_exit<H>(mut self, hook: H) -> Self
    where
        H: FnOnce() -> anyhow::Result<()> + 'static,
    {
        self.on_exit = Some(Box::new(hook));
        self
    }

    pub fn capture_stdout(mut self, capture: bool) -> Self {
        self.capture_stdout = capture;
        self
    }

    pub fn capture_stderr(mut self, capture: bool) -> Self {
        self.capture_stderr = capture;
        self
    }

    pub fn workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn codec<C2: ResultCodec>(self, codec: C2) -> ForkBuilder<T, C2> {
        ForkBuilder {
            task: self.task,
            nice_level: self.nice_level,
            on_start: self.on_start,
            on_exit: self.on_exit,
            capture_stdout: self.capture_stdout,
            capture_stderr: self.capture_stderr,
            workspace_root: self.workspace_root,
            codec,
        }
    }

    /// Create the workspace and fork.
    ///
    /// Returns in the parent only, with the child running. The child executes the
    /// task and terminates with `_exit`; it never comes back here.
    ///
    /// The child is a copy of the calling thread only. If other threads exist, the
    /// task must not depend on locks they may have held at the time of the fork.
    pub fn spawn(self) -> Result<ForkedFunc<T, C>> {
        let ForkBuilder {
            task,
            nice_level,
            on_start,
            on_exit,
            capture_stdout,
            capture_stderr,
            workspace_root,
            codec,
        } = self;

        let workspace = Workspace::create(workspace_root.as_deref())?;
        let paths = ChildPaths {
            retval: workspace.retval_path(),
            stdout: workspace.stdout_path(),
            stderr: workspace.stderr_path(),
        };
        workspace.ensure_file(&paths.retval)?;
        if capture_stdout {
            workspace.ensure_file(&paths.stdout)?;
        }
        if capture_stderr {
            workspace.ensure_file(&paths.stderr)?;
        }

        // Buffered parent output would otherwise be emitted a second time by the child.
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();

        let plan = ChildPlan {
            task,
            nice_level,
            on_start,
            on_exit,
            capture_stdout,
            capture_stderr,
        };

        // SAFETY: the child branch goes straight into `run_child`, which ends in `_exit`.
        match unsafe { fork_role() }? {
            Role::Child => run_child(plan, &paths, &codec),
            Role::Parent { child } => {
                drop(plan);
                info_log!(
                    pid = child.as_raw(),
                    workspace = %workspace.path().display(),
                    "forked child"
                );
                Ok(ForkedFunc {
                    pid: child,
                    workspace,
                    paths,
                    capture_stdout,
                    capture_stderr,
                    codec,
                    _retval: PhantomData,
                })
            }
        }
    }
}

/// Parent-side handle to a running child.
///
/// Dropping it without calling [`ForkedFunc::wait`] removes the workspace but does
/// not reap the child.
pub struct ForkedFunc<T, C = JsonCodec> {
    pid: Pid,
    workspace: Workspace,
    paths: ChildPaths,
    capture_stdout: bool,
    capture_stderr: bool,
    codec: C,
    _retval: PhantomData<fn() -> T>,
}

impl<T, C> ForkedFunc<T, C>
where
    T: DeserializeOwned,
    C: ResultCodec,
{
    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn workspace_path(&self) -> &Path {
        self.workspace.path()
    }

    /// Block until the child terminates, then collect its outcome and remove the
    /// workspace. Consumes the handle: a child can be reaped only once.
    pub fn wait(self) -> Result<Outcome<T>> {
        self.wait_with(waitpid_blocking)
    }

    /// [`ForkedFunc::wait`] with an injected wait function. `waiter` must block until
    /// the child changes state; non-final statuses (stopped, continued) are skipped
    /// and `waiter` is called again.
    pub fn wait_with<W>(mut self, mut waiter: W) -> Result<Outcome<T>>
    where
        W: FnMut(Pid) -> nix::Result<WaitStatus>,
    {
        let termination = loop {
            match waiter(self.pid) {
                Ok(status) => {
                    if let Some(t) = Termination::from_wait_status(status) {
                        break t;
                    }
                    tracing::debug!(pid = self.pid.as_raw(), ?status, "non-final wait status");
                }
                Err(Errno::EINTR) => continue,
                Err(e) => return Err(ForkError::Wait(e)),
            }
        };

        let retval = if termination.is_clean() {
            let bytes = read_capture(&self.paths.retval)?;
            let value = self
                .codec
                .decode(&bytes)
                .map_err(|e| ForkError::Decode(format!("{:#}", e)))?;
            Some(value)
        } else {
            None
        };
        let stdout = if self.capture_stdout {
            read_capture(&self.paths.stdout)?
        } else {
            Vec::new()
        };
        let stderr = if self.capture_stderr {
            read_capture(&self.paths.stderr)?
        } else {
            Vec::new()
        };

        self.workspace.remove()?;

        info_log!(
            pid = self.pid.as_raw(),
            exit_status = termination.exit_status(),
            signal = termination.signal(),
            stdout_len = stdout.len(),
            stderr_len = stderr.len(),
            "child reaped"
        );

        Ok(Outcome::new(termination, retval, stdout, stderr))
    }

    /// Remove the workspace now. Idempotent.
    pub fn cleanup(&mut self) -> Result<()> {
        self.workspace.remove()
    }
}

impl<T, C> Drop for ForkedFunc<T, C> {
    fn drop(&mut self) {
        if let Err(e) = self.workspace.remove() {
            tracing::warn!(pid = self.pid.as_raw(), "failed to remove workspace: {}", e);
        }
    }
}

fn read_capture(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|source| ForkError::ReadCapture {
        path: path.to_path_buf(),
        source,
    })
}
