//! Decoding of raw wait statuses into a termination disposition.

use nix::errno::Errno;
use nix::sys::wait::{waitpid, WaitStatus};
use nix::unistd::Pid;
use serde::Serialize;

/// Offset added to a terminating signal number to form the reported exit status.
pub const SIGNAL_EXIT_OFFSET: i32 = 128;

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Termination {
    /// `exit(code)`.
    Exited { code: i32 },
    /// Killed by signal `signal`.
    Signaled { signal: i32 },
}

impl Termination {
    /// Classify a final wait status. Returns `None` for non-final statuses
    /// (stopped, continued, ptrace stops, still alive).
    pub fn from_wait_status(status: WaitStatus) -> Option<Self> {
        match status {
            WaitStatus::Exited(_, code) => Some(Termination::Exited { code }),
            WaitStatus::Signaled(_, sig, _) => Some(Termination::Signaled { signal: sig as i32 }),
            _ => None,
        }
    }

    /// Exit status as reported in an outcome: the exit code, or `128 + signal`.
    pub fn exit_status(self) -> i32 {
        match self {
            Termination::Exited { code } => code,
            Termination::Signaled { signal } => SIGNAL_EXIT_OFFSET + signal,
        }
    }

    /// Terminating signal, 0 when the process exited.
    pub fn signal(self) -> i32 {
        match self {
            Termination::Exited { .. } => 0,
            Termination::Signaled { signal } => signal,
        }
    }

    /// Exit code 0 and no signal: the only case with a return value.
    pub fn is_clean(self) -> bool {
        matches!(self, Termination::Exited { code: 0 })
    }
}

/// Blocking `waitpid(pid, 0)`, retrying on `EINTR`.
pub fn waitpid_blocking(pid: Pid) -> nix::Result<WaitStatus> {
    loop {
        match waitpid(pid, None) {
            Err(Errno::EINTR) => continue,
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nix::sys::signal::Signal;

    fn pid() -> Pid {
        Pid::from_raw(1234)
    }

    #[test]
    fn test_exited_zero_is_clean() {
        let t = Termination::from_wait_status(WaitStatus::Exited(pid(), 0)).unwrap();
        assert!(t.is_clean());
        assert_eq!(t.exit_status(), 0);
        assert_eq!(t.signal(), 0);
    }

    #[test]
    fn test_exited_nonzero_keeps_code() {
        let t = Termination::from_wait_status(WaitStatus::Exited(pid(), 3)).unwrap();
        assert!(!t.is_clean());
        assert_eq!(t.exit_status(), 3);
        assert_eq!(t.signal(), 0);
    }

    #[test]
    fn test_signaled_adds_offset() {
        let t = Termination::from_wait_status(WaitStatus::Signaled(pid(), Signal::SIGKILL, false))
            .unwrap();
        assert!(!t.is_clean());
        assert_eq!(t.exit_status(), 137);
        assert_eq!(t.signal(), 9);

        let t = Termination::from_wait_status(WaitStatus::Signaled(pid(), Signal::SIGSEGV, true))
            .unwrap();
        assert_eq!(t.exit_status(), 128 + 11);
    }

    #[test]
    fn test_non_final_statuses_are_skipped() {
        assert_eq!(
            Termination::from_wait_status(WaitStatus::Stopped(pid(), Signal::SIGSTOP)),
            None
        );
        assert_eq!(Termination::from_wait_status(WaitStatus::Continued(pid())), None);
        assert_eq!(Termination::from_wait_status(WaitStatus::StillAlive), None);
    }

    #[test]
    fn test_serializes_with_kind_tag() {
        let v = serde_json::to_value(Termination::Signaled { signal: 15 }).unwrap();
        assert_eq!(v["kind"], "signaled");
        assert_eq!(v["signal"], 15);
    }
}
