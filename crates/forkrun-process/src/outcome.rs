use std::borrow::Cow;

use crate::status::Termination;

/// Everything the parent learns about a finished child. Built once by
/// [`crate::ForkedFunc::wait`]; read-only afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome<T> {
    termination: Termination,
    retval: Option<T>,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

impl<T> Outcome<T> {
    pub(crate) fn new(
        termination: Termination,
        retval: Option<T>,
        stdout: Vec<u8>,
        stderr: Vec<u8>,
    ) -> Self {
        Self {
            termination,
            retval,
            stdout,
            stderr,
        }
    }

    pub fn termination(&self) -> Termination {
        self.termination
    }

    /// Exit code, or `128 + signal` when the child was killed by a signal.
    pub fn exit_status(&self) -> i32 {
        self.termination.exit_status()
    }

    /// Terminating signal number, 0 if none.
    pub fn signal(&self) -> i32 {
        self.termination.signal()
    }

    /// Present only when the child exited with status 0 and no signal.
    pub fn retval(&self) -> Option<&T> {
        self.retval.as_ref()
    }

    pub fn into_retval(self) -> Option<T> {
        self.retval
    }

    /// Captured standard output; empty when capture was disabled.
    pub fn stdout(&self) -> &[u8] {
        &self.stdout
    }

    /// Captured standard error; empty when capture was disabled.
    pub fn stderr(&self) -> &[u8] {
        &self.stderr
    }

    pub fn stdout_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    pub fn is_success(&self) -> bool {
        self.termination.is_clean()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors_follow_termination() {
        let o: Outcome<i32> = Outcome::new(
            Termination::Signaled { signal: 9 },
            None,
            b"partial".to_vec(),
            Vec::new(),
        );
        assert_eq!(o.exit_status(), 137);
        assert_eq!(o.signal(), 9);
        assert!(!o.is_success());
        assert!(o.retval().is_none());
        assert_eq!(o.stdout_lossy(), "partial");
        assert!(o.stderr().is_empty());
    }

    #[test]
    fn test_into_retval() {
        let o = Outcome::new(Termination::Exited { code: 0 }, Some(42), Vec::new(), Vec::new());
        assert!(o.is_success());
        assert_eq!(o.into_retval(), Some(42));
    }
}
