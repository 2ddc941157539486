use std::path::PathBuf;

use nix::errno::Errno;
use thiserror::Error;

/// Exit status a child reports when the target, a hook, or result encoding fails.
pub const EXIT_STATUS_FAULT: i32 = 3;

/// Host-level failures of the fork/wait protocol.
///
/// Child crashes, faults and signals are not errors: they are reported through
/// [`crate::Outcome`]. These variants cover conditions where the protocol itself
/// could not do its job.
#[derive(Debug, Error)]
pub enum ForkError {
    #[error("workspace I/O failed at {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("fork() failed: {0}")]
    Fork(#[source] Errno),

    #[error("waitpid() failed: {0}")]
    Wait(#[source] Errno),

    #[error("failed to read captured data from {}: {source}", path.display())]
    ReadCapture {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("child exited cleanly but its return value could not be decoded: {0}")]
    Decode(String),
}

pub type Result<T> = std::result::Result<T, ForkError>;
