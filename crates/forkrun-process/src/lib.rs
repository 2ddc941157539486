//! Run a closure in a forked child process and collect, after it finishes, its
//! return value, its captured stdout/stderr and how it terminated.
//!
//! - Clean exit: [`Outcome::retval`] holds the decoded value.
//! - Error or panic in the child: exit status [`EXIT_STATUS_FAULT`] and a crash
//!   description in the captured stderr.
//! - Killed by signal `S`: exit status `128 + S`, [`Outcome::signal`] is `S`.

#[cfg(not(unix))]
compile_error!("forkrun-process relies on fork(2) and only builds on Unix platforms");

mod capture;
mod child;
pub mod codec;
mod controller;
pub mod error;
mod outcome;
mod role;
pub mod status;
pub mod workspace;

pub use capture::{CaptureStream, StdStream};
pub use child::{ChildContext, Hook, Task};
pub use codec::{JsonCodec, ResultCodec};
pub use controller::{ForkBuilder, ForkedFunc};
pub use error::{ForkError, Result, EXIT_STATUS_FAULT};
pub use outcome::Outcome;
pub use role::Role;
pub use status::{waitpid_blocking, Termination, SIGNAL_EXIT_OFFSET};
pub use workspace::Workspace;

pub use nix::sys::wait::WaitStatus;
pub use nix::unistd::Pid;
