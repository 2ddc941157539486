//! Unbuffered capture streams for the child side.
//!
//! A captured stream is a workspace file that is also `dup2`'d onto the process-wide
//! descriptor, so both explicit writers and anything writing to fd 1/2 land in the
//! same open file description. Every write is followed by a flush: the child may die
//! at any instruction and nothing buffered in user space would survive.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::fd::{AsRawFd, RawFd};
use std::path::Path;

use nix::unistd;

/// Which process-wide stream a [`CaptureStream`] stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StdStream {
    Stdout,
    Stderr,
}

impl StdStream {
    pub fn fd(self) -> RawFd {
        match self {
            StdStream::Stdout => libc::STDOUT_FILENO,
            StdStream::Stderr => libc::STDERR_FILENO,
        }
    }
}

/// Writer handed to child code. Nothing is buffered in user space: each write
/// goes straight to the descriptor.
#[derive(Debug)]
pub enum CaptureStream {
    /// Stream redirected into a workspace file.
    File(File),
    /// Capture disabled: forwards to the inherited process stream.
    Inherited(StdStream),
}

impl CaptureStream {
    /// Open `path` for writing and make it the target of `stream`'s descriptor.
    pub fn redirect(stream: StdStream, path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        dup_onto(&file, stream.fd())?;
        Ok(CaptureStream::File(file))
    }

    pub fn is_captured(&self) -> bool {
        matches!(self, CaptureStream::File(_))
    }
}

impl Write for CaptureStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = match self {
            CaptureStream::File(f) => f.write(buf)?,
            CaptureStream::Inherited(stream) => write_std(*stream, buf)?,
        };
        self.flush()?;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            CaptureStream::File(f) => f.flush(),
            CaptureStream::Inherited(_) => Ok(()),
        }
    }
}

/// Single `write(2)` on the process-wide descriptor, bypassing the std line buffer.
pub(crate) fn write_std(stream: StdStream, buf: &[u8]) -> io::Result<usize> {
    let n = match stream {
        StdStream::Stdout => unistd::write(io::stdout(), buf)?,
        StdStream::Stderr => unistd::write(io::stderr(), buf)?,
    };
    Ok(n)
}

fn dup_onto(file: &File, target: RawFd) -> io::Result<()> {
    unistd::dup2(file.as_raw_fd(), target)?;
    Ok(())
}
