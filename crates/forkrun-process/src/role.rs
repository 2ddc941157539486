//! The fork primitive, returning which side of the split the caller is on.

use nix::unistd::{fork, ForkResult, Pid};

use crate::error::{ForkError, Result};

/// Role of the current process after [`fork_role`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Parent { child: Pid },
    Child,
}

impl Role {
    pub fn child_pid(self) -> Option<Pid> {
        match self {
            Role::Parent { child } => Some(child),
            Role::Child => None,
        }
    }
}

/// Fork the current process.
///
/// # Safety
///
/// Only the calling thread survives in the child. The child must not rely on locks
/// or state owned by other threads of the parent, and must terminate through
/// `_exit` rather than returning into code that assumes the parent's thread set.
pub(crate) unsafe fn fork_role() -> Result<Role> {
    match fork().map_err(ForkError::Fork)? {
        ForkResult::Parent { child } => Ok(Role::Parent { child }),
        ForkResult::Child => Ok(Role::Child),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_child_pid_only_for_parent() {
        let pid = Pid::from_raw(4242);
        assert_eq!(Role::Parent { child: pid }.child_pid(), Some(pid));
        assert_eq!(Role::Child.child_pid(), None);
    }
}
