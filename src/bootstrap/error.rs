//! Bootstrap errors

use nix::errno::Errno;
use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single bootstrap attempt
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("Invalid socket path: {reason}")]
    InvalidPath { reason: &'static str },

    #[error("Socket path too long: {len} bytes (max: {max})")]
    PathTooLong { len: usize, max: usize },

    #[error("Failed to allocate unix stream socket: {source}")]
    AllocationFailed { source: Errno },

    #[error("Failed to bind {}: {source}", .path.display())]
    BindFailed { path: PathBuf, source: Errno },
}

/// Which bootstrap step failed, without the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootstrapErrorKind {
    InvalidPath,
    PathTooLong,
    AllocationFailed,
    BindFailed,
}

impl BootstrapErrorKind {
    /// Negative integer reported across the foreign-call boundary.
    ///
    /// Allocation failure keeps `-1` so callers that only test the sign
    /// keep working; every other kind gets its own value.
    pub fn sentinel(self) -> i32 {
        match self {
            BootstrapErrorKind::AllocationFailed => -1,
            BootstrapErrorKind::BindFailed => -2,
            BootstrapErrorKind::PathTooLong => -3,
            BootstrapErrorKind::InvalidPath => -4,
        }
    }

    /// Map a sentinel back to its kind
    pub fn from_sentinel(code: i32) -> Option<Self> {
        match code {
            -1 => Some(BootstrapErrorKind::AllocationFailed),
            -2 => Some(BootstrapErrorKind::BindFailed),
            -3 => Some(BootstrapErrorKind::PathTooLong),
            -4 => Some(BootstrapErrorKind::InvalidPath),
            _ => None,
        }
    }
}

impl BootstrapError {
    pub fn kind(&self) -> BootstrapErrorKind {
        match self {
            BootstrapError::InvalidPath { .. } => BootstrapErrorKind::InvalidPath,
            BootstrapError::PathTooLong { .. } => BootstrapErrorKind::PathTooLong,
            BootstrapError::AllocationFailed { .. } => BootstrapErrorKind::AllocationFailed,
            BootstrapError::BindFailed { .. } => BootstrapErrorKind::BindFailed,
        }
    }

    /// OS error code behind the failure.
    ///
    /// Syscall failures keep their errno; path validation failures map to
    /// `EINVAL` and `ENAMETOOLONG`.
    pub fn raw_os_error(&self) -> i32 {
        match self {
            BootstrapError::AllocationFailed { source }
            | BootstrapError::BindFailed { source, .. } => *source as i32,
            BootstrapError::InvalidPath { .. } => libc::EINVAL,
            BootstrapError::PathTooLong { .. } => libc::ENAMETOOLONG,
        }
    }

    pub fn sentinel(&self) -> i32 {
        self.kind().sentinel()
    }
}

impl From<BootstrapError> for std::io::Error {
    fn from(err: BootstrapError) -> Self {
        let kind = match &err {
            BootstrapError::InvalidPath { .. } | BootstrapError::PathTooLong { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            BootstrapError::AllocationFailed { source }
            | BootstrapError::BindFailed { source, .. } => std::io::Error::from(*source).kind(),
        };
        std::io::Error::new(kind, err)
    }
}
