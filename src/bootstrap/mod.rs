//! Unix domain socket bootstrap
//!
//! Produces a bound server socket for a filesystem path in four steps:
//! remove any stale entry at the path, allocate an `AF_UNIX`/`SOCK_STREAM`
//! socket, bind it, and hand the descriptor back. Calling `listen` and
//! `accept` is left to the caller.
//!
//! Two callers bootstrapping the same path at the same time race at the OS
//! level. Callers must serialize bootstrap of a given path themselves.

mod address;
mod descriptor;
mod error;

pub use address::{SocketPath, MAX_PATH_LEN, SUN_PATH_CAPACITY};
pub use descriptor::ServerDescriptor;
pub use error::{BootstrapError, BootstrapErrorKind};

use nix::errno::Errno;
use nix::sys::socket::{bind, socket, AddressFamily, SockFlag, SockType, UnixAddr};
use std::io::ErrorKind;
use std::os::fd::AsRawFd;
use std::path::Path;

/// Create a unix stream socket bound to `path`.
///
/// Any existing entry at `path` is removed first. Failure to remove it is
/// ignored, so a conflict shows up as [`BootstrapError::BindFailed`] instead.
/// The path is validated before anything on disk is touched.
pub fn create_unix_socket_server(
    path: impl AsRef<Path>,
) -> Result<ServerDescriptor, BootstrapError> {
    let path = SocketPath::new(path)?;

    remove_stale_entry(&path);

    let fd = socket(AddressFamily::Unix, SockType::Stream, socket_flags(), None)
        .map_err(|source| BootstrapError::AllocationFailed { source })?;
    tracing::debug!("Allocated unix socket fd {} for {}", fd.as_raw_fd(), path);

    // UnixAddr zeroes the sockaddr_un and copies at most sun_path bytes.
    let addr = match UnixAddr::new(path.as_path()) {
        Ok(addr) => addr,
        Err(errno) => {
            drop(fd);
            return Err(address_error(&path, errno));
        }
    };

    if let Err(source) = bind(fd.as_raw_fd(), &addr) {
        tracing::debug!("Bind to {} failed: {}", path, source);
        // Close before reporting so a failed attempt never leaks the fd.
        drop(fd);
        return Err(BootstrapError::BindFailed {
            path: path.into_path_buf(),
            source,
        });
    }

    tracing::debug!("Bound fd {} to {}", fd.as_raw_fd(), path);
    Ok(ServerDescriptor::new(fd, path))
}

/// Classify a `sockaddr_un` construction failure by the step it belongs to
fn address_error(path: &SocketPath, errno: Errno) -> BootstrapError {
    match errno {
        Errno::ENAMETOOLONG => BootstrapError::PathTooLong {
            len: path.len(),
            max: MAX_PATH_LEN,
        },
        _ => BootstrapError::InvalidPath {
            reason: "path cannot be encoded as a unix socket address",
        },
    }
}

/// Best-effort unlink of whatever sits at `path`
fn remove_stale_entry(path: &SocketPath) {
    match std::fs::remove_file(path) {
        Ok(()) => tracing::debug!("Removed stale entry at {}", path),
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => tracing::debug!("Ignoring failure to remove {}: {}", path, e),
    }
}

#[cfg(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos",
))]
fn socket_flags() -> SockFlag {
    SockFlag::SOCK_CLOEXEC
}

#[cfg(not(any(
    target_os = "linux",
    target_os = "android",
    target_os = "freebsd",
    target_os = "netbsd",
    target_os = "openbsd",
    target_os = "dragonfly",
    target_os = "illumos",
)))]
fn socket_flags() -> SockFlag {
    SockFlag::empty()
}
