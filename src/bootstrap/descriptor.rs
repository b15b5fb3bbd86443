//! Bound server socket handle

use super::SocketPath;
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, IntoRawFd, OwnedFd, RawFd};
use std::path::Path;

/// A bound, not yet listening, unix stream socket.
///
/// Dropping the descriptor closes it. The socket file stays on disk; removing
/// it is up to whoever owns the server lifecycle.
#[derive(Debug)]
pub struct ServerDescriptor {
    fd: OwnedFd,
    path: SocketPath,
}

impl ServerDescriptor {
    pub(crate) fn new(fd: OwnedFd, path: SocketPath) -> Self {
        Self { fd, path }
    }

    /// Path the socket was bound to
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    pub fn socket_path(&self) -> &SocketPath {
        &self.path
    }

    /// Split into the owned descriptor and its path
    pub fn into_parts(self) -> (OwnedFd, SocketPath) {
        (self.fd, self.path)
    }
}

impl AsFd for ServerDescriptor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.fd.as_fd()
    }
}

impl AsRawFd for ServerDescriptor {
    fn as_raw_fd(&self) -> RawFd {
        self.fd.as_raw_fd()
    }
}

impl IntoRawFd for ServerDescriptor {
    fn into_raw_fd(self) -> RawFd {
        self.fd.into_raw_fd()
    }
}

impl From<ServerDescriptor> for OwnedFd {
    fn from(descriptor: ServerDescriptor) -> Self {
        descriptor.fd
    }
}
