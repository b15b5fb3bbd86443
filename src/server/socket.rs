//! Server-side socket wrapper around the bootstrap primitive

use crate::bootstrap::{create_unix_socket_server, ServerDescriptor};
use anyhow::{anyhow, Context, Result};
use nix::sys::socket::{listen, Backlog};
use std::os::fd::{AsRawFd, OwnedFd};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

/// Default `listen(2)` backlog.
///
/// nix 0.29.0 rejects a backlog of 128 on Linux (nix-rust/nix#2500).
pub const DEFAULT_BACKLOG: u32 = 127;

/// Unix socket server endpoint identified by a filesystem path
#[derive(Debug, Clone)]
pub struct UnixServerSocket {
    socket_path: PathBuf,
}

impl UnixServerSocket {
    /// Create a new server socket for `socket_path`
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
        }
    }

    /// Get the socket path
    pub fn path(&self) -> &Path {
        &self.socket_path
    }

    /// Check if something already exists at the socket path
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Check if a server is currently accepting connections at the path
    pub fn is_live(&self) -> bool {
        self.socket_exists() && UnixStream::connect(&self.socket_path).is_ok()
    }

    /// Bind the socket, leaving it in the bound-but-not-listening state
    pub fn bind(&self) -> Result<ServerDescriptor> {
        match create_unix_socket_server(&self.socket_path) {
            Ok(descriptor) => {
                tracing::info!(
                    "Socket fd {} bound at {:?}",
                    descriptor.as_raw_fd(),
                    self.socket_path
                );
                Ok(descriptor)
            }
            Err(e) => {
                tracing::error!(
                    "Error while creating server socket (code {}): {}",
                    e.sentinel(),
                    e
                );
                Err(anyhow::Error::new(e).context(format!(
                    "Could not open server socket at {:?}",
                    self.socket_path
                )))
            }
        }
    }

    /// Bind and start listening
    pub fn listen(&self, backlog: u32) -> Result<UnixListener> {
        let descriptor = self.bind()?;
        let fd = start_listening(descriptor, backlog)?;
        tracing::info!("Server listening on {:?}", self.socket_path);
        Ok(UnixListener::from(fd))
    }

    /// Bind, listen, and register the socket with the tokio reactor.
    ///
    /// Must be called from within a tokio runtime.
    pub fn listen_async(&self, backlog: u32) -> Result<tokio::net::UnixListener> {
        let listener = self.listen(backlog)?;
        listener
            .set_nonblocking(true)
            .context("Failed to make listener non-blocking")?;
        tokio::net::UnixListener::from_std(listener)
            .context("Failed to register listener with the tokio runtime")
    }

    /// Remove the socket file
    pub fn cleanup(&self) {
        tracing::info!("Cleaning up server socket {:?}", self.socket_path);

        if self.socket_exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                tracing::error!("Failed to remove socket file: {}", e);
            }
        }
    }
}

/// Move a bound descriptor into the listening state
pub fn start_listening(descriptor: ServerDescriptor, backlog: u32) -> Result<OwnedFd> {
    let backlog = i32::try_from(backlog)
        .ok()
        .and_then(|b| Backlog::new(b).ok())
        .ok_or_else(|| anyhow!("Invalid listen backlog: {}", backlog))?;

    let (fd, path) = descriptor.into_parts();
    listen(&fd, backlog).with_context(|| format!("Failed to listen on {}", path))?;
    Ok(fd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_socket_exists_tracks_file() {
        let dir = tempdir().unwrap();
        let server = UnixServerSocket::new(dir.path().join("exists.sock"));
        assert!(!server.socket_exists());

        let _descriptor = server.bind().unwrap();
        assert!(server.socket_exists());

        server.cleanup();
        assert!(!server.socket_exists());
    }

    #[test]
    fn test_bound_socket_is_not_live() {
        let dir = tempdir().unwrap();
        let server = UnixServerSocket::new(dir.path().join("bound.sock"));

        let _descriptor = server.bind().unwrap();
        assert!(!server.is_live(), "Nobody is listening yet");
    }

    #[test]
    fn test_listening_socket_is_live() {
        let dir = tempdir().unwrap();
        let server = UnixServerSocket::new(dir.path().join("live.sock"));

        let _listener = server.listen(DEFAULT_BACKLOG).unwrap();
        assert!(server.is_live());
    }

    #[test]
    fn test_bind_error_carries_context() {
        let server = UnixServerSocket::new("/nonexistent_dir/test.sock");
        let err = server.bind().unwrap_err();

        assert!(err.to_string().contains("Could not open server socket"));
        let cause = err
            .downcast_ref::<crate::bootstrap::BootstrapError>()
            .expect("Bootstrap error should be in the chain");
        assert_eq!(cause.kind(), crate::bootstrap::BootstrapErrorKind::BindFailed);
    }

    #[test]
    fn test_cleanup_without_file_is_quiet() {
        let dir = tempdir().unwrap();
        let server = UnixServerSocket::new(dir.path().join("never.sock"));
        server.cleanup();
        assert!(!server.socket_exists());
    }
}
