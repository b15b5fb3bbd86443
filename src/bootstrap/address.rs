//! Socket path validation against the `sockaddr_un` capacity

use super::BootstrapError;
use std::fmt;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Size of `sun_path` in the platform `sockaddr_un`, terminator included.
pub const SUN_PATH_CAPACITY: usize =
    std::mem::size_of::<libc::sockaddr_un>() - std::mem::offset_of!(libc::sockaddr_un, sun_path);

/// Longest path, in bytes, that still leaves room for the NUL terminator.
pub const MAX_PATH_LEN: usize = SUN_PATH_CAPACITY - 1;

/// A filesystem path that fits in a `sockaddr_un`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketPath(PathBuf);

impl SocketPath {
    /// Validate `path` for use as a unix socket address.
    ///
    /// Nothing on disk is touched here.
    pub fn new(path: impl AsRef<Path>) -> Result<Self, BootstrapError> {
        let path = path.as_ref();
        let bytes = path.as_os_str().as_bytes();

        if bytes.is_empty() {
            return Err(BootstrapError::InvalidPath {
                reason: "path is empty",
            });
        }

        if bytes.contains(&0) {
            return Err(BootstrapError::InvalidPath {
                reason: "path contains an interior NUL byte",
            });
        }

        if bytes.len() > MAX_PATH_LEN {
            return Err(BootstrapError::PathTooLong {
                len: bytes.len(),
                max: MAX_PATH_LEN,
            });
        }

        Ok(Self(path.to_path_buf()))
    }

    pub fn as_path(&self) -> &Path {
        &self.0
    }

    /// Encoded length in bytes, without the terminator
    pub fn len(&self) -> usize {
        self.0.as_os_str().len()
    }

    /// A validated path is never empty
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.0
    }
}

impl AsRef<Path> for SocketPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SocketPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl TryFrom<PathBuf> for SocketPath {
    type Error = BootstrapError;

    fn try_from(path: PathBuf) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

impl TryFrom<&str> for SocketPath {
    type Error = BootstrapError;

    fn try_from(path: &str) -> Result<Self, Self::Error> {
        Self::new(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap::BootstrapErrorKind;
    use proptest::prelude::*;

    #[test]
    fn test_capacity_matches_platform() {
        #[cfg(any(target_os = "linux", target_os = "android"))]
        assert_eq!(SUN_PATH_CAPACITY, 108);

        #[cfg(target_os = "macos")]
        assert_eq!(SUN_PATH_CAPACITY, 104);

        assert_eq!(MAX_PATH_LEN + 1, SUN_PATH_CAPACITY);
    }

    #[test]
    fn test_accepts_plain_path() {
        let path = SocketPath::new("/tmp/test.sock").unwrap();
        assert_eq!(path.as_path(), Path::new("/tmp/test.sock"));
        assert_eq!(path.len(), 14);
        assert_eq!(path.to_string(), "/tmp/test.sock");
    }

    #[test]
    fn test_accepts_relative_path() {
        assert!(SocketPath::new("server.sock").is_ok());
    }

    #[test]
    fn test_rejects_empty() {
        let err = SocketPath::new("").unwrap_err();
        assert_eq!(err.kind(), BootstrapErrorKind::InvalidPath);
    }

    #[test]
    fn test_rejects_interior_nul() {
        let err = SocketPath::new("/tmp/a\0b.sock").unwrap_err();
        assert_eq!(err.kind(), BootstrapErrorKind::InvalidPath);
    }

    #[test]
    fn test_rejects_200_chars() {
        let long = format!("/tmp/{}", "a".repeat(195));
        assert_eq!(long.len(), 200);

        match SocketPath::new(&long) {
            Err(BootstrapError::PathTooLong { len, max }) => {
                assert_eq!(len, 200);
                assert_eq!(max, MAX_PATH_LEN);
            }
            other => panic!("Expected PathTooLong, got {:?}", other),
        }
    }

    #[test]
    fn test_boundary_leaves_room_for_terminator() {
        let fits = "a".repeat(MAX_PATH_LEN);
        assert!(SocketPath::new(&fits).is_ok());

        let full = "a".repeat(SUN_PATH_CAPACITY);
        let err = SocketPath::new(&full).unwrap_err();
        assert_eq!(err.kind(), BootstrapErrorKind::PathTooLong);
    }

    proptest! {
        #[test]
        fn prop_length_decides_outcome(len in 1usize..400) {
            let path = "s".repeat(len);
            let result = SocketPath::new(&path);
            if len <= MAX_PATH_LEN {
                prop_assert!(result.is_ok());
            } else {
                prop_assert_eq!(result.unwrap_err().kind(), BootstrapErrorKind::PathTooLong);
            }
        }

        #[test]
        fn prop_valid_paths_round_trip(name in "[a-zA-Z0-9_.-]{1,64}") {
            let raw = format!("/run/{}", name);
            let path = SocketPath::new(&raw).unwrap();
            prop_assert_eq!(path.as_path(), Path::new(&raw));
            prop_assert_eq!(path.len(), raw.len());
        }
    }
}
