//! C ABI for callers that can only pass a string and receive an integer.
//!
//! `udsboot_create_unix_socket_server` returns a bound descriptor (>= 0) whose
//! ownership passes to the caller, or a negative sentinel naming the step that
//! failed. The errno behind the most recent failure on the calling thread is
//! available from `udsboot_last_errno`.

use crate::bootstrap::{create_unix_socket_server, BootstrapErrorKind};
use std::cell::Cell;
use std::ffi::{CStr, OsStr};
use std::os::fd::IntoRawFd;
use std::os::raw::{c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

thread_local! {
    static LAST_ERRNO: Cell<c_int> = const { Cell::new(0) };
}

fn set_last_errno(errno: c_int) {
    LAST_ERRNO.with(|last| last.set(errno));
}

/// Create and bind a unix stream server socket at `path`.
///
/// # Safety
///
/// `path` must be null or point to a NUL-terminated string that stays valid
/// for the duration of the call.
#[no_mangle]
pub unsafe extern "C" fn udsboot_create_unix_socket_server(path: *const c_char) -> c_int {
    // NULL pointers are checked, any other invalid pointer is the caller's problem.
    if path.is_null() {
        set_last_errno(libc::EINVAL);
        return BootstrapErrorKind::InvalidPath.sentinel();
    }

    let bytes = CStr::from_ptr(path).to_bytes();
    let path = Path::new(OsStr::from_bytes(bytes));

    match create_unix_socket_server(path) {
        Ok(descriptor) => {
            set_last_errno(0);
            descriptor.into_raw_fd()
        }
        Err(e) => {
            tracing::debug!("Native server socket bootstrap failed: {}", e);
            set_last_errno(e.raw_os_error());
            e.sentinel()
        }
    }
}

/// Errno of the last failed `udsboot_create_unix_socket_server` call on this
/// thread, or 0 if the last call succeeded.
#[no_mangle]
pub extern "C" fn udsboot_last_errno() -> c_int {
    LAST_ERRNO.with(|last| last.get())
}
