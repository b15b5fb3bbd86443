//! Server module - bound socket wrapper, listen and cleanup

mod socket;

pub use socket::{start_listening, UnixServerSocket, DEFAULT_BACKLOG};
