//! udsboot - Bootstrap bound Unix domain stream sockets for server endpoints
//!
//! This crate provides:
//! - The bootstrap primitive: unlink a stale entry, allocate an
//!   `AF_UNIX`/`SOCK_STREAM` socket and bind it to a path
//! - A server-side wrapper that listens, adopts into tokio and cleans up
//! - A C ABI for callers that exchange a path string for an integer descriptor
//! - Configuration management
//!
//! # Architecture
//!
//! The bootstrap stops after `bind`. The returned descriptor is bound but not
//! listening; calling `listen` and `accept` is the caller's job, either
//! directly or through [`server::UnixServerSocket`].

pub mod bootstrap;
pub mod config;
pub mod ffi;
pub mod server;

pub use bootstrap::{
    create_unix_socket_server, BootstrapError, BootstrapErrorKind, ServerDescriptor, SocketPath,
};
