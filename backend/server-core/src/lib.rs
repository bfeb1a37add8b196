//! Provisioning and lifecycle control for a transient, embedded `redis-server`.
//!
//! The crate extracts a platform-specific executable into a scratch directory,
//! launches it on a port, waits until it prints its readiness line and tears it
//! down again. See [`lifecycle::EmbeddedServer`] for the entry point.

pub mod cleanup;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod port;
pub mod provision;

#[cfg(test)]
mod tests;

pub use lifecycle::{EmbeddedServer, EmbeddedServerBuilder};
pub use provision::repository::{BinaryRepository, DirectoryRepository, MemoryRepository};

pub const SERVER_BINARY: &str = "redis-server";
pub const SERVER_HOSTNAME: &str = "127.0.0.1";
pub const PORT_FLAG: &str = "--port";
/// Top-level directory of the binary repository layout.
pub const REPOSITORY_NAMESPACE: &str = "redis";
/// Line fragment the server prints once it is listening.
pub const READY_MARKER: &str = "The server is now ready to accept connections on port";
pub const SCRATCH_DIR_PREFIX: &str = const_format::concatcp!(SERVER_BINARY, "-");
