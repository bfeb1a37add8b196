//! Shared building blocks for the embedded server workspace.
//!
//! Every error enum in the workspace records where it was raised through
//! [`ErrorLocation`], so messages read `"<Kind> Error: <message> [file:line:col]"`.
//!
//! ## Architecture
//!
//! - **common** (this crate): error location tracking
//! - **models**: plain data (platform variants, server state, server info)
//! - **server-core**: provisioning and process lifecycle
//! - **embedded-server**: command-line launcher wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
