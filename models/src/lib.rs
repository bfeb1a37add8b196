//! Plain data shared between the provisioner, the lifecycle controller and the CLI.
//!
//! Nothing here spawns processes or touches the filesystem; the one exception is
//! [`OsVariant::detect`], which reads the compile-time host constants.

pub mod error;
pub mod platform;
pub mod server_info;
pub mod state;

pub use common::ErrorLocation;
pub use error::model_error::ModelError;
pub use platform::selector::VariantSelector;
pub use platform::{DEFAULT_SERVER_VERSION, OsVariant};
pub use server_info::ServerInfo;
pub use server_info::builder::ServerInfoBuilder;
pub use state::ServerState;

#[cfg(test)]
mod tests;
