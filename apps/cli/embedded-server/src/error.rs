use common::ErrorLocation;
use server_core::error::CoreError;
use server_core::error::config::ConfigError;
use server_core::error::lifecycle::LifecycleError;

use std::error::Error as StdError;

use thiserror::Error;

/// Errors surfaced by the launcher.
///
/// Library errors pass through unchanged so their own location stays visible.
#[derive(Debug, Error)]
pub enum CliError {
    /// Logging could not be set up
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },

    /// Writing the server report failed
    #[error("Output Error: {message} {location}")]
    Output {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// Shutdown was requested before the server became ready
    #[error("Interrupted Error: {message} {location}")]
    Interrupted {
        message: String,
        location: ErrorLocation,
    },

    /// Error from server-core (config, provisioning, lifecycle)
    #[error(transparent)]
    Core(#[from] CoreError),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        CliError::Core(CoreError::from(err))
    }
}

impl From<LifecycleError> for CliError {
    fn from(err: LifecycleError) -> Self {
        CliError::Core(CoreError::from(err))
    }
}
