use crate::error::port::PortError;
use crate::error::provision::ProvisionError;

use common::ErrorLocation;
use models::ModelError;

use std::error::Error as StdError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum LifecycleError {
    #[error("Already Running Error: {message} {location}")]
    AlreadyRunning {
        message: String,
        location: ErrorLocation,
    },

    #[error("Spawn Error: {message} {location}")]
    Spawn {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    /// The child exited, closed its output or timed out before printing the
    /// readiness marker.
    #[error("Startup Failed Error: {message} {location}")]
    StartupFailed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Stop Error: {message} {location}")]
    Stop {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Port(#[from] PortError),

    #[error(transparent)]
    Provision(#[from] ProvisionError),
}

impl From<ModelError> for LifecycleError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Validation { message, location }
            | ModelError::UnsupportedPlatform {
                message, location, ..
            } => LifecycleError::Validation { message, location },
        }
    }
}
