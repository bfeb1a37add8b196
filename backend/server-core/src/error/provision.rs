use crate::error::port::PortError;

use common::ErrorLocation;
use models::ModelError;

use std::error::Error as StdError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProvisionError {
    #[error("Unsupported Platform Error: {message} {location}")]
    UnsupportedPlatform {
        message: String,
        location: ErrorLocation,
    },

    #[error("Executable Not Found Error: {message} {location}")]
    ExecutableNotFound {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
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
}

impl From<ModelError> for ProvisionError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::UnsupportedPlatform {
                message, location, ..
            } => ProvisionError::UnsupportedPlatform { message, location },
            ModelError::Validation { message, location } => {
                ProvisionError::Validation { message, location }
            }
        }
    }
}
