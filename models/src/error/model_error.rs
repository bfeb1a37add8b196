use crate::ErrorLocation;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ModelError {
    #[error("Validation Error: {message} {location}")]
    Validation {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unsupported Platform Error: {message} {location}")]
    UnsupportedPlatform {
        os: String,
        arch: String,
        message: String,
        location: ErrorLocation,
    },
}
