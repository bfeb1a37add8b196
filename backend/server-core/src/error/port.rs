use common::ErrorLocation;

use std::error::Error as StdError;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum PortError {
    #[error("Port In Use Error: {message} {location}")]
    PortInUse {
        port: u16,
        owner_pid: Option<u32>,
        message: String,
        location: ErrorLocation,
    },

    #[error("Port Allocation Error: {message} {location}")]
    Allocation {
        message: String,
        location: ErrorLocation,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },
}
