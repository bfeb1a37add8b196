pub mod cleanup;
pub mod config;
pub mod lifecycle;
pub mod port;
pub mod provision;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Provision(#[from] provision::ProvisionError),

    #[error(transparent)]
    Lifecycle(#[from] lifecycle::LifecycleError),

    #[error(transparent)]
    Port(#[from] port::PortError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Cleanup(#[from] cleanup::CleanupError),
}
