use crate::error::model_error::ModelError;
use crate::{ErrorLocation, OsVariant, ServerInfo, ServerState};

use std::panic::Location;
use std::path::PathBuf;

/// Builder for creating validated ServerInfo instances.
#[derive(Debug, Default)]
pub struct ServerInfoBuilder {
    pid: Option<u32>,
    port: Option<u16>,
    version: Option<String>,
    variant: Option<OsVariant>,
    executable: Option<PathBuf>,
    state: Option<ServerState>,
}

impl ServerInfoBuilder {
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    pub fn with_variant(mut self, variant: OsVariant) -> Self {
        self.variant = Some(variant);
        self
    }

    pub fn with_executable(mut self, executable: impl Into<PathBuf>) -> Self {
        self.executable = Some(executable.into());
        self
    }

    pub fn with_state(mut self, state: ServerState) -> Self {
        self.state = Some(state);
        self
    }

    /// Build the ServerInfo with validation.
    #[track_caller]
    pub fn build(self) -> Result<ServerInfo, ModelError> {
        let pid = self.pid.ok_or_else(|| ModelError::Validation {
            message: String::from("PID is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if pid == 0 {
            return Err(ModelError::Validation {
                message: String::from("PID must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let port = self.port.ok_or_else(|| ModelError::Validation {
            message: String::from("Port is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if port == 0 {
            return Err(ModelError::Validation {
                message: String::from("Port must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let version = self.version.ok_or_else(|| ModelError::Validation {
            message: String::from("Version is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if version.is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Version cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let variant = self.variant.ok_or_else(|| ModelError::Validation {
            message: String::from("Variant is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        let executable = self.executable.ok_or_else(|| ModelError::Validation {
            message: String::from("Executable path is required"),
            location: ErrorLocation::from(Location::caller()),
        })?;

        if !executable.is_absolute() {
            return Err(ModelError::Validation {
                message: format!(
                    "Executable path must be absolute: {}",
                    executable.display()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let state = self.state.unwrap_or(ServerState::Active);

        if !state.has_process() {
            return Err(ModelError::Validation {
                message: format!("Server info requires a running process, state is {state}"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(ServerInfo {
            pid,
            port,
            version,
            variant,
            executable,
            state,
        })
    }
}
