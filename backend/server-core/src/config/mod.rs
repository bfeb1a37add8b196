use crate::error::config::ConfigError;
use crate::lifecycle::readiness::default_ready_regex;
use crate::provision::repository::{BinaryRepository, DirectoryRepository};

use common::ErrorLocation;
use models::{DEFAULT_SERVER_VERSION, OsVariant, VariantSelector};

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE_NAME: &str = "embedded-server.toml";
const CONFIG_SUBDIR: &str = "config";
const APP_DIR_NAME: &str = "embedded-server";
const BINARIES_DIR_NAME: &str = "binaries";

const STARTUP_TIMEOUT_RANGE: (u64, u64) = (1, 600);
const STOP_TIMEOUT_RANGE: (u64, u64) = (1, 120);

// ============================================
// CONFIG STRUCTS
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSection {
    #[serde(default = "default_version")]
    pub version: String,
    /// Fixed port; an OS-assigned free port when absent.
    #[serde(default)]
    pub port: Option<u16>,
    /// Pin a variant instead of detecting the host.
    #[serde(default)]
    pub os_variant: Option<OsVariant>,
    #[serde(default = "default_ready_pattern")]
    pub ready_pattern: String,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            version: default_version(),
            port: None,
            os_variant: None,
            ready_pattern: default_ready_pattern(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositorySection {
    /// Root of a `redis/{version}/{variant}/` tree.
    #[serde(default)]
    pub binary_root: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutSection {
    #[serde(default = "default_startup_secs")]
    pub startup_secs: u64,
    #[serde(default = "default_stop_secs")]
    pub stop_secs: u64,
}

impl Default for TimeoutSection {
    fn default() -> Self {
        Self {
            startup_secs: default_startup_secs(),
            stop_secs: default_stop_secs(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddedConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub repository: RepositorySection,

    #[serde(default)]
    pub timeouts: TimeoutSection,
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_version() -> String {
    DEFAULT_SERVER_VERSION.to_string()
}
fn default_ready_pattern() -> String {
    default_ready_regex().as_str().to_string()
}
fn default_startup_secs() -> u64 {
    30
}
fn default_stop_secs() -> u64 {
    10
}

/// `{data_local_dir}/embedded-server/binaries`, or a relative `binaries` dir.
pub fn default_binary_root() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(BINARIES_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(BINARIES_DIR_NAME))
}

/// `{config_dir}/embedded-server`, or the working directory.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from("."))
}

// ============================================
// IMPLEMENTATION
// ============================================

impl EmbeddedConfig {
    /// Load `embedded-server.toml` from `config_dir`.
    ///
    /// Looks in `{config_dir}/config/` first, then `{config_dir}/`.
    /// A missing file yields defaults; a file that exists but does not parse
    /// or validate is an error.
    #[track_caller]
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let paths = [
            config_dir.join(CONFIG_SUBDIR).join(CONFIG_FILE_NAME),
            config_dir.join(CONFIG_FILE_NAME),
        ];

        match paths.iter().find(|path| path.is_file()) {
            Some(path) => Self::load_from_path(path),
            None => {
                info!(
                    "No {CONFIG_FILE_NAME} under {}, using defaults",
                    config_dir.display()
                );
                Ok(Self::default())
            }
        }
    }

    #[track_caller]
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: EmbeddedConfig =
            toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
                location: ErrorLocation::from(Location::caller()),
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        config.validate()?;

        info!("Config loaded from {}", path.display());
        Ok(config)
    }

    /// Save to `{config_dir}/embedded-server.toml` via temp file + rename.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        self.validate()?;

        std::fs::create_dir_all(config_dir).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_dir.to_path_buf(),
            source: e,
        })?;

        let config_path = config_dir.join(CONFIG_FILE_NAME);
        let temp_path = config_dir.join(format!("{CONFIG_FILE_NAME}.tmp"));

        let contents = toml::to_string_pretty(self).map_err(|e| ConfigError::SerializeError {
            location: ErrorLocation::from(Location::caller()),
            reason: e.to_string(),
        })?;

        std::fs::write(&temp_path, contents).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: temp_path.clone(),
            source: e,
        })?;

        std::fs::rename(&temp_path, &config_path).map_err(|e| ConfigError::WriteError {
            location: ErrorLocation::from(Location::caller()),
            path: config_path.clone(),
            source: e,
        })?;

        info!("Config saved to {}", config_path.display());
        Ok(())
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.version.trim().is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "server.version cannot be empty".to_string(),
            });
        }

        if self.server.port == Some(0) {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "server.port must be 1-65535 (omit it for an automatic port)".to_string(),
            });
        }

        self.ready_regex()?;

        check_range(
            "timeouts.startup_secs",
            self.timeouts.startup_secs,
            STARTUP_TIMEOUT_RANGE,
        )?;
        check_range(
            "timeouts.stop_secs",
            self.timeouts.stop_secs,
            STOP_TIMEOUT_RANGE,
        )?;

        if let Some(ref root) = self.repository.binary_root
            && root.as_os_str().is_empty()
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: "repository.binary_root cannot be empty".to_string(),
            });
        }

        Ok(())
    }

    #[track_caller]
    pub fn ready_regex(&self) -> Result<Regex, ConfigError> {
        Regex::new(&self.server.ready_pattern).map_err(|e| ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!(
                "Invalid server.ready_pattern '{}': {e}",
                self.server.ready_pattern
            ),
        })
    }

    pub fn selector(&self) -> VariantSelector {
        VariantSelector {
            version: self.server.version.clone(),
            os_variant: self.server.os_variant,
        }
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.startup_secs)
    }

    pub fn stop_timeout(&self) -> Duration {
        Duration::from_secs(self.timeouts.stop_secs)
    }

    pub fn binary_root(&self) -> PathBuf {
        self.repository
            .binary_root
            .clone()
            .unwrap_or_else(default_binary_root)
    }

    pub fn repository(&self) -> Arc<dyn BinaryRepository> {
        let root = self.binary_root();
        debug!("Using binary repository at {}", root.display());
        Arc::new(DirectoryRepository::new(root))
    }
}

#[track_caller]
fn check_range(name: &str, value: u64, (min, max): (u64, u64)) -> Result<(), ConfigError> {
    if value < min || value > max {
        return Err(ConfigError::ValidationError {
            location: ErrorLocation::from(Location::caller()),
            reason: format!("Invalid {name}: {value} (must be {min}-{max})"),
        });
    }
    Ok(())
}
