//! Host platform variants the embedded binary is shipped for.

pub mod selector;

use crate::{ErrorLocation, ModelError};

use std::fmt::{Display, Formatter, Result as FormatResult};
use std::panic::Location;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Server version used when the caller does not ask for one.
pub const DEFAULT_SERVER_VERSION: &str = "2.8.5";

const WINDOWS_EXECUTABLE_SUFFIX: &str = ".exe";

/// The closed set of executable variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OsVariant {
    #[serde(rename = "windows-32")]
    Windows32,
    #[serde(rename = "windows-64")]
    Windows64,
    #[serde(rename = "unix")]
    Unix,
    #[serde(rename = "macos")]
    MacOs,
}

impl OsVariant {
    pub const ALL: [OsVariant; 4] = [
        OsVariant::Windows32,
        OsVariant::Windows64,
        OsVariant::Unix,
        OsVariant::MacOs,
    ];

    /// Directory name used by binary repositories.
    pub fn as_str(&self) -> &'static str {
        match self {
            OsVariant::Windows32 => "windows-32",
            OsVariant::Windows64 => "windows-64",
            OsVariant::Unix => "unix",
            OsVariant::MacOs => "macos",
        }
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, OsVariant::Windows32 | OsVariant::Windows64)
    }

    /// File name of the executable for this variant, e.g. `redis-server.exe`.
    pub fn executable_name(&self, base_name: &str) -> String {
        if self.is_windows() {
            format!("{base_name}{WINDOWS_EXECUTABLE_SUFFIX}")
        } else {
            base_name.to_string()
        }
    }

    /// Map an (os, arch) pair to a variant.
    ///
    /// Accepts both Rust's `std::env::consts` spellings (`linux`, `macos`,
    /// `x86_64`) and the looser names other tools report (`Mac OS X`,
    /// `Windows 10`, `amd64`, `i686`). Matching is case-insensitive.
    #[track_caller]
    pub fn from_host(os: &str, arch: &str) -> Result<Self, ModelError> {
        let os_name = os.trim().to_ascii_lowercase();
        let arch_name = arch.trim().to_ascii_lowercase();

        let is_x86 = matches!(arch_name.as_str(), "x86" | "i386" | "i486" | "i586" | "i686");
        let is_x86_64 = matches!(arch_name.as_str(), "x86_64" | "amd64" | "x64");
        let is_arm64 = matches!(arch_name.as_str(), "aarch64" | "arm64");

        let variant = if os_name.starts_with("win") {
            if is_x86_64 {
                Some(OsVariant::Windows64)
            } else if is_x86 {
                Some(OsVariant::Windows32)
            } else {
                None
            }
        } else if os_name == "linux" {
            (is_x86 || is_x86_64 || is_arm64).then_some(OsVariant::Unix)
        } else if matches!(os_name.as_str(), "macos" | "mac os x" | "darwin") {
            (is_x86_64 || is_arm64).then_some(OsVariant::MacOs)
        } else {
            None
        };

        variant.ok_or_else(|| ModelError::UnsupportedPlatform {
            os: os.to_string(),
            arch: arch.to_string(),
            message: format!("Unsupported os/architecture: {os}/{arch}"),
            location: ErrorLocation::from(Location::caller()),
        })
    }

    /// Detect the variant of the machine this binary was compiled for.
    #[track_caller]
    pub fn detect() -> Result<Self, ModelError> {
        Self::from_host(std::env::consts::OS, std::env::consts::ARCH)
    }
}

impl Display for OsVariant {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for OsVariant {
    type Err = ModelError;

    #[track_caller]
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        OsVariant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == value)
            .ok_or_else(|| ModelError::Validation {
                message: format!(
                    "Unknown os variant '{value}' (expected one of windows-32, windows-64, unix, macos)"
                ),
                location: ErrorLocation::from(Location::caller()),
            })
    }
}
