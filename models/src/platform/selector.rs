use crate::platform::{DEFAULT_SERVER_VERSION, OsVariant};
use crate::{ErrorLocation, ModelError};

use std::panic::Location;

use serde::{Deserialize, Serialize};

/// Describes which embedded executable to use.
///
/// `os_variant: None` means "whatever the current host is".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantSelector {
    pub version: String,
    pub os_variant: Option<OsVariant>,
}

impl VariantSelector {
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_os_variant(mut self, variant: OsVariant) -> Self {
        self.os_variant = Some(variant);
        self
    }

    /// The explicit variant, or the detected host variant.
    #[track_caller]
    pub fn resolve_variant(&self) -> Result<OsVariant, ModelError> {
        if self.version.trim().is_empty() {
            return Err(ModelError::Validation {
                message: String::from("Version cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        match self.os_variant {
            Some(variant) => Ok(variant),
            None => OsVariant::detect(),
        }
    }
}

impl Default for VariantSelector {
    fn default() -> Self {
        Self {
            version: DEFAULT_SERVER_VERSION.to_string(),
            os_variant: None,
        }
    }
}
