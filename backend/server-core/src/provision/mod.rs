//! Executable provisioning.
//!
//! Turns a [`VariantSelector`] into a runnable file on local storage:
//! - Resolves the OS/architecture variant (explicit, or detected from the host)
//! - Streams the executable out of a [`BinaryRepository`]
//! - Writes it into a uniquely named [`ScratchDirectory`] and marks it executable
//!
//! Every failure here is fatal. There is no retry and no fallback variant.

pub mod repository;
pub mod scratch;

use crate::SERVER_BINARY;
use crate::error::provision::ProvisionError;
use crate::provision::repository::BinaryRepository;
use crate::provision::scratch::ScratchDirectory;

use models::{OsVariant, VariantSelector};

use std::path::Path;
use std::sync::Arc;

use log::{debug, info};

/// An extracted executable plus the scratch directory that owns it.
#[derive(Debug)]
pub struct ProvisionedExecutable {
    version: String,
    variant: OsVariant,
    scratch: ScratchDirectory,
    repository: Arc<dyn BinaryRepository>,
}

impl ProvisionedExecutable {
    pub fn executable(&self) -> &Path {
        self.scratch.executable()
    }

    pub fn scratch_dir(&self) -> &Path {
        self.scratch.path()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn variant(&self) -> OsVariant {
        self.variant
    }

    pub fn is_materialized(&self) -> bool {
        self.scratch.executable().is_file()
    }

    /// Write the executable again at the same path after a [`release`](Self::release).
    #[track_caller]
    pub(crate) fn rematerialize(&self) -> Result<(), ProvisionError> {
        let source = self.repository.open(&self.version, self.variant)?;
        self.scratch.materialize(source)?;
        debug!("Re-extracted executable to {}", self.executable().display());
        Ok(())
    }

    #[track_caller]
    pub(crate) fn release(&self) -> Result<(), ProvisionError> {
        self.scratch.release()
    }
}

/// Resolve `selector` against `repository` and extract the executable.
///
/// # Errors
///
/// - [`ProvisionError::UnsupportedPlatform`] if the host cannot be mapped to a variant
/// - [`ProvisionError::ExecutableNotFound`] if the repository lacks the entry
/// - [`ProvisionError::Io`] if the scratch directory or file cannot be written
#[track_caller]
pub fn resolve(
    selector: &VariantSelector,
    repository: Arc<dyn BinaryRepository>,
) -> Result<ProvisionedExecutable, ProvisionError> {
    let variant = selector.resolve_variant()?;
    let version = selector.version.clone();

    debug!("Resolving {SERVER_BINARY} {version} for variant {variant}");

    // Look the entry up before touching the filesystem.
    let source = repository.open(&version, variant)?;

    let scratch = ScratchDirectory::create(&variant.executable_name(SERVER_BINARY))?;
    let bytes = scratch.materialize(source)?;

    info!(
        "Provisioned {SERVER_BINARY} {version} ({variant}, {bytes} bytes) at {}",
        scratch.executable().display()
    );

    Ok(ProvisionedExecutable {
        version,
        variant,
        scratch,
        repository,
    })
}
