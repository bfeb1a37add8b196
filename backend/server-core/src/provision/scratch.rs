use crate::SCRATCH_DIR_PREFIX;
use crate::error::provision::ProvisionError;

use common::ErrorLocation;

use std::fs::{File, create_dir_all, remove_dir_all};
use std::io::{ErrorKind, Read, copy};
use std::panic::Location;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use tempfile::Builder as TempDirBuilder;

#[cfg(unix)]
const EXECUTABLE_MODE: u32 = 0o755;

/// Uniquely named directory holding one extracted executable.
///
/// The directory is removed when this value is dropped. [`release`] removes it
/// earlier while keeping the path reserved, so [`materialize`] can recreate it
/// at the same location.
///
/// [`release`]: ScratchDirectory::release
/// [`materialize`]: ScratchDirectory::materialize
#[derive(Debug)]
pub struct ScratchDirectory {
    path: PathBuf,
    executable: PathBuf,
}

impl ScratchDirectory {
    /// Create a fresh directory under the system temp dir.
    #[track_caller]
    pub(crate) fn create(executable_name: &str) -> Result<Self, ProvisionError> {
        Self::create_in(&std::env::temp_dir(), executable_name)
    }

    #[track_caller]
    pub(crate) fn create_in(parent: &Path, executable_name: &str) -> Result<Self, ProvisionError> {
        let path = TempDirBuilder::new()
            .prefix(SCRATCH_DIR_PREFIX)
            .tempdir_in(parent)
            .map_err(|e| ProvisionError::Io {
                message: format!(
                    "Failed to create scratch directory in {}: {e}",
                    parent.display()
                ),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(e),
            })?
            .keep();

        debug!("Created scratch directory {}", path.display());

        let executable = path.join(executable_name);
        Ok(Self { path, executable })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn exists(&self) -> bool {
        self.path.is_dir()
    }

    /// Write the executable bytes and mark the file executable.
    #[track_caller]
    pub(crate) fn materialize(&self, mut source: impl Read) -> Result<u64, ProvisionError> {
        create_dir_all(&self.path).map_err(|e| self.io_error("create", &self.path, e))?;

        let mut file =
            File::create(&self.executable).map_err(|e| self.io_error("create", &self.executable, e))?;

        let written =
            copy(&mut source, &mut file).map_err(|e| self.io_error("write", &self.executable, e))?;

        file.sync_all()
            .map_err(|e| self.io_error("flush", &self.executable, e))?;
        drop(file);

        #[cfg(unix)]
        {
            use std::fs::{Permissions, set_permissions};
            use std::os::unix::fs::PermissionsExt;

            set_permissions(&self.executable, Permissions::from_mode(EXECUTABLE_MODE))
                .map_err(|e| self.io_error("mark executable", &self.executable, e))?;
        }

        debug!(
            "Materialized {written} bytes into {}",
            self.executable.display()
        );
        Ok(written)
    }

    /// Remove the directory and everything in it. Missing directories are fine.
    #[track_caller]
    pub(crate) fn release(&self) -> Result<(), ProvisionError> {
        match remove_dir_all(&self.path) {
            Ok(()) => {
                debug!("Removed scratch directory {}", self.path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io_error("remove", &self.path, e)),
        }
    }

    #[track_caller]
    fn io_error(&self, action: &str, path: &Path, err: std::io::Error) -> ProvisionError {
        ProvisionError::Io {
            message: format!("Failed to {action} {}: {err}", path.display()),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(err),
        }
    }
}

impl Drop for ScratchDirectory {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            warn!("Scratch directory left behind: {e}");
        }
    }
}
