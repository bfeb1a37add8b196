//! Sources of embedded executable bytes, keyed by (version, variant).

use crate::error::provision::ProvisionError;
use crate::{REPOSITORY_NAMESPACE, SERVER_BINARY};

use common::ErrorLocation;
use models::OsVariant;

use std::collections::HashMap;
use std::fmt::Debug;
use std::fs::File;
use std::io::{Cursor, ErrorKind, Read};
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use log::{debug, trace};

/// A store of server executables.
///
/// The lifecycle controller never looks inside; it only asks for a byte stream
/// and writes it into a scratch directory.
pub trait BinaryRepository: Debug + Send + Sync {
    /// Open the executable for `version` built for `variant`.
    ///
    /// Returns [`ProvisionError::ExecutableNotFound`] when the repository has no
    /// such entry.
    fn open(&self, version: &str, variant: OsVariant)
    -> Result<Box<dyn Read + Send>, ProvisionError>;
}

/// Relative location of an executable inside a repository:
/// `redis/{version}/{variant}/{executable}`.
pub fn executable_relative_path(version: &str, variant: OsVariant) -> PathBuf {
    Path::new(REPOSITORY_NAMESPACE)
        .join(version)
        .join(variant.as_str())
        .join(variant.executable_name(SERVER_BINARY))
}

/// Repository backed by a directory tree on local storage.
#[derive(Debug, Clone)]
pub struct DirectoryRepository {
    root: PathBuf,
}

impl DirectoryRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn executable_path(&self, version: &str, variant: OsVariant) -> PathBuf {
        self.root.join(executable_relative_path(version, variant))
    }
}

impl BinaryRepository for DirectoryRepository {
    #[track_caller]
    fn open(
        &self,
        version: &str,
        variant: OsVariant,
    ) -> Result<Box<dyn Read + Send>, ProvisionError> {
        let path = self.executable_path(version, variant);
        trace!("Opening executable at {}", path.display());

        match File::open(&path) {
            Ok(file) => {
                debug!("Found {variant} executable for version {version} at {}", path.display());
                Ok(Box::new(file))
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                Err(ProvisionError::ExecutableNotFound {
                    message: format!(
                        "Server executable not found in repository at location: {}",
                        path.display()
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(err) => Err(ProvisionError::Io {
                message: format!("Failed to open {}: {err}", path.display()),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(err),
            }),
        }
    }
}

#[derive(Debug, Clone)]
enum Blob {
    Static(&'static [u8]),
    Shared(Arc<[u8]>),
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        match self {
            Blob::Static(bytes) => bytes,
            Blob::Shared(bytes) => bytes,
        }
    }
}

/// In-memory repository, e.g. for executables embedded with `include_bytes!`.
#[derive(Debug, Default)]
pub struct MemoryRepository {
    entries: RwLock<HashMap<(String, OsVariant), Blob>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register bytes compiled into the binary.
    pub fn with_static(self, version: &str, variant: OsVariant, bytes: &'static [u8]) -> Self {
        self.insert_blob(version, variant, Blob::Static(bytes));
        self
    }

    /// Register owned bytes, replacing any previous entry.
    pub fn insert(&self, version: &str, variant: OsVariant, bytes: impl Into<Vec<u8>>) {
        let bytes: Arc<[u8]> = Arc::from(bytes.into());
        self.insert_blob(version, variant, Blob::Shared(bytes));
    }

    pub fn contains(&self, version: &str, variant: OsVariant) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(&(version.to_string(), variant)))
            .unwrap_or(false)
    }

    fn insert_blob(&self, version: &str, variant: OsVariant, blob: Blob) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert((version.to_string(), variant), blob);
    }
}

impl BinaryRepository for MemoryRepository {
    #[track_caller]
    fn open(
        &self,
        version: &str,
        variant: OsVariant,
    ) -> Result<Box<dyn Read + Send>, ProvisionError> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());

        match entries.get(&(version.to_string(), variant)) {
            Some(blob) => Ok(Box::new(Cursor::new(blob.clone()))),
            None => Err(ProvisionError::ExecutableNotFound {
                message: format!(
                    "Server executable not found in memory repository at location: {}",
                    executable_relative_path(version, variant).display()
                ),
                location: ErrorLocation::from(Location::caller()),
            }),
        }
    }
}
