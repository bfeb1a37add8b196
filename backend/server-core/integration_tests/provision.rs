use server_core::error::provision::ProvisionError;
use server_core::provision::repository::executable_relative_path;
use server_core::{DirectoryRepository, EmbeddedServer, MemoryRepository, SCRATCH_DIR_PREFIX};

use models::{OsVariant, VariantSelector};

use std::fs::{create_dir_all, read, write};
use std::sync::Arc;
use std::time::Duration;

use tempfile::tempdir;

// ============================================================================
// Provisioning through the public constructor
// ============================================================================

/// **VALUE**: Verifies construction extracts the requested variant from a directory tree.
///
/// **WHY THIS MATTERS**: The handle's executable path is what callers log and what
/// `start()` launches; it must point at a fresh copy, never at the repository file.
#[test]
fn given_directory_repository_when_built_then_executable_extracted_to_scratch() {
    // GIVEN: A repository tree with a windows-64 entry
    let root = tempdir().expect("tempdir");
    let source = root
        .path()
        .join(executable_relative_path("3.0.504", OsVariant::Windows64));
    create_dir_all(source.parent().unwrap()).unwrap();
    write(&source, b"MZ").unwrap();

    // WHEN: Building for that version and variant
    let server = EmbeddedServer::builder(Arc::new(DirectoryRepository::new(root.path())))
        .with_version("3.0.504")
        .with_os_variant(OsVariant::Windows64)
        .build()
        .expect("build");

    // THEN: A copy in a prefixed scratch directory, named for the variant
    assert_ne!(server.executable_path(), source);
    assert_eq!(read(server.executable_path()).unwrap(), b"MZ");
    assert!(server.executable_path().ends_with("redis-server.exe"));
    let dir_name = server
        .scratch_dir()
        .file_name()
        .unwrap()
        .to_string_lossy()
        .to_string();
    assert!(dir_name.starts_with(SCRATCH_DIR_PREFIX), "got {dir_name}");
    assert_eq!(server.version(), "3.0.504");
    assert_eq!(server.variant(), OsVariant::Windows64);
    assert!(!server.is_active());
}

/// **VALUE**: Verifies a missing repository entry fails construction with `ExecutableNotFound`.
#[test]
fn given_missing_entry_when_built_then_returns_executable_not_found() {
    let repository = Arc::new(MemoryRepository::new());

    let result = EmbeddedServer::builder(repository)
        .with_selector(VariantSelector::default().with_os_variant(OsVariant::Unix))
        .build();

    assert!(
        matches!(result, Err(ProvisionError::ExecutableNotFound { .. })),
        "got {result:?}"
    );
}

/// **VALUE**: Verifies invalid construction parameters are rejected before any extraction.
#[test]
fn given_invalid_parameters_when_built_then_returns_validation_error() {
    let repository = Arc::new(MemoryRepository::new().with_static(
        "2.8.5",
        OsVariant::Unix,
        b"elf",
    ));

    let zero_port = EmbeddedServer::builder(repository.clone())
        .with_os_variant(OsVariant::Unix)
        .with_port(0)
        .build();
    let zero_timeout = EmbeddedServer::builder(repository.clone())
        .with_os_variant(OsVariant::Unix)
        .with_startup_timeout(Duration::ZERO)
        .build();
    let blank_version = EmbeddedServer::builder(repository)
        .with_version("")
        .with_os_variant(OsVariant::Unix)
        .build();

    for result in [zero_port, zero_timeout, blank_version] {
        assert!(
            matches!(result, Err(ProvisionError::Validation { .. })),
            "got {result:?}"
        );
    }
}

/// **VALUE**: Verifies an explicit port is kept as given and reported before start.
#[test]
fn given_explicit_port_when_built_then_port_reported_without_starting() {
    let repository = Arc::new(MemoryRepository::new().with_static(
        "2.8.5",
        OsVariant::Unix,
        b"elf",
    ));

    let server = EmbeddedServer::builder(repository)
        .with_os_variant(OsVariant::Unix)
        .with_port(6399)
        .build()
        .expect("build");

    assert_eq!(server.port(), 6399);
    assert_eq!(server.address(), "127.0.0.1:6399");
    assert_eq!(server.pid(), None);
}

/// **VALUE**: Verifies dropping an unstarted handle removes its scratch directory.
#[test]
fn given_unstarted_server_when_dropped_then_scratch_removed() {
    let repository = Arc::new(MemoryRepository::new().with_static(
        "2.8.5",
        OsVariant::Unix,
        b"elf",
    ));
    let server = EmbeddedServer::builder(repository)
        .with_os_variant(OsVariant::Unix)
        .build()
        .expect("build");
    let scratch = server.scratch_dir().to_path_buf();
    assert!(scratch.exists());

    drop(server);

    assert!(!scratch.exists());
}
