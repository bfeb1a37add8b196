use crate::error::provision::ProvisionError;
use crate::provision::repository::{
    BinaryRepository, DirectoryRepository, MemoryRepository, executable_relative_path,
};

use models::OsVariant;

use std::fs::{create_dir_all, write};
use std::io::Read;
use std::path::Path;

use tempfile::tempdir;

fn read_all(repository: &dyn BinaryRepository, version: &str, variant: OsVariant) -> Vec<u8> {
    let mut bytes = Vec::new();
    repository
        .open(version, variant)
        .expect("entry should exist")
        .read_to_end(&mut bytes)
        .expect("read");
    bytes
}

/// **VALUE**: Verifies the repository layout `redis/{version}/{variant}/{executable}`.
///
/// **WHY THIS MATTERS**: Packagers lay binaries out by this convention. A different
/// layout turns every lookup into ExecutableNotFound.
#[test]
fn given_version_and_variant_when_relative_path_built_then_follows_layout() {
    assert_eq!(
        executable_relative_path("2.8.5", OsVariant::Unix),
        Path::new("redis").join("2.8.5").join("unix").join("redis-server")
    );
    assert_eq!(
        executable_relative_path("2.8.5", OsVariant::Windows64),
        Path::new("redis")
            .join("2.8.5")
            .join("windows-64")
            .join("redis-server.exe")
    );
}

/// **VALUE**: Verifies the directory repository streams the file at the layout path.
#[test]
fn given_file_in_layout_when_directory_repository_opened_then_returns_bytes() {
    // GIVEN: A tree with one executable
    let root = tempdir().expect("tempdir");
    let path = root.path().join(executable_relative_path("2.8.5", OsVariant::MacOs));
    create_dir_all(path.parent().unwrap()).unwrap();
    write(&path, b"mach-o").unwrap();
    let repository = DirectoryRepository::new(root.path());

    // WHEN/THEN: Opening returns the file content
    assert_eq!(repository.executable_path("2.8.5", OsVariant::MacOs), path);
    assert_eq!(read_all(&repository, "2.8.5", OsVariant::MacOs), b"mach-o");
}

/// **VALUE**: Verifies a missing entry is `ExecutableNotFound`, naming the location.
///
/// **WHY THIS MATTERS**: The message is the only hint about where the binary was expected.
#[test]
fn given_missing_entry_when_directory_repository_opened_then_returns_not_found() {
    let root = tempdir().expect("tempdir");
    let repository = DirectoryRepository::new(root.path());

    match repository.open("9.9.9", OsVariant::Unix) {
        Err(ProvisionError::ExecutableNotFound { message, .. }) => {
            assert!(message.contains("9.9.9"), "got {message}");
        }
        Err(other) => panic!("expected ExecutableNotFound, got {other:?}"),
        Ok(_) => panic!("expected ExecutableNotFound, got a reader"),
    }
}

/// **VALUE**: Verifies the in-memory repository serves static and owned entries
/// and keeps variants apart.
///
/// **WHY THIS MATTERS**: The same version ships different binaries per OS; serving the
/// Windows bytes on Linux would fail at spawn time with a confusing error.
#[test]
fn given_memory_entries_when_opened_then_returns_matching_variant_only() {
    // GIVEN: A static unix entry and an owned windows entry
    static UNIX_BYTES: &[u8] = b"elf";
    let repository = MemoryRepository::new().with_static("2.8.5", OsVariant::Unix, UNIX_BYTES);
    repository.insert("2.8.5", OsVariant::Windows64, b"pe".to_vec());

    // WHEN/THEN: Each variant returns its own bytes
    assert_eq!(read_all(&repository, "2.8.5", OsVariant::Unix), b"elf");
    assert_eq!(read_all(&repository, "2.8.5", OsVariant::Windows64), b"pe");
    assert!(repository.contains("2.8.5", OsVariant::Unix));
    assert!(!repository.contains("2.8.5", OsVariant::MacOs));
    assert!(matches!(
        repository.open("2.8.5", OsVariant::MacOs),
        Err(ProvisionError::ExecutableNotFound { .. })
    ));
}
