use crate::SCRATCH_DIR_PREFIX;
use crate::provision::scratch::ScratchDirectory;

use std::fs::read;
use std::io::Cursor;

use tempfile::tempdir;

/// **VALUE**: Verifies scratch directories are unique and carry the prefix.
///
/// **WHY THIS MATTERS**: Two handles extracting into the same directory would delete
/// each other's executable on `stop()`.
#[test]
fn given_two_scratch_dirs_when_created_then_paths_differ() {
    // GIVEN: A parent directory
    let parent = tempdir().expect("tempdir");

    // WHEN: Creating two scratch directories
    let first = ScratchDirectory::create_in(parent.path(), "redis-server").expect("first");
    let second = ScratchDirectory::create_in(parent.path(), "redis-server").expect("second");

    // THEN: Distinct, prefixed, existing
    assert_ne!(first.path(), second.path());
    assert!(first.exists() && second.exists());
    let name = first.path().file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with(SCRATCH_DIR_PREFIX), "got {name}");
}

/// **VALUE**: Verifies materialized bytes land in the executable file unchanged.
#[test]
fn given_bytes_when_materialized_then_file_contains_them() {
    // GIVEN: A scratch directory
    let parent = tempdir().expect("tempdir");
    let scratch = ScratchDirectory::create_in(parent.path(), "redis-server").expect("scratch");

    // WHEN: Materializing some bytes
    let written = scratch
        .materialize(Cursor::new(b"#!/bin/sh\nexit 0\n".to_vec()))
        .expect("materialize");

    // THEN: Same bytes on disk
    assert_eq!(written, 17);
    assert_eq!(read(scratch.executable()).unwrap(), b"#!/bin/sh\nexit 0\n");
}

/// **VALUE**: Verifies the extracted file is executable.
///
/// **WHY THIS MATTERS**: Without the execute bit, spawn fails with "permission denied"
/// even though provisioning reported success.
#[cfg(unix)]
#[test]
fn given_materialized_file_when_inspected_then_has_execute_bits() {
    use std::os::unix::fs::PermissionsExt;

    let parent = tempdir().expect("tempdir");
    let scratch = ScratchDirectory::create_in(parent.path(), "redis-server").expect("scratch");
    scratch
        .materialize(Cursor::new(b"binary".to_vec()))
        .expect("materialize");

    let mode = std::fs::metadata(scratch.executable())
        .unwrap()
        .permissions()
        .mode();
    assert_eq!(mode & 0o111, 0o111, "mode was {mode:o}");
}

/// **VALUE**: Verifies release removes the directory, tolerates repeats, and that the
/// path can be materialized again afterwards.
///
/// **WHY THIS MATTERS**: `stop()` releases the directory; a later `start()` re-extracts at
/// the same path so the handle's executable path never changes.
#[test]
fn given_released_dir_when_materialized_again_then_recreated_at_same_path() {
    // GIVEN: A materialized scratch directory
    let parent = tempdir().expect("tempdir");
    let scratch = ScratchDirectory::create_in(parent.path(), "redis-server").expect("scratch");
    scratch.materialize(Cursor::new(b"v1".to_vec())).unwrap();
    let path = scratch.path().to_path_buf();

    // WHEN: Releasing twice, then materializing again
    scratch.release().expect("first release");
    assert!(!path.exists(), "directory should be gone");
    scratch.release().expect("second release is a no-op");
    scratch.materialize(Cursor::new(b"v2".to_vec())).unwrap();

    // THEN: Same path, new content
    assert_eq!(scratch.path(), path);
    assert_eq!(read(scratch.executable()).unwrap(), b"v2");
}

/// **VALUE**: Verifies dropping the scratch directory removes it.
#[test]
fn given_scratch_dir_when_dropped_then_removed() {
    let parent = tempdir().expect("tempdir");
    let scratch = ScratchDirectory::create_in(parent.path(), "redis-server").expect("scratch");
    let path = scratch.path().to_path_buf();

    drop(scratch);

    assert!(!path.exists());
}
