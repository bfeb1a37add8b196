// Unit tests for logger module initialization logic
// Tests focus on thread-safety and error handling

use crate::error::CliError;
use crate::logger::{LOG_FILE_NAME, initialize, level_for};

use std::path::PathBuf;

use log::LevelFilter;
use tempfile::tempdir;

/// **VALUE**: Verifies that calling initialize() multiple times doesn't panic or fail.
///
/// **WHY THIS MATTERS**: Tests and the binary may both set up logging. If the second call
/// errors, the launcher would exit before starting the server.
///
/// **BUG THIS CATCHES**: Would catch if the Once or AtomicBool guards are removed,
/// causing fern to fail when trying to set a global logger twice.
#[test]
fn given_logger_initialized_when_called_again_then_returns_ok() {
    // GIVEN: A valid temporary directory
    let temp_dir = tempdir().expect("tempdir");

    // WHEN: Calling initialize twice
    let result1 = initialize(Some(temp_dir.path()), false);
    let result2 = initialize(Some(temp_dir.path()), true);

    // THEN: Both succeed and the log file exists
    assert!(result1.is_ok(), "First initialization should succeed");
    assert!(
        result2.is_ok(),
        "Second initialization should succeed (idempotent)"
    );
    assert!(temp_dir.path().join(LOG_FILE_NAME).exists());
}

/// **VALUE**: Verifies that an unusable log directory is reported, not panicked on.
///
/// **BUG THIS CATCHES**: Would catch `fern::log_file()` being unwrapped, and would catch
/// the error being swallowed when another test initialized logging first.
#[test]
fn given_invalid_log_dir_when_initialize_called_then_returns_error() {
    // GIVEN: A path that cannot hold a file
    let invalid_dir = PathBuf::from("/dev/null/invalid-path");

    // WHEN: Calling initialize with it
    let result = initialize(Some(&invalid_dir), false);

    // THEN: Logger error
    assert!(
        matches!(result, Err(CliError::Logger { .. })),
        "Should return CliError::Logger for invalid log directory, got {result:?}"
    );
}

#[test]
fn given_verbose_when_level_chosen_then_trace() {
    assert_eq!(level_for(true), LevelFilter::Trace);
    assert!(level_for(false) < LevelFilter::Trace);
}
