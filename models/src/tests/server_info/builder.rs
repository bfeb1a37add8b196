use crate::{ModelError, OsVariant, ServerInfoBuilder, ServerState};

use std::path::PathBuf;

fn executable() -> PathBuf {
    std::env::temp_dir().join("scratch").join("redis-server")
}

fn valid_builder() -> ServerInfoBuilder {
    ServerInfoBuilder::default()
        .with_pid(4242)
        .with_port(6379)
        .with_version("2.8.5")
        .with_variant(OsVariant::Unix)
        .with_executable(executable())
}

fn expect_validation(result: Result<crate::ServerInfo, ModelError>, expected: &str) {
    match result {
        Err(ModelError::Validation { message, .. }) => assert_eq!(message, expected),
        other => panic!("expected validation error '{expected}', got {other:?}"),
    }
}

/// **VALUE**: Verifies that builder validation rejects zero PIDs.
///
/// **WHY THIS MATTERS**: `stop()` and the cleanup registry signal processes by PID.
/// A zero PID would address the caller's whole process group on Unix.
///
/// **BUG THIS CATCHES**: Would catch removal of the PID zero check.
#[test]
fn given_zero_pid_when_building_server_info_then_returns_validation_error() {
    // GIVEN: Builder with PID set to zero
    let builder = valid_builder().with_pid(0);

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should return validation error
    expect_validation(result, "PID must be non-zero");
}

/// **VALUE**: Verifies that builder validation rejects a missing PID.
///
/// **WHY THIS MATTERS**: Info is only produced for a live process; a missing PID means
/// the caller asked for info about an idle server.
#[test]
fn given_missing_pid_when_building_then_returns_validation_error() {
    // GIVEN: Builder without PID
    let builder = ServerInfoBuilder::default()
        .with_port(6379)
        .with_version("2.8.5")
        .with_variant(OsVariant::Unix)
        .with_executable(executable());

    // WHEN/THEN: Build fails on the PID
    expect_validation(builder.build(), "PID is required");
}

/// **VALUE**: Verifies that port zero is rejected.
///
/// **WHY THIS MATTERS**: Port 0 means "let the OS choose"; a running server always
/// has a concrete port and reporting 0 would send clients nowhere.
#[test]
fn given_zero_port_when_building_then_returns_validation_error() {
    // GIVEN: Builder with port zero
    let builder = valid_builder().with_port(0);

    // WHEN/THEN
    expect_validation(builder.build(), "Port must be non-zero");
}

/// **VALUE**: Verifies that an empty version string is rejected.
#[test]
fn given_empty_version_when_building_then_returns_validation_error() {
    // GIVEN: Builder with empty version
    let builder = valid_builder().with_version("");

    // WHEN/THEN
    expect_validation(builder.build(), "Version cannot be empty");
}

/// **VALUE**: Verifies that relative executable paths are rejected.
///
/// **WHY THIS MATTERS**: The process is spawned with its working directory set to the
/// executable's directory; a relative path would then resolve against the wrong place.
///
/// **BUG THIS CATCHES**: Would catch provisioner regressions that hand out relative paths.
#[test]
fn given_relative_executable_when_building_then_returns_validation_error() {
    // GIVEN: Builder with relative executable path
    let builder = valid_builder().with_executable("redis-server");

    // WHEN: Attempting to build
    let result = builder.build();

    // THEN: Should mention the path
    match result {
        Err(ModelError::Validation { message, .. }) => {
            assert!(message.contains("must be absolute"), "got: {message}");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies that info cannot describe an idle server.
///
/// **WHY THIS MATTERS**: ServerInfo carries a PID; an idle handle has no process.
#[test]
fn given_idle_state_when_building_then_returns_validation_error() {
    // GIVEN: Builder in idle state
    let builder = valid_builder().with_state(ServerState::Idle);

    // WHEN/THEN
    match builder.build() {
        Err(ModelError::Validation { message, .. }) => assert!(message.contains("idle")),
        other => panic!("expected validation error, got {other:?}"),
    }
}

/// **VALUE**: Verifies the happy path and the default Active state.
#[test]
fn given_all_valid_fields_when_building_then_returns_server_info() {
    // GIVEN: Builder with all valid fields
    let builder = valid_builder();

    // WHEN: Building
    let info = builder.build().expect("valid server info");

    // THEN: All fields are preserved
    assert_eq!(info.pid, 4242);
    assert_eq!(info.port, 6379);
    assert_eq!(info.version, "2.8.5");
    assert_eq!(info.variant, OsVariant::Unix);
    assert_eq!(info.executable, executable());
    assert_eq!(info.state, ServerState::Active);
}
