// Unit tests for spawn module private functions
// End-to-end start/stop behaviour is covered in integration_tests/lifecycle/

use crate::PORT_FLAG;
use crate::error::lifecycle::LifecycleError;
use crate::lifecycle::spawn::{build_spawn_command, spawn_server_process};

use std::ffi::OsStr;
use std::path::PathBuf;

fn scratch_executable() -> PathBuf {
    std::env::temp_dir()
        .join("redis-server-unit")
        .join("redis-server")
}

/// **VALUE**: Verifies the invocation is exactly `<executable> --port <N>`.
///
/// **WHY THIS MATTERS**: The wrapped server parses this argument list. Any extra or
/// reordered argument would make it listen on its default port instead.
///
/// **BUG THIS CATCHES**: Would catch a renamed flag or a port formatted wrongly.
#[test]
fn given_executable_and_port_when_build_spawn_command_called_then_sets_program_and_args() {
    // GIVEN: An executable path and a port
    let executable = scratch_executable();

    // WHEN: Building the spawn command
    let cmd = build_spawn_command(&executable, 6380);

    // THEN: Program and arguments match the invocation contract
    let std_cmd = cmd.as_std();
    assert_eq!(std_cmd.get_program(), executable.as_os_str());

    let args: Vec<&OsStr> = std_cmd.get_args().collect();
    assert_eq!(args, vec![OsStr::new(PORT_FLAG), OsStr::new("6380")]);
}

/// **VALUE**: Verifies the child runs from the executable's directory.
///
/// **WHY THIS MATTERS**: The server writes dump and log files relative to its working
/// directory. Running from the scratch directory keeps them inside it, so `stop()`
/// removes them too.
#[test]
fn given_executable_when_build_spawn_command_called_then_working_dir_is_parent() {
    // GIVEN: An executable inside a scratch directory
    let executable = scratch_executable();

    // WHEN: Building the spawn command
    let cmd = build_spawn_command(&executable, 6380);

    // THEN: Working directory is the scratch directory
    assert_eq!(
        cmd.as_std().get_current_dir(),
        executable.parent(),
        "Should run from the executable's directory"
    );
}

/// **VALUE**: Verifies that a missing executable produces `LifecycleError::Spawn`.
///
/// **WHY THIS MATTERS**: If the scratch file was deleted behind our back, `start()` must
/// report a spawn failure rather than panic or hang in the readiness wait.
#[tokio::test]
async fn given_missing_executable_when_spawned_then_returns_spawn_error() {
    // GIVEN: A path that does not exist
    let executable = std::env::temp_dir()
        .join("redis-server-missing-dir")
        .join("redis-server");

    // WHEN: Spawning it
    let result = spawn_server_process(&executable, 6380).await;

    // THEN: A Spawn error naming the path
    match result {
        Err(LifecycleError::Spawn { message, .. }) => {
            assert!(message.contains("redis-server-missing-dir"), "got: {message}");
        }
        other => panic!("expected Spawn error, got {other:?}"),
    }
}
