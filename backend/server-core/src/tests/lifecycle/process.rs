// Unit tests for process module helpers

use crate::lifecycle::process::{is_running, kill_child, stop_pid, terminate_child, with_process};

use std::process::Stdio;
use std::time::Duration;

use tokio::process::Command as TokioCommand;

/// **VALUE**: Tests that `with_process()` gracefully handles non-existent PIDs.
///
/// **WHY THIS MATTERS**: The cleanup sweep signals PIDs recorded earlier; those processes
/// may be long gone. A panic there would abort cleanup for every other server.
#[test]
fn given_nonexistent_pid_when_with_process_called_then_returns_none() {
    // GIVEN: A PID that doesn't exist
    let fake_pid = u32::MAX;

    // WHEN: Calling with_process with the invalid PID
    let result = with_process(fake_pid, |_| true);

    // THEN: Should return None (graceful handling)
    assert!(result.is_none(), "Should return None for non-existent process");
    assert!(!is_running(fake_pid));
}

/// **VALUE**: Tests that `with_process()` executes the closure for a live PID.
#[test]
fn given_own_pid_when_with_process_called_then_executes_closure() {
    // GIVEN: Our own PID
    let our_pid = std::process::id();

    // WHEN: Reading the PID back through sysinfo
    let result = with_process(our_pid, |p| p.pid().as_u32());

    // THEN: The closure ran against the right process
    assert_eq!(result, Some(our_pid));
    assert!(is_running(our_pid));
}

/// **VALUE**: Verifies `stop_pid()` treats a missing process as already stopped.
///
/// **WHY THIS MATTERS**: `stop` must never fail for an already-exited process.
#[test]
fn given_nonexistent_pid_when_stop_pid_called_then_returns_true() {
    assert!(stop_pid(u32::MAX));
}

/// **VALUE**: Verifies graceful termination reaps a child that honours SIGTERM.
///
/// **WHY THIS MATTERS**: `stop()` must block until the process is gone; returning while it
/// still runs leaves a process holding the port.
#[cfg(unix)]
#[tokio::test]
async fn given_sleeping_child_when_terminate_child_called_then_process_is_reaped() {
    // GIVEN: A long-running child
    let mut child = TokioCommand::new("sleep")
        .arg("30")
        .stdout(Stdio::null())
        .spawn()
        .expect("sleep should spawn");
    let pid = child.id().expect("running child has a pid");

    // WHEN: Terminating it
    let status = terminate_child(&mut child, Duration::from_secs(5))
        .await
        .expect("terminate should succeed");

    // THEN: It exited on a signal and is no longer running
    assert!(!status.success());
    assert!(!is_running(pid), "PID {pid} should be gone");
}

/// **VALUE**: Verifies terminating an already-exited child succeeds.
///
/// **WHY THIS MATTERS**: A server can crash between readiness and `stop()`; stopping it
/// must still succeed and leave the handle Idle.
#[cfg(unix)]
#[tokio::test]
async fn given_exited_child_when_terminate_child_called_then_returns_ok() {
    // GIVEN: A child that exits immediately and has been waited on
    let mut child = TokioCommand::new("true").spawn().expect("true should spawn");
    child.wait().await.expect("true should exit");

    // WHEN: Terminating it again
    let result = terminate_child(&mut child, Duration::from_secs(1)).await;

    // THEN: Success
    assert!(result.is_ok(), "got {result:?}");
}

/// **VALUE**: Verifies `kill_child()` reaps the child so no zombie remains.
#[cfg(unix)]
#[tokio::test]
async fn given_running_child_when_kill_child_called_then_child_is_reaped() {
    let mut child = TokioCommand::new("sleep")
        .arg("30")
        .spawn()
        .expect("sleep should spawn");
    let pid = child.id().expect("running child has a pid");

    kill_child(&mut child).await.expect("kill should succeed");

    assert!(child.try_wait().expect("try_wait").is_some());
    assert!(!is_running(pid));
}
