use crate::helpers::{fake_server, ping, wait_until_gone};

use server_core::cleanup::entry;
use server_core::lifecycle::process::stop_pid;
use server_core::port::ensure_port_available;

use models::ServerState;

use std::time::Duration;

// ============================================================================
// stop(), restart and drop
// ============================================================================

/// **VALUE**: Verifies `stop()` is a no-op on an idle handle and safe to repeat.
///
/// **WHY THIS MATTERS**: Test teardown calls `stop()` unconditionally, including after a
/// failed start and after an explicit stop inside the test body.
#[tokio::test]
async fn given_idle_or_stopped_server_when_stopped_then_no_error_and_idle() {
    // GIVEN: A never-started handle
    let server = fake_server("ready");

    // WHEN/THEN: Stop on idle is fine
    server.stop().await.expect("stop on idle");
    assert_eq!(server.state(), ServerState::Idle);

    // GIVEN: A started then stopped handle
    server.start().await.expect("start");
    server.stop().await.expect("first stop");

    // WHEN/THEN: Stopping again is fine too
    server.stop().await.expect("second stop");
    assert_eq!(server.state(), ServerState::Idle);
}

/// **VALUE**: Verifies stop reclaims the process, the port and the scratch directory.
///
/// **BUG THIS CATCHES**: Would catch stop returning before the child is reaped, which
/// leaves the port bound for the next test.
#[tokio::test]
async fn given_running_server_when_stopped_then_process_port_and_directory_released() {
    // GIVEN: A running server
    let server = fake_server("ready");
    server.start().await.expect("start");
    let pid = server.pid().expect("pid");
    let scratch = server.scratch_dir().to_path_buf();
    assert!(scratch.exists());

    // WHEN: Stopping
    server.stop().await.expect("stop");

    // THEN: Nothing left behind
    assert!(!scratch.exists(), "scratch dir should be removed");
    assert!(wait_until_gone(pid, Duration::from_secs(2)).await);
    assert!(ensure_port_available(server.port()).is_ok());
    assert_eq!(server.pid(), None);
}

/// **VALUE**: Verifies a stopped handle can start again with the same executable path.
///
/// **WHY THIS MATTERS**: Suites reuse one handle across test classes; callers may have
/// cached the executable path.
#[tokio::test]
async fn given_stopped_server_when_restarted_then_same_path_and_port() {
    // GIVEN: A server started and stopped once
    let server = fake_server("ready");
    let path = server.executable_path().to_path_buf();
    server.start().await.expect("first start");
    server.stop().await.expect("first stop");
    assert!(!path.exists());

    // WHEN: Starting again
    server.start().await.expect("restart");

    // THEN: Re-extracted at the same path, serving on the same port
    assert_eq!(server.executable_path(), path);
    assert!(path.is_file());
    assert!(ping(server.port()).await.is_ok());

    server.stop().await.expect("second stop");
}

/// **VALUE**: Verifies dropping a running handle kills its child and cleans up.
///
/// **WHY THIS MATTERS**: A panicking test drops its handle without calling `stop()`;
/// the server must not survive the test.
#[tokio::test]
async fn given_running_server_when_dropped_then_process_killed_and_directory_removed() {
    // GIVEN: A running server
    let server = fake_server("ready");
    server.start().await.expect("start");
    let pid = server.pid().expect("pid");
    let id = server.id();
    let scratch = server.scratch_dir().to_path_buf();

    // WHEN: Dropping it without stop()
    drop(server);

    // THEN: Process gone, directory gone, nothing left in the registry
    assert!(wait_until_gone(pid, Duration::from_secs(5)).await);
    assert!(!scratch.exists());
    assert!(entry(id).is_none());
}

/// **VALUE**: Verifies `stop()` succeeds when the server already died on its own.
///
/// **WHY THIS MATTERS**: A server can crash or be killed by the OOM killer mid-test. Teardown
/// must still release the handle instead of failing on a process that is already gone.
#[tokio::test]
async fn given_child_killed_externally_when_stopped_then_ok_and_idle() {
    // GIVEN: A running server whose process is killed behind the handle's back
    let server = fake_server("ready");
    server.start().await.expect("start");
    let pid = server.pid().expect("pid");
    let scratch = server.scratch_dir().to_path_buf();
    assert!(stop_pid(pid), "external kill should succeed");
    assert!(wait_until_gone(pid, Duration::from_secs(2)).await);

    // WHEN: Stopping through the handle
    let result = server.stop().await;

    // THEN: No error, back to Idle, nothing left behind
    assert!(result.is_ok(), "got {result:?}");
    assert_eq!(server.state(), ServerState::Idle);
    assert_eq!(server.pid(), None);
    assert!(!scratch.exists());
    assert!(entry(server.id()).is_none());
}
