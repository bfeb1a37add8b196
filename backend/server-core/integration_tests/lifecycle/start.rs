use crate::helpers::{
    fake_builder, fake_server, ping, script_repository, wait_until_gone, wait_until_port_free,
};

use server_core::EmbeddedServer;
use server_core::cleanup::entry;
use server_core::error::lifecycle::LifecycleError;
use server_core::port::ensure_port_available;

use models::ServerState;

use std::time::Duration;

use regex::Regex;

// ============================================================================
// start(): readiness, double start, startup failures
// ============================================================================

/// **VALUE**: Verifies a second `start()` is rejected and leaves exactly one child.
///
/// **BUG THIS CATCHES**: Would catch a second spawn replacing the first child, which
/// orphans the original process on the port.
#[tokio::test]
async fn given_started_server_when_started_again_then_returns_already_running() {
    // GIVEN: A running server
    let server = fake_server("ready");
    server.start().await.expect("first start");
    let pid = server.pid().expect("pid while active");

    // WHEN: Starting again
    let result = server.start().await;

    // THEN: AlreadyRunning, same child still serving
    assert!(
        matches!(result, Err(LifecycleError::AlreadyRunning { .. })),
        "got {result:?}"
    );
    assert!(server.is_active());
    assert_eq!(server.pid(), Some(pid));
    assert!(ping(server.port()).await.is_ok());

    server.stop().await.expect("stop");
}

/// **VALUE**: Verifies the readiness line is recognised on stderr too.
///
/// **WHY THIS MATTERS**: Some server builds log to stderr; watching only stdout would
/// turn every start into a timeout.
#[tokio::test]
async fn given_marker_on_stderr_when_started_then_becomes_active() {
    let server = fake_server("stderr");

    server.start().await.expect("start should succeed");

    assert!(server.is_active());
    assert!(ping(server.port()).await.is_ok());
    server.stop().await.expect("stop");
}

/// **VALUE**: Verifies a child that exits before readiness surfaces as `StartupFailed`
/// carrying its last output, with the handle back at `Idle`.
///
/// **WHY THIS MATTERS**: The server's own error line is the only explanation the caller
/// gets for a failed start.
///
/// **BUG THIS CATCHES**: Would catch the handle staying in `Starting` after the failure,
/// which blocks every later `start()`.
#[tokio::test]
async fn given_child_exits_early_when_started_then_returns_startup_failed_with_output() {
    // GIVEN: A fake executable that fails immediately
    let server = fake_server("exit");

    // WHEN: Starting
    let result = server.start().await;

    // THEN: StartupFailed with the child's output
    match result {
        Err(LifecycleError::StartupFailed { message, .. }) => {
            assert!(message.contains("can't open config file"), "got {message}");
        }
        other => panic!("expected StartupFailed, got {other:?}"),
    }
    assert_eq!(server.state(), ServerState::Idle);
    assert_eq!(server.pid(), None);
    assert!(!server.is_active());
}

/// **VALUE**: Verifies a plain script that exits without a readiness line fails cleanly.
#[tokio::test]
async fn given_script_without_marker_when_started_then_returns_startup_failed() {
    let server = EmbeddedServer::builder(script_repository("#!/bin/sh\necho booting\nexit 1\n"))
        .build()
        .expect("build");

    let result = server.start().await;

    assert!(
        matches!(result, Err(LifecycleError::StartupFailed { .. })),
        "got {result:?}"
    );
    assert_eq!(server.state(), ServerState::Idle);
}

/// **VALUE**: Verifies a silent child is killed at the startup timeout.
///
/// **WHY THIS MATTERS**: A hung server would otherwise keep the port and a process
/// alive after the caller has already given up on it.
#[tokio::test]
async fn given_silent_child_when_timeout_elapses_then_killed_and_port_released() {
    // GIVEN: A server that binds but never reports readiness
    let server = fake_builder("silent")
        .with_startup_timeout(Duration::from_millis(750))
        .build()
        .expect("build");

    // WHEN: Starting
    let result = server.start().await;

    // THEN: StartupFailed mentioning the timeout; child reaped so the port is free
    match result {
        Err(LifecycleError::StartupFailed { message, .. }) => {
            assert!(message.contains("did not signal readiness"), "got {message}");
            assert!(message.contains("Server started"), "tail missing: {message}");
        }
        other => panic!("expected StartupFailed, got {other:?}"),
    }
    assert_eq!(server.state(), ServerState::Idle);
    assert!(ensure_port_available(server.port()).is_ok());
}

/// **VALUE**: Verifies a custom readiness pattern replaces the default marker.
#[tokio::test]
async fn given_custom_pattern_when_started_then_matches_it_instead_of_marker() {
    // GIVEN: A silent server and a pattern matching its startup banner
    let server = fake_builder("silent")
        .with_ready_pattern(Regex::new(r"# Server started").unwrap())
        .build()
        .expect("build");

    // WHEN/THEN: Start succeeds on the banner
    server.start().await.expect("start should succeed");
    assert!(server.is_active());

    server.stop().await.expect("stop");
}

/// **VALUE**: Verifies a failed start can be followed by a successful one on the same handle.
#[tokio::test]
async fn given_failed_start_when_started_again_then_attempts_fresh_spawn() {
    let server = fake_builder("silent")
        .with_startup_timeout(Duration::from_millis(300))
        .build()
        .expect("build");

    assert!(server.start().await.is_err());
    let second = server.start().await;

    // Still silent, but the second attempt must not be rejected as AlreadyRunning
    assert!(
        matches!(second, Err(LifecycleError::StartupFailed { .. })),
        "got {second:?}"
    );
}

/// **VALUE**: Verifies the running PID is registered for exit cleanup.
///
/// **WHY THIS MATTERS**: The interrupt sweep can only kill what it knows about.
#[tokio::test]
async fn given_running_server_when_inspected_then_registered_with_pid() {
    let server = fake_server("ready");
    assert_eq!(entry(server.id()).map(|e| e.pid), Some(None));

    server.start().await.expect("start");
    let pid = server.pid().expect("pid");
    let registered = entry(server.id()).expect("registered");

    assert_eq!(registered.pid, Some(pid));
    assert_eq!(registered.scratch_dir, server.scratch_dir());

    server.stop().await.expect("stop");
    assert!(entry(server.id()).is_none());
    assert!(wait_until_gone(pid, Duration::from_secs(2)).await);
}

/// **VALUE**: Verifies `info()` reflects the running child and is `None` while idle.
#[tokio::test]
async fn given_server_when_info_requested_then_matches_running_child() {
    // GIVEN: An idle server
    let server = fake_server("ready");
    assert!(server.info().await.expect("info").is_none());

    // WHEN: Started
    server.start().await.expect("start");
    let info = server.info().await.expect("info").expect("some while active");

    // THEN: Snapshot matches the handle
    assert_eq!(Some(info.pid), server.pid());
    assert_eq!(info.port, server.port());
    assert_eq!(info.version, server.version());
    assert_eq!(info.variant, server.variant());
    assert_eq!(info.executable, server.executable_path());
    assert_eq!(info.state, ServerState::Active);

    server.stop().await.expect("stop");
    assert!(server.info().await.expect("info").is_none());
}

/// **VALUE**: Verifies abandoning `start()` mid-wait leaves a reusable `Idle` handle.
///
/// **WHY THIS MATTERS**: Callers wrap `start()` in their own timeouts and `select!`s. A
/// handle stuck in `Starting` rejects every later `start()` and leaves a stale PID in
/// the exit-cleanup registry, which could later be signalled after the OS reuses it.
///
/// **BUG THIS CATCHES**: Would catch state, PID or registry updates that only happen on
/// the explicit failure paths and are skipped when the future is dropped.
#[tokio::test]
async fn given_start_cancelled_during_readiness_wait_when_inspected_then_idle_and_restartable() {
    // GIVEN: A server that never reports readiness, started under a short outer timeout
    let server = fake_builder("silent")
        .with_startup_timeout(Duration::from_millis(750))
        .build()
        .expect("build");

    // WHEN: The caller gives up before the startup timeout
    let cancelled = tokio::time::timeout(Duration::from_millis(300), server.start()).await;

    // THEN: Back to Idle with nothing attached
    assert!(cancelled.is_err(), "start should still have been waiting");
    assert_eq!(server.state(), ServerState::Idle);
    assert_eq!(server.pid(), None);
    assert_eq!(entry(server.id()).map(|e| e.pid), Some(None));

    // AND: stop() is a no-op and the next start() runs a fresh attempt
    server.stop().await.expect("stop on idle");
    assert!(wait_until_port_free(server.port(), Duration::from_secs(2)).await);
    let second = server.start().await;
    assert!(
        matches!(second, Err(LifecycleError::StartupFailed { .. })),
        "got {second:?}"
    );
    assert_eq!(server.state(), ServerState::Idle);
}

/// **VALUE**: Verifies concurrent `start()` calls on one handle spawn exactly one child.
///
/// **BUG THIS CATCHES**: Would catch the Idle check happening outside the handle lock,
/// which lets both calls spawn and orphans one process on the port.
#[tokio::test]
async fn given_concurrent_starts_on_one_handle_when_joined_then_one_succeeds() {
    // GIVEN: One idle handle
    let server = fake_server("ready");

    // WHEN: Starting it twice at once
    let (first, second) = tokio::join!(server.start(), server.start());

    // THEN: One Ok, one AlreadyRunning, a single running child
    let results = [first, second];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let rejected = results
        .iter()
        .filter(|r| matches!(r, Err(LifecycleError::AlreadyRunning { .. })))
        .count();
    assert_eq!((successes, rejected), (1, 1), "got {results:?}");

    let pid = server.pid().expect("pid while active");
    let info = server.info().await.expect("info").expect("running");
    assert_eq!(info.pid, pid);
    assert!(ping(server.port()).await.is_ok());

    server.stop().await.expect("stop");
    assert!(wait_until_gone(pid, Duration::from_secs(2)).await);
}

/// **VALUE**: Verifies a `stop()` racing a `start()` never leaves the handle half-way.
///
/// **WHY THIS MATTERS**: Test teardown can run while a start is still in flight; both
/// calls serialize on the handle lock, so the handle ends either stopped or running,
/// never in `Starting` or `Stopping`.
#[tokio::test]
async fn given_start_and_stop_racing_when_joined_then_settles_in_stable_state() {
    // GIVEN: One idle handle
    let server = fake_server("ready");

    // WHEN: Start and stop are issued together
    let (started, stopped) = tokio::join!(server.start(), server.stop());

    // THEN: Both succeed and the state is stable and consistent
    started.expect("start");
    stopped.expect("stop");
    match server.state() {
        ServerState::Idle => assert_eq!(server.pid(), None),
        ServerState::Active => {
            assert!(server.pid().is_some());
            server.stop().await.expect("final stop");
        }
        other => panic!("handle left in {other}"),
    }
    assert_eq!(server.state(), ServerState::Idle);
}
