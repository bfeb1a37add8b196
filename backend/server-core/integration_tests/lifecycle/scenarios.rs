use crate::helpers::{fake_builder, fake_server, ping};

use server_core::error::lifecycle::LifecycleError;
use server_core::error::port::PortError;

use models::ServerState;

use std::net::TcpListener;

// ============================================================================
// End-to-end scenarios against the fake server
// ============================================================================

/// **VALUE**: Verifies the basic start/stop round trip on an OS-assigned port.
///
/// **WHY THIS MATTERS**: This is how every test suite uses the crate: construct, start,
/// talk to the server, stop.
#[tokio::test]
async fn given_auto_port_when_started_and_stopped_then_active_only_in_between() {
    // GIVEN: A handle with an auto-assigned port
    let server = fake_server("ready");
    assert!(server.port() > 0);
    assert!(!server.is_active());

    // WHEN: Starting
    server.start().await.expect("start should succeed");

    // THEN: Active and accepting connections
    assert!(server.is_active());
    assert_eq!(ping(server.port()).await.expect("connect"), "+PONG\r\n");

    // WHEN: Stopping
    server.stop().await.expect("stop should succeed");

    // THEN: No longer active
    assert!(!server.is_active());
    assert_eq!(server.state(), ServerState::Idle);
}

/// **VALUE**: Verifies two handles run side by side on distinct ports.
///
/// **WHY THIS MATTERS**: Parallel test suites each start their own server; a shared port
/// or scratch directory would make one suite talk to the other's server.
#[tokio::test]
async fn given_two_handles_when_started_concurrently_then_both_serve_on_distinct_ports() {
    // GIVEN: Two independent handles
    let first = fake_server("ready");
    let second = fake_server("ready");
    assert_ne!(first.port(), second.port());
    assert_ne!(first.scratch_dir(), second.scratch_dir());

    // WHEN: Starting both at once
    let (a, b) = tokio::join!(first.start(), second.start());
    a.expect("first start");
    b.expect("second start");

    // THEN: Both accept connections simultaneously
    assert!(first.is_active() && second.is_active());
    assert_ne!(first.pid(), second.pid());
    assert!(ping(first.port()).await.is_ok());
    assert!(ping(second.port()).await.is_ok());

    let (a, b) = tokio::join!(first.stop(), second.stop());
    a.expect("first stop");
    b.expect("second stop");
}

/// **VALUE**: Verifies an occupied explicit port fails fast with a port-in-use error.
///
/// **WHY THIS MATTERS**: Without the pre-spawn bind check the server would die on bind and the
/// caller would wait out the whole startup timeout before seeing a generic failure.
///
/// **BUG THIS CATCHES**: Would catch the check running after spawn, or a failed start
/// leaving the handle stuck outside `Idle`.
#[tokio::test]
async fn given_occupied_port_when_started_then_returns_port_in_use_before_spawning() {
    // GIVEN: A listener holding a port, and a handle pinned to it
    let listener = TcpListener::bind(("127.0.0.1", 0)).expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let server = fake_builder("ready")
        .with_port(port)
        .build()
        .expect("build");

    // WHEN: Starting
    let result = server.start().await;

    // THEN: PortInUse for that port; nothing spawned
    match result {
        Err(LifecycleError::Port(PortError::PortInUse { port: reported, .. })) => {
            assert_eq!(reported, port);
        }
        other => panic!("expected PortInUse, got {other:?}"),
    }
    assert_eq!(server.state(), ServerState::Idle);
    assert_eq!(server.pid(), None);

    drop(listener);
}
