//! Test helpers for lifecycle integration tests.
//!
//! The fake executable is a shell wrapper around the `fake-redis-server` test binary:
//! - The wrapper is what gets provisioned (it is what a repository would hold)
//! - `exec` keeps the spawned PID equal to the fake server's PID
//! - The mode decides how the fake server behaves at startup

use models::{DEFAULT_SERVER_VERSION, OsVariant};
use server_core::lifecycle::process::is_running;
use server_core::port::ensure_port_available;
use server_core::{EmbeddedServer, EmbeddedServerBuilder, MemoryRepository};

use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::{Instant, sleep};

pub const FAKE_SERVER: &str = env!("CARGO_BIN_EXE_fake-redis-server");

pub const TEST_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
pub const TEST_STOP_TIMEOUT: Duration = Duration::from_secs(5);

/// Repository holding `script` under the default version for every variant,
/// so host detection always finds an entry.
pub fn script_repository(script: &str) -> Arc<MemoryRepository> {
    let repository = MemoryRepository::new();
    for variant in OsVariant::ALL {
        repository.insert(DEFAULT_SERVER_VERSION, variant, script.as_bytes().to_vec());
    }
    Arc::new(repository)
}

/// Repository whose executable runs the fake server in `mode`.
pub fn fake_repository(mode: &str) -> Arc<MemoryRepository> {
    script_repository(&format!(
        "#!/bin/sh\nexec \"{FAKE_SERVER}\" --mode {mode} \"$@\"\n"
    ))
}

/// Builder over [`fake_repository`] with test-sized timeouts.
pub fn fake_builder(mode: &str) -> EmbeddedServerBuilder {
    EmbeddedServer::builder(fake_repository(mode))
        .with_startup_timeout(TEST_STARTUP_TIMEOUT)
        .with_stop_timeout(TEST_STOP_TIMEOUT)
}

pub fn fake_server(mode: &str) -> EmbeddedServer {
    fake_builder(mode).build().expect("fake server should provision")
}

/// Connect to the port and read the fake server's greeting.
///
/// Retries briefly: the listen socket may lag the readiness line by a moment.
pub async fn ping(port: u16) -> Result<String, std::io::Error> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        match TcpStream::connect(("127.0.0.1", port)).await {
            Ok(mut stream) => {
                let mut buf = [0u8; 16];
                let n = stream.read(&mut buf).await?;
                return Ok(String::from_utf8_lossy(&buf[..n]).to_string());
            }
            Err(e) if Instant::now() >= deadline => return Err(e),
            Err(_) => sleep(Duration::from_millis(50)).await,
        }
    }
}

/// Wait until `pid` is gone, up to `limit`.
pub async fn wait_until_gone(pid: u32, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if !is_running(pid) {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    !is_running(pid)
}

/// Wait until nothing listens on `port`, up to `limit`.
pub async fn wait_until_port_free(port: u16, limit: Duration) -> bool {
    let deadline = Instant::now() + limit;
    while Instant::now() < deadline {
        if ensure_port_available(port).is_ok() {
            return true;
        }
        sleep(Duration::from_millis(50)).await;
    }
    ensure_port_available(port).is_ok()
}
