//! Process lifecycle controller.
//!
//! [`EmbeddedServer`] owns one child process and drives it through
//! `Idle -> Starting -> Active -> Stopping -> Idle`:
//! - `start()` is only legal from `Idle` and resolves once the child prints its
//!   readiness line (or fails with the child reaped and the state back at `Idle`)
//! - `stop()` is a no-op unless `Active`
//! - `start()` and `stop()` on the same handle serialize on one async mutex;
//!   `is_active()` reads an atomic and never waits for them

pub mod process;
pub mod readiness;
pub mod spawn;

use crate::SERVER_HOSTNAME;
use crate::cleanup;
use crate::config::EmbeddedConfig;
use crate::error::CoreError;
use crate::error::lifecycle::LifecycleError;
use crate::error::provision::ProvisionError;
use crate::lifecycle::process::{kill_child, terminate_child};
use crate::lifecycle::readiness::{
    Readiness, default_ready_regex, drain_output, format_tail, merge_output, scan_for_marker,
};
use crate::lifecycle::spawn::spawn_server_process;
use crate::port::{ensure_port_available, find_free_port};
use crate::provision::repository::BinaryRepository;
use crate::provision::{ProvisionedExecutable, resolve};

use common::ErrorLocation;
use models::{OsVariant, ServerInfo, ServerInfoBuilder, ServerState, VariantSelector};

use std::collections::VecDeque;
use std::panic::Location;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU32, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use regex::Regex;
use tokio::process::Child as TokioChild;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::timeout as TokioTimeout;
use uuid::Uuid;

const DEFAULT_STARTUP_TIMEOUT: Duration = Duration::from_secs(30);
const DEFAULT_STOP_TIMEOUT: Duration = Duration::from_secs(10);

/// The child process attached to a handle while it is not `Idle`.
#[derive(Debug)]
struct RunningServer {
    child: TokioChild,
    pid: u32,
    drain: JoinHandle<()>,
}

/// One provisioned, controllable server process.
///
/// Dropping a running handle kills the child and removes the scratch directory.
#[derive(Debug)]
pub struct EmbeddedServer {
    id: Uuid,
    port: u16,
    executable: ProvisionedExecutable,
    ready_pattern: Regex,
    startup_timeout: Duration,
    stop_timeout: Duration,
    state: AtomicU8,
    pid: AtomicU32,
    running: Mutex<Option<RunningServer>>,
}

/// Builder for [`EmbeddedServer`].
#[derive(Debug)]
pub struct EmbeddedServerBuilder {
    repository: Arc<dyn BinaryRepository>,
    selector: VariantSelector,
    port: Option<u16>,
    startup_timeout: Duration,
    stop_timeout: Duration,
    ready_pattern: Option<Regex>,
}

impl EmbeddedServerBuilder {
    pub fn with_selector(mut self, selector: VariantSelector) -> Self {
        self.selector = selector;
        self
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.selector = self.selector.with_version(version);
        self
    }

    pub fn with_os_variant(mut self, variant: OsVariant) -> Self {
        self.selector = self.selector.with_os_variant(variant);
        self
    }

    /// Bind to a fixed port instead of asking the OS for a free one.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn with_startup_timeout(mut self, timeout: Duration) -> Self {
        self.startup_timeout = timeout;
        self
    }

    pub fn with_stop_timeout(mut self, timeout: Duration) -> Self {
        self.stop_timeout = timeout;
        self
    }

    /// Override the readiness line pattern (default: the exact legacy marker).
    pub fn with_ready_pattern(mut self, pattern: Regex) -> Self {
        self.ready_pattern = Some(pattern);
        self
    }

    /// Resolve and extract the executable, then fix the port.
    #[track_caller]
    pub fn build(self) -> Result<EmbeddedServer, ProvisionError> {
        if self.port == Some(0) {
            return Err(ProvisionError::Validation {
                message: String::from("Port must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.startup_timeout.is_zero() || self.stop_timeout.is_zero() {
            return Err(ProvisionError::Validation {
                message: String::from("Startup and stop timeouts must be non-zero"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let executable = resolve(&self.selector, self.repository)?;

        let port = match self.port {
            Some(port) => port,
            None => find_free_port()?,
        };

        let id = Uuid::new_v4();
        cleanup::register(id, executable.scratch_dir(), None);

        debug!("Constructed embedded server {id} on port {port}");

        Ok(EmbeddedServer {
            id,
            port,
            executable,
            ready_pattern: self
                .ready_pattern
                .unwrap_or_else(|| default_ready_regex().clone()),
            startup_timeout: self.startup_timeout,
            stop_timeout: self.stop_timeout,
            state: AtomicU8::new(ServerState::Idle.as_u8()),
            pid: AtomicU32::new(0),
            running: Mutex::new(None),
        })
    }
}

impl EmbeddedServer {
    pub fn builder(repository: Arc<dyn BinaryRepository>) -> EmbeddedServerBuilder {
        EmbeddedServerBuilder {
            repository,
            selector: VariantSelector::default(),
            port: None,
            startup_timeout: DEFAULT_STARTUP_TIMEOUT,
            stop_timeout: DEFAULT_STOP_TIMEOUT,
            ready_pattern: None,
        }
    }

    /// Default version, host variant, OS-assigned port.
    #[track_caller]
    pub fn new(repository: Arc<dyn BinaryRepository>) -> Result<Self, ProvisionError> {
        Self::builder(repository).build()
    }

    #[track_caller]
    pub fn with_port(
        repository: Arc<dyn BinaryRepository>,
        port: u16,
    ) -> Result<Self, ProvisionError> {
        Self::builder(repository).with_port(port).build()
    }

    /// Build from a loaded [`EmbeddedConfig`] using its directory repository.
    #[track_caller]
    pub fn from_config(config: &EmbeddedConfig) -> Result<Self, CoreError> {
        config.validate()?;

        let mut builder = Self::builder(config.repository())
            .with_selector(config.selector())
            .with_startup_timeout(config.startup_timeout())
            .with_stop_timeout(config.stop_timeout())
            .with_ready_pattern(config.ready_regex()?);

        if let Some(port) = config.server.port {
            builder = builder.with_port(port);
        }

        Ok(builder.build()?)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn version(&self) -> &str {
        self.executable.version()
    }

    pub fn variant(&self) -> OsVariant {
        self.executable.variant()
    }

    pub fn executable_path(&self) -> &Path {
        self.executable.executable()
    }

    pub fn scratch_dir(&self) -> &Path {
        self.executable.scratch_dir()
    }

    pub fn state(&self) -> ServerState {
        ServerState::from_u8(self.state.load(Ordering::SeqCst)).unwrap_or(ServerState::Idle)
    }

    pub fn is_active(&self) -> bool {
        self.state() == ServerState::Active
    }

    /// PID of the attached child, if any.
    pub fn pid(&self) -> Option<u32> {
        match self.pid.load(Ordering::SeqCst) {
            0 => None,
            pid => Some(pid),
        }
    }

    /// `host:port` clients should connect to.
    pub fn address(&self) -> String {
        format!("{SERVER_HOSTNAME}:{}", self.port)
    }

    fn set_state(&self, state: ServerState) {
        debug!("Server on port {} -> {state}", self.port);
        self.state.store(state.as_u8(), Ordering::SeqCst);
    }

    fn set_pid(&self, pid: Option<u32>) {
        self.pid.store(pid.unwrap_or(0), Ordering::SeqCst);
    }

    /// Spawn the server and wait until it reports readiness.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::AlreadyRunning`] - The handle is not `Idle`
    /// * [`LifecycleError::Port`] - Something already listens on the port
    /// * [`LifecycleError::Spawn`] - The executable could not be launched
    /// * [`LifecycleError::StartupFailed`] - The child exited, closed its output,
    ///   or stayed silent past the startup timeout
    pub async fn start(&self) -> Result<(), LifecycleError> {
        let mut running = self.running.lock().await;

        let state = self.state();
        if state != ServerState::Idle || running.is_some() {
            return Err(LifecycleError::AlreadyRunning {
                message: format!(
                    "This server instance is already running on port {} (state: {state})",
                    self.port
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        ensure_port_available(self.port)?;

        if !self.executable.is_materialized() {
            self.executable.rematerialize()?;
        }

        let mut child = spawn_server_process(self.executable.executable(), self.port).await?;
        let pid = child.id().unwrap_or_default();

        let mut output = match merge_output(&mut child) {
            Ok(output) => output,
            Err(e) => {
                reap_failed_start(&mut child).await;
                return Err(e);
            }
        };

        // Declared after `child` so it drops first if this future is abandoned.
        let guard = StartupGuard::arm(self, pid);

        let mut tail = VecDeque::new();
        let outcome = TokioTimeout(
            self.startup_timeout,
            scan_for_marker(&mut output, &self.ready_pattern, &mut tail),
        )
        .await;

        match outcome {
            Ok(Readiness::Ready(line)) => {
                debug!("Readiness line: {line}");
                let drain = drain_output(output, self.port);
                *running = Some(RunningServer { child, pid, drain });
                guard.disarm();
                self.set_state(ServerState::Active);
                info!("Server ready on {} (PID: {pid})", self.address());
                Ok(())
            }
            Ok(Readiness::StreamClosed) => {
                let exit = reap_failed_start(&mut child).await;
                drop(guard);
                Err(LifecycleError::StartupFailed {
                    message: format!(
                        "Server on port {} closed its output before signalling readiness ({exit}); last output: {}",
                        self.port,
                        format_tail(&tail)
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
            Err(_) => {
                warn!(
                    "Server on port {} not ready after {:?}, killing PID {pid}",
                    self.port, self.startup_timeout
                );
                let exit = reap_failed_start(&mut child).await;
                drop(guard);
                Err(LifecycleError::StartupFailed {
                    message: format!(
                        "Server on port {} did not signal readiness within {:?} ({exit}); last output: {}",
                        self.port,
                        self.startup_timeout,
                        format_tail(&tail)
                    ),
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    /// Back to `Idle` with no child attached.
    fn reset_to_idle(&self) {
        self.set_pid(None);
        cleanup::register(self.id, self.executable.scratch_dir(), None);
        self.set_state(ServerState::Idle);
    }

    /// Terminate the server, wait for it to exit and remove the scratch directory.
    ///
    /// Calling `stop` on an idle handle does nothing. A child that already
    /// exited on its own counts as stopped.
    ///
    /// # Errors
    ///
    /// * [`LifecycleError::Stop`] - The child could not be signalled or reaped;
    ///   the handle stays `Active`
    /// * [`LifecycleError::Provision`] - The process is gone but the scratch
    ///   directory could not be removed
    pub async fn stop(&self) -> Result<(), LifecycleError> {
        let mut running = self.running.lock().await;

        let Some(mut server) = running.take() else {
            debug!("Stop requested for idle server on port {}", self.port);
            return Ok(());
        };

        self.set_state(ServerState::Stopping);

        let status = match terminate_child(&mut server.child, self.stop_timeout).await {
            Ok(status) => status,
            Err(e) => {
                warn!("Failed to stop server on port {}: {e}", self.port);
                *running = Some(server);
                self.set_state(ServerState::Active);
                return Err(e);
            }
        };

        server.drain.abort();
        self.set_pid(None);
        self.set_state(ServerState::Idle);

        info!(
            "Server on port {} stopped (PID: {}, {status})",
            self.port, server.pid
        );

        if let Err(e) = self.executable.release() {
            cleanup::register(self.id, self.executable.scratch_dir(), None);
            return Err(e.into());
        }

        cleanup::deregister(self.id);
        Ok(())
    }

    /// Snapshot of the running server, `None` while idle.
    pub async fn info(&self) -> Result<Option<ServerInfo>, LifecycleError> {
        let running = self.running.lock().await;

        let Some(server) = running.as_ref() else {
            return Ok(None);
        };

        let info = ServerInfoBuilder::default()
            .with_pid(server.pid)
            .with_port(self.port)
            .with_version(self.executable.version())
            .with_variant(self.executable.variant())
            .with_executable(self.executable.executable())
            .with_state(self.state())
            .build()?;

        Ok(Some(info))
    }
}

/// Returns the handle to `Idle` unless disarmed.
///
/// Covers every exit from `start()` before readiness, including the caller
/// dropping the future mid-wait. The child itself is killed by `kill_on_drop`.
struct StartupGuard<'a> {
    server: &'a EmbeddedServer,
    armed: bool,
}

impl<'a> StartupGuard<'a> {
    fn arm(server: &'a EmbeddedServer, pid: u32) -> Self {
        server.set_pid(Some(pid));
        server.set_state(ServerState::Starting);
        cleanup::register(server.id, server.executable.scratch_dir(), Some(pid));
        Self {
            server,
            armed: true,
        }
    }

    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for StartupGuard<'_> {
    fn drop(&mut self) {
        if self.armed {
            debug!(
                "Startup on port {} did not complete, resetting to idle",
                self.server.port
            );
            self.server.reset_to_idle();
        }
    }
}

/// Kill and reap a child that never became ready.
async fn reap_failed_start(child: &mut TokioChild) -> String {
    match kill_child(child).await {
        Ok(status) => format!("exit status: {status}"),
        Err(e) => {
            warn!("Failed to reap child after failed startup: {e}");
            String::from("exit status unknown")
        }
    }
}

impl Drop for EmbeddedServer {
    fn drop(&mut self) {
        if let Some(mut server) = self.running.get_mut().take() {
            warn!(
                "Server on port {} dropped while running, killing PID {}",
                self.port, server.pid
            );
            if let Err(e) = server.child.start_kill() {
                warn!("Failed to kill PID {}: {e}", server.pid);
            }
            server.drain.abort();
        }

        match self.executable.release() {
            Ok(()) => cleanup::deregister(self.id),
            Err(e) => warn!("Scratch directory left for exit cleanup: {e}"),
        }
    }
}
