use crate::error::lifecycle::LifecycleError;

use common::ErrorLocation;

use std::panic::Location;
use std::process::ExitStatus;
use std::thread::sleep;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, trace, warn};
use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, Signal, System};
use tokio::process::Child as TokioChild;
use tokio::time::timeout as TokioTimeout;

const KILL_VERIFY_MAX_ELAPSED: Duration = Duration::from_secs(5);

pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);

    sys.process(pid).map(f)
}

/// Whether `pid` refers to a process that has not exited.
///
/// Zombies count as exited: they are waiting to be reaped, not running.
pub fn is_running(pid: u32) -> bool {
    with_process(pid, |p| {
        !matches!(p.status(), ProcessStatus::Zombie | ProcessStatus::Dead)
    })
    .unwrap_or(false)
}

/// Send SIGTERM. `None` when the process is gone or the platform has no such signal.
fn send_terminate(pid: u32) -> Option<bool> {
    with_process(pid, |p| p.kill_with(Signal::Term)).flatten()
}

/// Stop a process we do not hold a `Child` for.
///
/// Sends SIGTERM (SIGKILL where unsupported), then polls with exponential
/// backoff for up to 5 seconds, escalating to SIGKILL once the backoff runs out.
///
/// # Returns
///
/// * `true` - The process is gone
/// * `false` - The process survived SIGKILL, or could not be signalled
pub fn stop_pid(pid: u32) -> bool {
    let signalled = with_process(pid, |p| {
        if let Some(sent) = p.kill_with(Signal::Term) {
            debug!("Sent SIGTERM to PID {pid}: success={sent}");
            sent
        } else {
            let killed = p.kill();
            debug!("Sent SIGKILL to PID {pid}: success={killed}");
            killed
        }
    });

    match signalled {
        None => {
            debug!("Process {pid} not found");
            return true;
        }
        Some(false) => return !is_running(pid),
        Some(true) => {}
    }

    let mut backoff = ExponentialBackoff {
        max_elapsed_time: Some(KILL_VERIFY_MAX_ELAPSED),
        ..Default::default()
    };

    loop {
        if !is_running(pid) {
            debug!("Process {pid} successfully terminated");
            return true;
        }

        match backoff.next_backoff() {
            Some(duration) => {
                trace!("Process {pid} still alive, retrying after {duration:?}");
                sleep(duration);
            }
            None => {
                warn!("Process {pid} ignored SIGTERM, sending SIGKILL");
                with_process(pid, |p| p.kill());
                return !is_running(pid);
            }
        }
    }
}

/// Terminate a child we spawned and reap it.
///
/// Graceful first: SIGTERM, then up to `grace` for the child to exit. After
/// that, or where SIGTERM is unavailable, the child is killed. A child that has
/// already exited counts as stopped.
pub(crate) async fn terminate_child(
    child: &mut TokioChild,
    grace: Duration,
) -> Result<ExitStatus, LifecycleError> {
    if let Some(status) = child.try_wait().map_err(|e| LifecycleError::Stop {
        message: format!("Failed to query child status: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })? {
        debug!("Child already exited with {status}");
        return Ok(status);
    }

    let pid = child.id();
    let graceful = pid.and_then(send_terminate).unwrap_or(false);

    if graceful {
        debug!("Sent SIGTERM to PID {pid:?}, waiting up to {grace:?}");

        match TokioTimeout(grace, child.wait()).await {
            Ok(Ok(status)) => return Ok(status),
            Ok(Err(e)) => {
                return Err(LifecycleError::Stop {
                    message: format!("Failed to wait for PID {pid:?}: {e}"),
                    location: ErrorLocation::from(Location::caller()),
                    source: Box::new(e),
                });
            }
            Err(_) => warn!("PID {pid:?} still running after {grace:?}, killing"),
        }
    }

    kill_child(child).await
}

/// SIGKILL and reap.
pub(crate) async fn kill_child(child: &mut TokioChild) -> Result<ExitStatus, LifecycleError> {
    if let Err(e) = child.start_kill() {
        // Exited between the check and the signal.
        if let Ok(Some(status)) = child.try_wait() {
            return Ok(status);
        }

        return Err(LifecycleError::Stop {
            message: format!("Failed to kill PID {:?}: {e}", child.id()),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        });
    }

    child.wait().await.map_err(|e| LifecycleError::Stop {
        message: format!("Failed to reap killed child: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })
}
