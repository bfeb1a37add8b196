//! Process-wide registry of resources that must not outlive the program.
//!
//! Every [`EmbeddedServer`](crate::EmbeddedServer) registers its scratch
//! directory at construction and its child PID while one is running. A clean
//! `stop()` or drop removes the entry. Whatever is still registered when the
//! program is interrupted is swept by [`run_registered`], which the optional
//! signal hook calls before exiting.

use crate::error::cleanup::CleanupError;
use crate::lifecycle::process::stop_pid;

use common::ErrorLocation;

use std::collections::HashMap;
use std::fs::remove_dir_all;
use std::io::ErrorKind;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::exit;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

use log::{debug, info, warn};
use once_cell::sync::Lazy;
use uuid::Uuid;

/// Exit code used after an interrupt-triggered sweep (128 + SIGINT).
const INTERRUPTED_EXIT_CODE: i32 = 130;

static REGISTRY: Lazy<Mutex<HashMap<Uuid, CleanupEntry>>> = Lazy::new(Default::default);

static SIGNAL_HOOK_INSTALLED: AtomicBool = AtomicBool::new(false);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupEntry {
    pub scratch_dir: PathBuf,
    pub pid: Option<u32>,
}

/// What a sweep actually did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupReport {
    pub processes_stopped: Vec<u32>,
    pub directories_removed: Vec<PathBuf>,
    pub failures: Vec<String>,
}

fn registry() -> MutexGuard<'static, HashMap<Uuid, CleanupEntry>> {
    // A panic elsewhere must not stop cleanup from running.
    REGISTRY.lock().unwrap_or_else(|e| e.into_inner())
}

/// Insert or replace the entry for `id`.
pub(crate) fn register(id: Uuid, scratch_dir: &Path, pid: Option<u32>) {
    debug!("Registering cleanup for {id}: dir={}, pid={pid:?}", scratch_dir.display());
    registry().insert(
        id,
        CleanupEntry {
            scratch_dir: scratch_dir.to_path_buf(),
            pid,
        },
    );
}

pub(crate) fn deregister(id: Uuid) {
    if registry().remove(&id).is_some() {
        debug!("Deregistered cleanup for {id}");
    }
}

pub fn entry(id: Uuid) -> Option<CleanupEntry> {
    registry().get(&id).cloned()
}

pub fn registered_count() -> usize {
    registry().len()
}

/// Stop every registered process and remove every registered directory.
///
/// The registry is emptied first, so concurrent calls never double-handle an entry.
pub fn run_registered() -> CleanupReport {
    let entries: Vec<(Uuid, CleanupEntry)> = registry().drain().collect();
    let mut report = CleanupReport::default();

    if entries.is_empty() {
        return report;
    }

    info!("Cleaning up {} embedded server(s)", entries.len());

    for (id, entry) in entries {
        if let Some(pid) = entry.pid {
            if stop_pid(pid) {
                report.processes_stopped.push(pid);
            } else {
                warn!("Could not stop PID {pid} for {id}");
                report.failures.push(format!("PID {pid} still running"));
            }
        }

        match remove_dir_all(&entry.scratch_dir) {
            Ok(()) => report.directories_removed.push(entry.scratch_dir),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                warn!(
                    "Could not remove scratch directory {}: {e}",
                    entry.scratch_dir.display()
                );
                report
                    .failures
                    .push(format!("{}: {e}", entry.scratch_dir.display()));
            }
        }
    }

    report
}

/// Install a Ctrl+C / SIGTERM handler that sweeps the registry and exits with 130.
///
/// Safe to call more than once; only the first call installs the handler.
/// Programs that handle signals themselves should call [`run_registered`]
/// from their own handler instead.
#[track_caller]
pub fn install_signal_hook() -> Result<(), CleanupError> {
    if SIGNAL_HOOK_INSTALLED.swap(true, Ordering::SeqCst) {
        debug!("Cleanup signal hook already installed");
        return Ok(());
    }

    ctrlc::set_handler(|| {
        let report = run_registered();
        info!(
            "Interrupted: stopped {} process(es), removed {} director(ies)",
            report.processes_stopped.len(),
            report.directories_removed.len()
        );
        exit(INTERRUPTED_EXIT_CODE);
    })
    .map_err(|e| {
        SIGNAL_HOOK_INSTALLED.store(false, Ordering::SeqCst);
        CleanupError::SignalHook {
            message: format!("Failed to install cleanup signal handler: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        }
    })
}
