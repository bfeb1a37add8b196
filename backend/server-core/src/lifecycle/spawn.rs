use crate::PORT_FLAG;
use crate::error::lifecycle::LifecycleError;

use common::ErrorLocation;

use std::io::ErrorKind;
use std::panic::Location;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use log::{debug, info};
use tokio::process::Child as TokioChild;
use tokio::process::Command as TokioCommand;
use tokio::time::sleep as TokioSleep;

/// Retries when exec races a concurrent fork that still holds the freshly
/// written executable open for writing.
const BUSY_RETRIES: u32 = 5;
const BUSY_RETRY_DELAY: Duration = Duration::from_millis(20);

/// `<executable> --port <port>`, run from the executable's directory.
///
/// stdout and stderr are both piped; the readiness scan reads them as one
/// stream. The child is killed if its handle is dropped.
pub(crate) fn build_spawn_command(executable: &Path, port: u16) -> TokioCommand {
    let mut cmd = TokioCommand::new(executable);
    cmd.arg(PORT_FLAG)
        .arg(port.to_string())
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    if let Some(dir) = executable.parent() {
        cmd.current_dir(dir);
    }

    cmd
}

pub(crate) async fn spawn_server_process(
    executable: &Path,
    port: u16,
) -> Result<TokioChild, LifecycleError> {
    debug!("Spawning {} {PORT_FLAG} {port}", executable.display());

    let mut attempt = 0;
    let child = loop {
        match build_spawn_command(executable, port).spawn() {
            Ok(child) => break child,
            Err(e) if e.kind() == ErrorKind::ExecutableFileBusy && attempt < BUSY_RETRIES => {
                attempt += 1;
                debug!("Executable busy, retrying spawn ({attempt}/{BUSY_RETRIES})");
                TokioSleep(BUSY_RETRY_DELAY * attempt).await;
            }
            Err(e) => {
                return Err(LifecycleError::Spawn {
                    message: format!("Failed to spawn {}: {e}", executable.display()),
                    location: ErrorLocation::from(Location::caller()),
                    source: Box::new(e),
                });
            }
        }
    };

    info!(
        "Spawned {} on port {port} (PID: {:?})",
        executable.display(),
        child.id()
    );

    Ok(child)
}
