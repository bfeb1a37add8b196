use embedded_server::args::Args;
use embedded_server::error::CliError;
use embedded_server::run::run_until;

use models::{OsVariant, ServerState};
use server_core::config::{CONFIG_FILE_NAME, EmbeddedConfig};
use server_core::error::CoreError;
use server_core::error::provision::ProvisionError;
use server_core::lifecycle::process::is_running;
use server_core::provision::repository::executable_relative_path;

use std::fs::{create_dir_all, set_permissions, write};
use std::os::unix::fs::PermissionsExt;
use std::path::Path;
use std::time::{Duration, Instant};

use clap::Parser;
use tempfile::tempdir;
use tokio::time::sleep;

/// Stands in for redis-server: prints the readiness line for the port it was given,
/// then idles until signalled.
const FAKE_SCRIPT: &str = "#!/bin/sh\n\
echo \"[$$] # Server started\"\n\
echo \"[$$] * The server is now ready to accept connections on port $2\"\n\
exec sleep 30\n";

/// Never reports readiness.
const HANGING_SCRIPT: &str = "#!/bin/sh\nexec sleep 30\n";

fn write_fake_binary(root: &Path, version: &str) {
    write_script(root, version, FAKE_SCRIPT);
}

fn write_script(root: &Path, version: &str, script: &str) {
    let path = root.join(executable_relative_path(version, OsVariant::Unix));
    create_dir_all(path.parent().unwrap()).unwrap();
    write(&path, script).unwrap();
    set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
}

fn args_for(root: &Path, config_dir: &Path, extra: &[&str]) -> Args {
    let mut argv = vec![
        "embedded-server".to_string(),
        "--os-variant".to_string(),
        "unix".to_string(),
        "--binary-root".to_string(),
        root.display().to_string(),
        "--config-dir".to_string(),
        config_dir.display().to_string(),
        "--stop-timeout".to_string(),
        "2".to_string(),
    ];
    argv.extend(extra.iter().map(|s| s.to_string()));
    Args::parse_from(argv)
}

/// **VALUE**: Verifies the launcher starts the server, reports it, and stops it on shutdown.
///
/// **WHY THIS MATTERS**: The JSON line is how scripts learn the port and PID; the stop on
/// shutdown is what keeps Ctrl+C from leaving a server behind.
#[tokio::test]
async fn given_binary_tree_when_run_until_shutdown_then_reports_and_stops() {
    // GIVEN: A binary tree holding the fake server and an empty config dir
    let root = tempdir().expect("tempdir");
    let config_dir = tempdir().expect("tempdir");
    write_fake_binary(root.path(), "2.8.5");
    let args = args_for(root.path(), config_dir.path(), &[]);

    // WHEN: Running until a short shutdown timer fires
    let mut out = Vec::new();
    let info = run_until(&args, &mut out, sleep(Duration::from_millis(300)))
        .await
        .expect("run should succeed");

    // THEN: One JSON line describing the active server
    let line = String::from_utf8(out).expect("utf8");
    let json: serde_json::Value = serde_json::from_str(line.trim()).expect("json");
    assert_eq!(json["port"], info.port);
    assert_eq!(json["pid"], info.pid);
    assert_eq!(json["variant"], "unix");
    assert_eq!(json["state"], "active");
    assert_eq!(info.state, ServerState::Active);

    // AND: Process and extracted executable are gone afterwards
    assert!(!info.executable.exists());
    for _ in 0..40 {
        if !is_running(info.pid) {
            break;
        }
        sleep(Duration::from_millis(50)).await;
    }
    assert!(!is_running(info.pid));
}

/// **VALUE**: Verifies `--save-config` persists the effective settings.
#[tokio::test]
async fn given_save_config_when_run_then_config_file_written() {
    let root = tempdir().expect("tempdir");
    let config_dir = tempdir().expect("tempdir");
    write_fake_binary(root.path(), "2.8.5");
    let args = args_for(root.path(), config_dir.path(), &["--save-config"]);

    run_until(&args, &mut Vec::new(), async {})
        .await
        .expect("run should succeed");

    assert!(config_dir.path().join(CONFIG_FILE_NAME).is_file());
    let saved = EmbeddedConfig::load(config_dir.path()).expect("load");
    assert_eq!(saved.server.os_variant, Some(OsVariant::Unix));
    assert_eq!(saved.repository.binary_root, Some(root.path().to_path_buf()));
    assert_eq!(saved.timeouts.stop_secs, 2);
}

/// **VALUE**: Verifies a version missing from the tree fails before anything is spawned.
#[tokio::test]
async fn given_missing_version_when_run_then_returns_executable_not_found() {
    let root = tempdir().expect("tempdir");
    let config_dir = tempdir().expect("tempdir");
    write_fake_binary(root.path(), "2.8.5");
    let args = args_for(root.path(), config_dir.path(), &["--server-version", "9.9.9"]);

    let result = run_until(&args, &mut Vec::new(), async {}).await;

    assert!(
        matches!(
            result,
            Err(CliError::Core(CoreError::Provision(
                ProvisionError::ExecutableNotFound { .. }
            )))
        ),
        "got {result:?}"
    );
}

/// **VALUE**: Verifies Ctrl+C during startup aborts the launch instead of waiting it out.
///
/// **BUG THIS CATCHES**: Would catch the shutdown signal only being polled after `start()`
/// returns, which leaves the user waiting for the full startup timeout.
#[tokio::test]
async fn given_shutdown_while_starting_when_run_then_returns_interrupted_promptly() {
    // GIVEN: A server that never becomes ready and a long startup timeout
    let root = tempdir().expect("tempdir");
    let config_dir = tempdir().expect("tempdir");
    write_script(root.path(), "2.8.5", HANGING_SCRIPT);
    let args = args_for(root.path(), config_dir.path(), &["--startup-timeout", "30"]);

    // WHEN: Shutdown fires shortly after launch
    let began = Instant::now();
    let mut out = Vec::new();
    let result = run_until(&args, &mut out, sleep(Duration::from_millis(300))).await;

    // THEN: Interrupted well before the startup timeout, nothing reported
    assert!(
        matches!(result, Err(CliError::Interrupted { .. })),
        "got {result:?}"
    );
    assert!(began.elapsed() < Duration::from_secs(5), "took {:?}", began.elapsed());
    assert!(out.is_empty());
}
