//! Launcher workflow: config, provision, start, report, wait, stop.

use crate::args::Args;
use crate::error::CliError;

use common::ErrorLocation;
use models::ServerInfo;
use server_core::EmbeddedServer;
use server_core::config::EmbeddedConfig;
use server_core::error::lifecycle::LifecycleError;

use std::future::Future;
use std::io::Write;
use std::panic::Location;

use log::{info, warn};

/// Load config, apply `args`, start one server and keep it up until `shutdown` resolves.
///
/// Writes the running server's [`ServerInfo`] as one JSON line to `out` once it
/// is ready, and returns the same snapshot after the server has been stopped.
/// If `shutdown` resolves while the server is still starting, the start is abandoned
/// and [`CliError::Interrupted`] is returned.
pub async fn run_until<W, F>(args: &Args, out: &mut W, shutdown: F) -> Result<ServerInfo, CliError>
where
    W: Write,
    F: Future<Output = ()>,
{
    let config_dir = args.config_dir();
    let mut config = EmbeddedConfig::load(&config_dir)?;
    args.apply_to(&mut config);
    config.validate()?;

    if args.save_config {
        config.save(&config_dir)?;
    }

    let server = EmbeddedServer::from_config(&config)?;
    info!(
        "Starting {} {} ({}) on {}",
        server_core::SERVER_BINARY,
        server.version(),
        server.variant(),
        server.address()
    );

    tokio::pin!(shutdown);

    // Dropping the start future kills the child and returns the handle to Idle.
    tokio::select! {
        started = server.start() => started?,
        () = &mut shutdown => {
            info!("Shutdown requested while starting, abandoning server on port {}", server.port());
            return Err(CliError::Interrupted {
                message: String::from("Shutdown requested before the server became ready"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    }

    let report = match report(&server, out).await {
        Ok(info) => info,
        Err(e) => {
            if let Err(stop_err) = server.stop().await {
                warn!("Failed to stop server after report error: {stop_err}");
            }
            return Err(e);
        }
    };

    shutdown.await;
    info!("Shutdown requested, stopping server on port {}", server.port());

    server.stop().await?;
    Ok(report)
}

async fn report<W: Write>(server: &EmbeddedServer, out: &mut W) -> Result<ServerInfo, CliError> {
    let info = server.info().await?.ok_or_else(|| LifecycleError::Validation {
        message: String::from("Server reported ready but has no running process"),
        location: ErrorLocation::from(Location::caller()),
    })?;

    let json = serde_json::to_string(&info).map_err(|e| CliError::Output {
        message: String::from("Failed to encode server info"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })?;

    writeln!(out, "{json}")
        .and_then(|()| out.flush())
        .map_err(|e| CliError::Output {
            message: String::from("Failed to write server info"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        })?;

    Ok(info)
}
