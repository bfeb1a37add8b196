use embedded_server::args::Args;
use embedded_server::logger::initialize as LoggerInitialize;
use embedded_server::run::run_until;

use server_core::cleanup::run_registered;

use std::io::stdout;
use std::process::ExitCode;

use clap::Parser;
use log::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logger FIRST
    if let Err(e) = LoggerInitialize(args.log_dir.as_deref(), args.verbose) {
        eprintln!("{e}");
        return ExitCode::FAILURE;
    }

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C, shutting down: {e}");
        }
    };

    let result = run_until(&args, &mut stdout(), shutdown).await;

    // Anything the normal path could not release
    let leftovers = run_registered();
    if !leftovers.failures.is_empty() {
        warn!("Cleanup incomplete: {:?}", leftovers.failures);
    }

    match result {
        Ok(server) => {
            info!("Server on port {} shut down", server.port);
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
