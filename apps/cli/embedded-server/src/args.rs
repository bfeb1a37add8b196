//! Command-line options. Every option overrides the matching config value.

use models::OsVariant;
use server_core::config::{EmbeddedConfig, default_config_dir};

use std::path::PathBuf;

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "embedded-server")]
#[command(about = "Provision a throwaway redis-server and run it until Ctrl+C")]
#[command(version)]
pub struct Args {
    /// Port to listen on (default: a free port chosen by the OS)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Server version to provision (e.g. 2.8.5)
    #[arg(long)]
    pub server_version: Option<String>,

    /// Executable variant: windows-32, windows-64, unix or macos (default: detect)
    #[arg(long)]
    pub os_variant: Option<OsVariant>,

    /// Root of the redis/{version}/{variant}/ binary tree
    #[arg(long)]
    pub binary_root: Option<PathBuf>,

    /// Directory holding embedded-server.toml
    #[arg(long)]
    pub config_dir: Option<PathBuf>,

    /// Also write logs to embedded-server.log in this directory
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Seconds to wait for the readiness line
    #[arg(long)]
    pub startup_timeout: Option<u64>,

    /// Seconds to wait for a graceful exit before killing
    #[arg(long)]
    pub stop_timeout: Option<u64>,

    /// Persist the effective settings back to the config directory
    #[arg(long)]
    pub save_config: bool,

    /// Log every line the server prints
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    pub fn config_dir(&self) -> PathBuf {
        self.config_dir.clone().unwrap_or_else(default_config_dir)
    }

    /// Overlay the options that were given onto `config`.
    pub fn apply_to(&self, config: &mut EmbeddedConfig) {
        if let Some(port) = self.port {
            config.server.port = Some(port);
        }
        if let Some(ref version) = self.server_version {
            config.server.version = version.clone();
        }
        if let Some(variant) = self.os_variant {
            config.server.os_variant = Some(variant);
        }
        if let Some(ref root) = self.binary_root {
            config.repository.binary_root = Some(root.clone());
        }
        if let Some(secs) = self.startup_timeout {
            config.timeouts.startup_secs = secs;
        }
        if let Some(secs) = self.stop_timeout {
            config.timeouts.stop_secs = secs;
        }
    }
}
