pub mod builder;

use crate::{OsVariant, ServerState};

use std::path::PathBuf;

use serde::Serialize;

/// Snapshot of a running embedded server, as reported to callers and the CLI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ServerInfo {
    pub pid: u32,
    pub port: u16,
    pub version: String,
    pub variant: OsVariant,
    pub executable: PathBuf,
    pub state: ServerState,
}
