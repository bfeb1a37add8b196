use std::fmt::{Display, Formatter, Result as FormatResult};

use serde::Serialize;

/// Lifecycle state of one embedded server handle.
///
/// Stored as a `u8` inside an atomic so readers never take the handle lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum ServerState {
    Idle = 0,
    Starting = 1,
    Active = 2,
    Stopping = 3,
}

impl ServerState {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ServerState::Idle),
            1 => Some(ServerState::Starting),
            2 => Some(ServerState::Active),
            3 => Some(ServerState::Stopping),
            _ => None,
        }
    }

    /// A child process is attached in every state except `Idle`.
    pub const fn has_process(self) -> bool {
        !matches!(self, ServerState::Idle)
    }
}

impl Display for ServerState {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> FormatResult {
        let name = match self {
            ServerState::Idle => "idle",
            ServerState::Starting => "starting",
            ServerState::Active => "active",
            ServerState::Stopping => "stopping",
        };
        formatter.write_str(name)
    }
}
