//! Port selection and availability checks.
//!
//! Auto-assigned ports come from the OS (bind to port 0, read the port back,
//! release it). The window between releasing the test socket and the server
//! binding is unavoidable; callers retry construction on a bind failure.

use crate::SERVER_HOSTNAME;
use crate::error::port::PortError;

use common::ErrorLocation;

use std::io::ErrorKind;
use std::net::TcpListener;
use std::panic::Location;

use log::{debug, trace};
use netstat2::{
    AddressFamilyFlags, ProtocolFlags, ProtocolSocketInfo, TcpState, get_sockets_info,
};

/// Ask the OS for a currently free TCP port on the loopback interface.
#[track_caller]
pub fn find_free_port() -> Result<u16, PortError> {
    let listener = TcpListener::bind((SERVER_HOSTNAME, 0)).map_err(|e| PortError::Allocation {
        message: format!("Failed to bind an ephemeral port on {SERVER_HOSTNAME}: {e}"),
        location: ErrorLocation::from(Location::caller()),
        source: Box::new(e),
    })?;

    let port = listener
        .local_addr()
        .map_err(|e| PortError::Allocation {
            message: format!("Failed to read ephemeral port: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        })?
        .port();

    debug!("OS assigned free port {port}");
    Ok(port)
}

/// Fail with [`PortError::PortInUse`] if something is already listening on `port`.
///
/// The test socket is closed before returning.
#[track_caller]
pub fn ensure_port_available(port: u16) -> Result<(), PortError> {
    match TcpListener::bind((SERVER_HOSTNAME, port)) {
        Ok(listener) => {
            drop(listener);
            trace!("Port {port} is available");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::AddrInUse => {
            let owner_pid = port_owner(port);
            let owner = owner_pid
                .map(|pid| format!(" by PID {pid}"))
                .unwrap_or_default();

            Err(PortError::PortInUse {
                port,
                owner_pid,
                message: format!("Port {port} on {SERVER_HOSTNAME} is already in use{owner}"),
                location: ErrorLocation::from(Location::caller()),
            })
        }
        Err(e) => Err(PortError::Allocation {
            message: format!("Failed to check port {port} on {SERVER_HOSTNAME}: {e}"),
            location: ErrorLocation::from(Location::caller()),
            source: Box::new(e),
        }),
    }
}

/// PID of the process listening on `port`, if the OS will tell us.
pub fn port_owner(port: u16) -> Option<u32> {
    let sockets = match get_sockets_info(
        AddressFamilyFlags::IPV4 | AddressFamilyFlags::IPV6,
        ProtocolFlags::TCP,
    ) {
        Ok(sockets) => sockets,
        Err(e) => {
            trace!("Socket table query failed: {e}");
            return None;
        }
    };

    sockets.into_iter().find_map(|s| match s.protocol_socket_info {
        ProtocolSocketInfo::Tcp(tcp) if tcp.state == TcpState::Listen && tcp.local_port == port => {
            s.associated_pids.first().copied()
        }
        _ => None,
    })
}
