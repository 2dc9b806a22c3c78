//! Local port allocation.

use std::net::Ipv4Addr;
use std::net::TcpListener;

use tracing::debug;

use crate::error::EnvironmentError;

/// Returns a TCP port that was free on the loopback interface a moment ago.
///
/// The probe socket is closed before returning, so another process can
/// claim the port before the server binds it. Callers accept that race.
pub fn pick_unused_port() -> Result<u16, EnvironmentError> {
    let listener =
        TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).map_err(EnvironmentError::PortAllocation)?;
    let port = listener
        .local_addr()
        .map_err(EnvironmentError::PortAllocation)?
        .port();
    drop(listener);
    debug!(port, "Picked unused port");
    Ok(port)
}

/// Whether `port` can currently be bound on the loopback interface.
pub fn is_port_free(port: u16) -> bool {
    TcpListener::bind((Ipv4Addr::LOCALHOST, port)).is_ok()
}
