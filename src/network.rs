use std::io;
use std::net::{IpAddr, SocketAddr, UdpSocket};
use std::time::Duration;

use tracing::debug;

const SOCKET_TIMEOUT: Duration = Duration::from_secs(2);

/// Address of the interface the OS would route `target` through.
/// UDP `connect` only picks a route, nothing is sent.
pub fn local_ip(target: SocketAddr) -> Option<IpAddr> {
    match route_source(target) {
        Ok(ip) => Some(ip),
        Err(e) => {
            debug!(%target, error = %e, "local ip unavailable");
            None
        }
    }
}

fn route_source(target: SocketAddr) -> io::Result<IpAddr> {
    let bind: SocketAddr = match target {
        SocketAddr::V4(_) => ([0, 0, 0, 0], 0).into(),
        SocketAddr::V6(_) => ([0u16; 8], 0).into(),
    };
    let socket = UdpSocket::bind(bind)?;
    socket.set_read_timeout(Some(SOCKET_TIMEOUT))?;
    socket.connect(target)?;
    Ok(socket.local_addr()?.ip())
}

pub fn describe(ip: Option<IpAddr>) -> String {
    match ip {
        Some(ip) => ip.to_string(),
        None => "unavailable".to_string(),
    }
}
