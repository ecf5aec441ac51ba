use std::net::{Ipv4Addr, SocketAddr, TcpListener};
use std::os::fd::AsRawFd;

use anyhow::Context;
use socket2::{Domain, Protocol, Socket, Type};
use tracing::debug;

/// Creates a TCP socket bound to `0.0.0.0:port` and puts it in listening
/// mode with the largest backlog the platform allows.
///
/// Address and port reuse are enabled so a restarted server does not trip
/// over connections still in `TIME_WAIT`.
pub fn setup_socket(port: u16) -> anyhow::Result<TcpListener> {
    let socket = Socket::new(Domain::IPV4, Type::STREAM, Some(Protocol::TCP))
        .context("Error creating socket")?;
    debug!("Successfully created socket: sockfd: {}", socket.as_raw_fd());

    socket
        .set_reuse_address(true)
        .context("Could not set socket options")?;
    socket
        .set_reuse_port(true)
        .context("Could not set socket options")?;

    let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket
        .bind(&addr.into())
        .with_context(|| format!("Error binding socket to port {port}"))?;
    debug!("Successfully bound socket to addr: {}", addr.ip());

    socket
        .listen(libc::SOMAXCONN)
        .context("Error setting listen mode")?;

    Ok(socket.into())
}
