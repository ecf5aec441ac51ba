use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::os::fd::{AsRawFd, RawFd};

use anyhow::{bail, Context};
use epoll::{ControlOptions::EPOLL_CTL_ADD, Event, Events};
use tracing::{debug, error};

use crate::config::{Config, MAX_BUFFER};
use crate::http::handler;
use crate::http::request::Request;
use crate::http::response::send_response;

/// Where a connection is in its single request/response exchange.
///
/// ```text
/// Accepted ─▶ Registered ─▶ Processed ─▶ Closed
/// ```
///
/// The read interest is registered one-shot and never re-armed, so a
/// connection is processed at most once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Accepted,
    Registered,
    Processed,
    Closed,
}

#[derive(Debug)]
pub struct Connection {
    stream: TcpStream,
    state: ConnectionState,
}

impl Connection {
    /// Wraps a freshly accepted stream and switches it to non-blocking mode.
    pub fn new(stream: TcpStream) -> io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            state: ConnectionState::Accepted,
        })
    }

    pub fn fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    pub fn peer_addr(&self) -> io::Result<SocketAddr> {
        self.stream.peer_addr()
    }

    /// Asks `epoll` for a single, edge-triggered read notification.
    pub fn register(&mut self, epoll: RawFd) -> anyhow::Result<()> {
        if self.state != ConnectionState::Accepted {
            bail!("connection {} registered twice", self.fd());
        }

        let fd = self.fd();
        let event = Event::new(
            Events::EPOLLIN | Events::EPOLLET | Events::EPOLLONESHOT,
            fd as _,
        );
        epoll::ctl(epoll, EPOLL_CTL_ADD, fd, event).context("epoll_ctl: connfd")?;

        self.state = ConnectionState::Registered;
        Ok(())
    }

    /// Reads the request, builds the response and writes it back. Returns
    /// the number of bytes written.
    ///
    /// There is exactly one read. Whatever it returns is the request.
    pub fn process(&mut self, config: &Config) -> anyhow::Result<usize> {
        if self.state != ConnectionState::Registered {
            bail!(
                "connection {} is {:?}, expected Registered",
                self.fd(),
                self.state
            );
        }
        self.state = ConnectionState::Processed;

        let mut buf = vec![0u8; MAX_BUFFER];
        let read = self
            .stream
            .read(&mut buf)
            .context("Error reading from sock")?;
        debug!("Read bytes: {read}");

        let request = Request::parse(&buf[..read], config.debug)?;
        debug!(
            "Request info: method: {} uri: {} proto: {}",
            request.method, request.uri, request.proto
        );

        let response = handler::respond(&request, config);

        // The whole response goes out in one blocking write.
        self.stream
            .set_nonblocking(false)
            .context("Error switching socket to blocking mode")?;
        let written = send_response(&mut self.stream, &response).with_context(|| {
            format!("Error sending response: {}", response.status_line())
        })?;
        debug!("Response: {} ({written} bytes)", response.status_line());

        Ok(written)
    }

    /// Shuts the socket down and drops it, which also removes it from
    /// `epoll`. Failures are logged, never returned.
    pub fn close(mut self) {
        self.state = ConnectionState::Closed;

        match self.stream.shutdown(Shutdown::Both) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotConnected => {}
            Err(e) => {
                error!("Error closing connection: {e}");
                if let Err(e) = self.stream.flush() {
                    error!("Error in flushing data: {e}");
                }
            }
        }
    }
}
