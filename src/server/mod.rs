//! The connection reactor.
//!
//! One thread blocks in `epoll_wait` and reacts to three kinds of readiness:
//! the listening socket (accept and register a new connection), an accepted
//! connection (read, respond, close) and the shutdown pipe (stop the loop).
//! Each connection is handled to completion before the next event is looked
//! at, so a slow client holds up everything behind it.

pub mod connection;
pub mod socket;

use std::collections::HashMap;
use std::io::{self, Write};
use std::net::{SocketAddr, TcpListener};
use std::os::fd::{AsRawFd, RawFd};
use std::os::unix::net::UnixStream;

use anyhow::Context;
use epoll::{ControlOptions::EPOLL_CTL_ADD, Event, Events};
use signal_hook::consts::{SIGINT, SIGTERM};
use tracing::{debug, error, info};

use crate::config::{Config, MAX_EVENTS};
use connection::Connection;
pub use socket::setup_socket;

pub struct Server {
    config: Config,
    listener: TcpListener,
    epoll: RawFd,
    connections: HashMap<RawFd, Connection>,
    // Read end of the shutdown pipe and the write end handed out to callers.
    shutdown: Option<(UnixStream, UnixStream)>,
}

impl Server {
    /// Binds the listening socket on `config.port` and registers it with a
    /// new `epoll` instance.
    pub fn bind(config: Config) -> anyhow::Result<Self> {
        let listener = setup_socket(config.port)?;
        listener
            .set_nonblocking(true)
            .context("Could not set listen socket non-blocking")?;

        let epoll = epoll::create(true).context("Could not create epoll fd")?;
        let server = Self {
            config,
            listener,
            epoll,
            connections: HashMap::new(),
            shutdown: None,
        };

        let fd = server.listener.as_raw_fd();
        let event = Event::new(Events::EPOLLIN, fd as _);
        epoll::ctl(server.epoll, EPOLL_CTL_ADD, fd, event).context("epoll_ctl: listen sock")?;

        Ok(server)
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Returns a handle that stops [`Server::run`] from any thread or from a
    /// signal handler.
    pub fn shutdown_handle(&mut self) -> anyhow::Result<ShutdownHandle> {
        if let Some((_, tx)) = &self.shutdown {
            return Ok(ShutdownHandle { tx: tx.try_clone()? });
        }

        let (tx, rx) = UnixStream::pair().context("Could not create shutdown pipe")?;
        tx.set_nonblocking(true)?;
        rx.set_nonblocking(true)?;

        let fd = rx.as_raw_fd();
        let event = Event::new(Events::EPOLLIN, fd as _);
        epoll::ctl(self.epoll, EPOLL_CTL_ADD, fd, event).context("epoll_ctl: shutdown pipe")?;

        let handle = ShutdownHandle { tx: tx.try_clone()? };
        self.shutdown = Some((rx, tx));
        Ok(handle)
    }

    /// Runs the event loop until the shutdown handle fires.
    ///
    /// Only a failing `epoll_wait` ends the loop with an error. Problems with
    /// individual connections are logged and the loop carries on.
    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut events = [Event::new(Events::empty(), 0); MAX_EVENTS];
        let listener_fd = self.listener.as_raw_fd();
        let shutdown_fd = self.shutdown.as_ref().map(|(rx, _)| rx.as_raw_fd());

        loop {
            let num_events = match epoll::wait(self.epoll, -1, &mut events) {
                Ok(n) => n,
                // A signal landed while we were blocked; its pipe write
                // shows up on the next wait.
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e).context("epoll_wait"),
            };

            for event in &events[..num_events] {
                let fd = event.data as RawFd;

                if fd == listener_fd {
                    self.accept();
                } else if Some(fd) == shutdown_fd {
                    info!("Shutting down the server");
                    return Ok(());
                } else {
                    self.dispatch(fd);
                }
            }
        }
    }

    fn accept(&mut self) {
        let (stream, peer) = match self.listener.accept() {
            Ok(accepted) => accepted,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => return,
            Err(e) => {
                error!("Error accepting incoming connection: {e}");
                return;
            }
        };

        let mut conn = match Connection::new(stream) {
            Ok(conn) => conn,
            Err(e) => {
                error!("Error setting connection non-blocking: {e}");
                return;
            }
        };

        // On failure the stream is dropped here, which closes it.
        if let Err(e) = conn.register(self.epoll) {
            error!("Error registering connection from {peer}: {e:#}");
            return;
        }

        debug!("Registered connection {} from {peer}", conn.fd());
        self.connections.insert(conn.fd(), conn);
    }

    fn dispatch(&mut self, fd: RawFd) {
        let Some(mut conn) = self.connections.remove(&fd) else {
            debug!("Event for unknown fd {fd}");
            return;
        };

        match conn.peer_addr() {
            Ok(peer) => debug!("Accepted new incoming connection from: {}", peer.ip()),
            Err(e) => error!("Error reading client addr: {e}"),
        }

        if let Err(e) = conn.process(&self.config) {
            error!("Error handling client: {e:#}");
        }

        conn.close();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Err(e) = epoll::close(self.epoll) {
            error!("Error closing epoll fd: {e}");
        }
    }
}

/// Wakes the reactor so that [`Server::run`] returns `Ok(())`.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: UnixStream,
}

impl ShutdownHandle {
    pub fn trigger(&self) -> io::Result<()> {
        match (&self.tx).write(&[1]) {
            Ok(_) => Ok(()),
            // The pipe is full, so a wake-up is already pending.
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => Ok(()),
            Err(e) => Err(e),
        }
    }

    /// Routes SIGINT and SIGTERM into this handle.
    pub fn register_signals(&self) -> anyhow::Result<()> {
        for signal in [SIGINT, SIGTERM] {
            let tx = self.tx.try_clone()?;
            signal_hook::low_level::pipe::register(signal, tx)
                .with_context(|| format!("Could not register handler for signal {signal}"))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logger::{self, capture::Capture};
    use std::net::TcpStream;
    use std::time::Duration;

    #[test]
    fn reset_by_peer_is_logged_with_os_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::new(0, false, dir.path()).unwrap();
        let mut server = Server::bind(config).unwrap();
        let port = server.local_addr().unwrap().port();

        let client = TcpStream::connect(("127.0.0.1", port)).unwrap();
        socket2::SockRef::from(&client)
            .set_linger(Some(Duration::ZERO))
            .unwrap();

        let mut events = [Event::new(Events::empty(), 0); MAX_EVENTS];
        assert_eq!(epoll::wait(server.epoll, 1000, &mut events).unwrap(), 1);
        server.accept();
        let fd = *server.connections.keys().next().unwrap();

        // Closing with a zero linger sends RST instead of FIN.
        drop(client);
        assert_eq!(epoll::wait(server.epoll, 1000, &mut events).unwrap(), 1);
        assert_eq!(events[0].data as RawFd, fd);

        let errors = Capture::default();
        let subscriber = logger::subscriber(false, errors.clone(), Capture::default());
        tracing::subscriber::with_default(subscriber, || server.dispatch(fd));

        let logged = errors.contents();
        assert!(
            logged.contains("Error handling client: Error reading from sock: Connection reset by peer (os error 104)"),
            "{logged}"
        );
        assert!(server.connections.is_empty());
    }
}
