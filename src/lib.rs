//! Webby - a small single-threaded web server.
//!
//! An `epoll` reactor accepts TCP connections, reads one request from each,
//! answers it with a static file or a placeholder page and closes the
//! connection.

pub mod config;
pub mod http;
pub mod logger;
pub mod server;
pub mod time;
