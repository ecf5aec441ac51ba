//! HTTP side of the server: request parsing, routing and response framing.
//!
//! Data moves one way:
//!
//! ```text
//! raw bytes ─▶ request::Request::parse ─▶ handler::respond ─▶ response::send_response
//! ```
//!
//! `files` resolves request paths below the static root.

pub mod files;
pub mod handler;
pub mod request;
pub mod response;
pub mod status;
