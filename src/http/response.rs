use std::io::{self, Write};

use crate::config::APP_NAME;
use crate::http::status::{self, Protocol, StatusCode};
use crate::time;

pub const TEXT_HTML: &str = "text/html";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Picks the `Content-Type` for a request path from its suffix.
///
/// ```
/// # use webby::http::response::resolve_content_type;
/// assert_eq!(resolve_content_type("/index.html"), "text/html");
/// assert_eq!(resolve_content_type("/notes.txt"), "text/plain; charset=utf-8");
/// ```
pub fn resolve_content_type(uri: &str) -> &'static str {
    if uri.ends_with(".html") {
        TEXT_HTML
    } else {
        TEXT_PLAIN
    }
}

/// Formats `<protocol> <code> <reason>`. Codes without a known reason
/// phrase keep the trailing space and an empty phrase.
pub fn build_status_line(protocol: Protocol, code: u16) -> String {
    format!("{} {} {}", protocol, code, status::reason_phrase(code))
}

/// A complete response. Headers are kept in the order they are written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub protocol: Protocol,
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl Response {
    /// Builds a response carrying the four mandatory headers: `Date`,
    /// `Server`, `Content-Length` and `Content-Type`.
    pub fn new(status: StatusCode, content_type: &str, body: impl Into<Vec<u8>>) -> Self {
        let body = body.into();
        let headers = vec![
            ("Date".to_string(), time::server_date()),
            ("Server".to_string(), APP_NAME.to_string()),
            ("Content-Length".to_string(), body.len().to_string()),
            ("Content-Type".to_string(), content_type.to_string()),
        ];

        Self {
            protocol: Protocol::Http11,
            status,
            headers,
            body,
        }
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }

    pub fn status_line(&self) -> String {
        build_status_line(self.protocol, self.status.as_u16())
    }

    /// Serializes the status line, the headers, a blank line and the body
    /// into one buffer.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut head = self.status_line();
        head.push_str("\r\n");
        for (key, value) in &self.headers {
            head.push_str(key);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");

        let mut buf = Vec::with_capacity(head.len() + self.body.len());
        buf.extend_from_slice(head.as_bytes());
        buf.extend_from_slice(&self.body);
        buf
    }
}

/// Writes the whole response and returns the number of bytes written.
///
/// Short writes are retried until everything is out; a writer that stops
/// accepting bytes is reported as `WriteZero`.
pub fn send_response<W: Write>(writer: &mut W, response: &Response) -> io::Result<usize> {
    let bytes = response.to_bytes();
    writer.write_all(&bytes)?;
    writer.flush()?;
    Ok(bytes.len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_line_for_unknown_code() {
        assert_eq!(build_status_line(Protocol::Http11, 299), "HTTP/1.1 299 ");
    }

    #[test]
    fn header_order_is_fixed() {
        let response = Response::new(StatusCode::Ok, TEXT_PLAIN, "hi");
        let keys: Vec<_> = response.headers.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, ["Date", "Server", "Content-Length", "Content-Type"]);
    }
}
