use std::collections::HashMap;
use std::fmt;

use tracing::debug;

/// Capacity of the method token, in bytes.
pub const MAX_METHOD: usize = 8;
/// Capacity of the request target, in bytes.
pub const MAX_URI: usize = 4096;
/// Capacity of the protocol token, in bytes.
pub const MAX_PROTO: usize = 16;

/// HTTP request methods.
///
/// Only `GET` is served. The others are recognised so they can be answered
/// with `405 Method Not Allowed` instead of `501 Not Implemented`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    GET,
    HEAD,
    POST,
    PUT,
    DELETE,
    CONNECT,
    OPTIONS,
    TRACE,
    PATCH,
}

impl Method {
    /// Parses a method token. Matching is case-sensitive.
    ///
    /// ```
    /// # use webby::http::request::Method;
    /// assert_eq!(Method::from_str("GET"), Some(Method::GET));
    /// assert_eq!(Method::from_str("get"), None);
    /// ```
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "GET" => Some(Method::GET),
            "HEAD" => Some(Method::HEAD),
            "POST" => Some(Method::POST),
            "PUT" => Some(Method::PUT),
            "DELETE" => Some(Method::DELETE),
            "CONNECT" => Some(Method::CONNECT),
            "OPTIONS" => Some(Method::OPTIONS),
            "TRACE" => Some(Method::TRACE),
            "PATCH" => Some(Method::PATCH),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub enum RequestError {
    /// Nothing was read from the connection.
    Empty,
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::Empty => f.write_str("empty request"),
        }
    }
}

impl std::error::Error for RequestError {}

/// The request line of a client request, plus its headers when they were
/// scanned.
///
/// `method`, `uri` and `proto` are always set, possibly to empty strings when
/// the request line is malformed, and never longer than their capacities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Request {
    pub method: String,
    pub uri: String,
    pub proto: String,
    /// `Some` only when headers were scanned.
    pub headers: Option<HashMap<String, String>>,
}

impl Request {
    /// Parses the bytes of the first read on a connection.
    ///
    /// Only the first line is tokenized. Anything past the third token is
    /// ignored and oversized tokens are cut to their capacity. When
    /// `scan_headers` is set the remaining `key: value` lines are collected
    /// and logged.
    pub fn parse(buf: &[u8], scan_headers: bool) -> Result<Self, RequestError> {
        if buf.is_empty() {
            return Err(RequestError::Empty);
        }

        let line_end = buf.iter().position(|&b| b == b'\n').unwrap_or(buf.len());
        let line = String::from_utf8_lossy(&buf[..line_end]);

        let mut tokens = line.split_whitespace();
        let method = bounded(tokens.next().unwrap_or_default(), MAX_METHOD);
        let uri = bounded(tokens.next().unwrap_or_default(), MAX_URI);
        let proto = bounded(tokens.next().unwrap_or_default(), MAX_PROTO);

        let headers = if scan_headers {
            let rest = buf.get(line_end + 1..).unwrap_or_default();
            let headers = read_headers(rest);
            for (key, value) in &headers {
                debug!("Header: {key} => {value}");
            }
            Some(headers)
        } else {
            None
        };

        Ok(Self {
            method,
            uri,
            proto,
            headers,
        })
    }

    pub fn method(&self) -> Option<Method> {
        Method::from_str(&self.method)
    }

    /// The request target without its query string or fragment.
    pub fn path(&self) -> &str {
        let end = self.uri.find(|c: char| c == '?' || c == '#').unwrap_or(self.uri.len());
        &self.uri[..end]
    }

    pub fn header(&self, key: &str) -> Option<&str> {
        self.headers
            .as_ref()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.as_str())
    }
}

/// Collects CRLF-terminated `key: value` lines until the first empty line.
///
/// Lines without a colon are skipped, as is a trailing line that was cut
/// off before its CRLF.
pub fn read_headers(buf: &[u8]) -> HashMap<String, String> {
    let text = String::from_utf8_lossy(buf);
    let mut rest: &str = &text;
    let mut headers = HashMap::new();

    while let Some(end) = rest.find("\r\n") {
        let line = &rest[..end];
        rest = &rest[end + 2..];

        if line.is_empty() {
            break;
        }

        if let Some((key, value)) = line.split_once(':') {
            headers.insert(key.trim().to_string(), value.trim().to_string());
        }
    }

    headers
}

fn bounded(token: &str, capacity: usize) -> String {
    if token.len() <= capacity {
        return token.to_string();
    }

    let mut end = capacity;
    while !token.is_char_boundary(end) {
        end -= 1;
    }
    token[..end].to_string()
}
