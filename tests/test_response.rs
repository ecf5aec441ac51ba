use std::io::{self, Write};

use webby::http::response::{
    build_status_line, resolve_content_type, send_response, Response, TEXT_HTML, TEXT_PLAIN,
};
use webby::http::status::{Protocol, StatusCode};

#[test]
fn test_content_type_html_suffix() {
    assert_eq!(resolve_content_type("/index.html"), "text/html");
    assert_eq!(resolve_content_type("/nested/page.html"), "text/html");
}

#[test]
fn test_content_type_defaults_to_plain_text() {
    for uri in ["/notes.txt", "/style.css", "/image.png", "/README", "/page.html.bak", "/"] {
        assert_eq!(resolve_content_type(uri), "text/plain; charset=utf-8", "{uri}");
    }
}

#[test]
fn test_status_lines() {
    assert_eq!(build_status_line(Protocol::Http11, 200), "HTTP/1.1 200 OK");
    assert_eq!(build_status_line(Protocol::Http11, 404), "HTTP/1.1 404 Not Found");
    assert_eq!(build_status_line(Protocol::Http10, 405), "HTTP/1.0 405 Method Not Allowed");
    assert_eq!(build_status_line(Protocol::Http11, 418), "HTTP/1.1 418 I'm a Teapot");
    assert_eq!(build_status_line(Protocol::Http11, 299), "HTTP/1.1 299 ");
}

#[test]
fn test_status_code_numbers() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::Forbidden.as_u16(), 403);
    assert_eq!(StatusCode::NotFound.as_u16(), 404);
    assert_eq!(StatusCode::MethodNotAllowed.as_u16(), 405);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
    assert_eq!(StatusCode::NotImplemented.as_u16(), 501);
}

#[test]
fn test_response_has_mandatory_headers() {
    let response = Response::new(StatusCode::Ok, TEXT_PLAIN, "hello");

    assert!(response.header("Date").unwrap().ends_with(" GMT"));
    assert_eq!(response.header("Server"), Some("Webby"));
    assert_eq!(response.header("Content-Length"), Some("5"));
    assert_eq!(response.header("Content-Type"), Some(TEXT_PLAIN));
    assert_eq!(response.protocol, Protocol::Http11);
}

#[test]
fn test_serialized_framing() {
    let response = Response::new(StatusCode::NotFound, TEXT_HTML, "<h1>gone</h1>");
    let bytes = response.to_bytes();
    let date = response.header("Date").unwrap();

    let expected = format!(
        "HTTP/1.1 404 Not Found\r\n\
         Date: {date}\r\n\
         Server: Webby\r\n\
         Content-Length: 13\r\n\
         Content-Type: text/html\r\n\
         \r\n\
         <h1>gone</h1>"
    );
    assert_eq!(bytes, expected.as_bytes());
}

#[test]
fn test_serialized_binary_body_follows_blank_line() {
    let body = vec![0u8, 159, 146, 150, 255];
    let response = Response::new(StatusCode::Ok, TEXT_PLAIN, body.clone());
    let bytes = response.to_bytes();

    let split = bytes.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
    assert_eq!(&bytes[split + 4..], body.as_slice());
}

#[test]
fn test_send_response_returns_bytes_written() {
    let response = Response::new(StatusCode::Ok, TEXT_HTML, "<p>hi</p>");
    let mut out = Vec::new();

    let written = send_response(&mut out, &response).unwrap();

    assert_eq!(written, out.len());
    assert_eq!(out, response.to_bytes());
}

/// Accepts at most `chunk` bytes per call.
struct Trickle {
    out: Vec<u8>,
    chunk: usize,
}

impl Write for Trickle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = buf.len().min(self.chunk);
        self.out.extend_from_slice(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_send_response_retries_short_writes() {
    let response = Response::new(StatusCode::Ok, TEXT_PLAIN, vec![b'z'; 1000]);
    let mut writer = Trickle {
        out: Vec::new(),
        chunk: 7,
    };

    let written = send_response(&mut writer, &response).unwrap();

    assert_eq!(written, writer.out.len());
    assert_eq!(writer.out, response.to_bytes());
}

struct Closed;

impl Write for Closed {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Ok(0)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn test_send_response_reports_stalled_writer() {
    let response = Response::new(StatusCode::Ok, TEXT_PLAIN, "lost");
    let err = send_response(&mut Closed, &response).unwrap_err();

    assert_eq!(err.kind(), io::ErrorKind::WriteZero);
}
