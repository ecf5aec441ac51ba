use std::path::Path;

use tracing::{debug, error};

use crate::config::{Config, APP_NAME, MAX_RESPONSE_SIZE};
use crate::http::files::{FileError, StaticFile};
use crate::http::request::{Method, Request};
use crate::http::response::{resolve_content_type, Response, TEXT_HTML};
use crate::http::status::{Protocol, StatusCode};

/// Body served for `/`.
pub const PLACEHOLDER_BODY: &str = "<html><b>It may be working!</b></html>";

pub const NOT_FOUND_BODY: &str = concat!(
    "<title>Webby - 404</title>",
    "<html><body><h1>404 Not found</h1>",
    "<h2>Sorry, the requested resource wasn't found</h2><br>",
    "</body></html>"
);

/// Maps a parsed request onto a response.
///
/// Only `GET` is served: other known methods get `405`, unknown ones `501`
/// and a request line without a method or with a target not starting at
/// `/` gets `400`. The status line uses `HTTP/1.0` for `HTTP/1.0`
/// requests and `HTTP/1.1` otherwise.
pub fn respond(request: &Request, config: &Config) -> Response {
    let mut response = route(request, config);
    response.protocol = Protocol::for_request(&request.proto);
    response
}

fn route(request: &Request, config: &Config) -> Response {
    match request.method() {
        Some(Method::GET) => {}
        Some(_) => return error_page(StatusCode::MethodNotAllowed),
        None if request.method.is_empty() => return error_page(StatusCode::BadRequest),
        None => return error_page(StatusCode::NotImplemented),
    }

    if !request.uri.starts_with('/') {
        return error_page(StatusCode::BadRequest);
    }

    let path = request.path();
    if path == "/" {
        return Response::new(StatusCode::Ok, TEXT_HTML, PLACEHOLDER_BODY);
    }

    serve_file(&config.root, path)
}

fn serve_file(root: &Path, path: &str) -> Response {
    let file = match StaticFile::open(root, path) {
        Ok(file) => file,
        Err(FileError::NotFound) => {
            debug!("No such resource: {path}");
            return Response::new(StatusCode::NotFound, TEXT_HTML, NOT_FOUND_BODY);
        }
        Err(FileError::Forbidden) => {
            debug!("Refusing resource outside of root: {path}");
            return error_page(StatusCode::Forbidden);
        }
    };

    let content_type = resolve_content_type(path);
    debug!("Setting Content-type: {content_type}");

    match file.read_to_limit(MAX_RESPONSE_SIZE) {
        Ok(content) => Response::new(StatusCode::Ok, content_type, content),
        Err(e) => {
            error!("Error reading {path}: {e}");
            error_page(StatusCode::InternalServerError)
        }
    }
}

fn error_page(status: StatusCode) -> Response {
    let code = status.as_u16();
    let reason = status.reason_phrase();
    let body = format!(
        "<title>{APP_NAME} - {code}</title><html><body><h1>{code} {reason}</h1></body></html>"
    );
    Response::new(status, TEXT_HTML, body)
}
