//! Transport adapters
//!
//! Each adapter turns its wire format into a `CallEnvelope` and writes the
//! dispatcher's outcome back; neither knows about controllers or rights.

pub mod http;
pub mod websocket;

use axum::http::{header::COOKIE, HeaderMap};

/// Raw `Cookie` header of a request, if it is valid UTF-8
pub fn cookie_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(COOKIE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}
