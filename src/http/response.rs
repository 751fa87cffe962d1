//! Response conversion.
//!
//! # Responsibilities
//! - Map the routing response onto an HTTP response
//! - Emit `Location` for redirections
//! - Give error statuses without an entity a plain-text body
//!
//! # Design Decisions
//! - Header values that cannot be encoded are dropped, not fatal

use axum::body::Body;
use axum::http::{header, HeaderValue};
use axum::response::IntoResponse;

use crate::handler::responder::TEXT_PLAIN;
use crate::message::Response;

/// Convert a routing response into an HTTP response.
pub fn into_http(response: Response) -> axum::response::Response {
    let status = response.status();

    let (body, content_type) = match response.entity() {
        Some(entity) => (entity.body.clone(), Some(entity.content_type.clone())),
        None if status.is_client_error() || status.is_server_error() => {
            let text = response
                .description()
                .map(str::to_string)
                .or_else(|| status.canonical_reason().map(str::to_string))
                .unwrap_or_default();
            (text, Some(TEXT_PLAIN.to_string()))
        }
        None => (String::new(), None),
    };

    let mut http = (status, Body::from(body)).into_response();
    let headers = http.headers_mut();
    for (name, value) in response.headers() {
        headers.append(name.clone(), value.clone());
    }
    if let Some(content_type) = content_type.and_then(|c| HeaderValue::from_str(&c).ok()) {
        headers.insert(header::CONTENT_TYPE, content_type);
    }
    if let Some(location) = response.location() {
        match HeaderValue::from_str(location) {
            Ok(value) => {
                headers.insert(header::LOCATION, value);
            }
            Err(_) => tracing::warn!(location = %location, "Dropping unencodable Location header"),
        }
    }
    http
}
