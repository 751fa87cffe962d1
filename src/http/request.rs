//! Request conversion.
//!
//! # Responsibilities
//! - Rebuild the absolute resource URI from the request target and `Host`
//! - Read the entity up to the configured size limit
//! - Carry headers over unchanged
//!
//! # Design Decisions
//! - Origin-form targets get the `http` scheme; the listener has no TLS
//! - Calls without a `Host` header are addressed to `localhost`; a `Host`
//!   that is not a plain authority is rejected
//! - Failures map to the status the client should see

use axum::body::Body;
use axum::http::uri::Authority;
use axum::http::{header, StatusCode};

use crate::message::{Reference, Request};

/// Header carrying the request ID, set by the request-id layer.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Convert an inbound HTTP request into a routing call.
pub async fn from_http(
    request: axum::http::Request<Body>,
    max_body_size: usize,
) -> Result<Request, StatusCode> {
    let (parts, body) = request.into_parts();

    let uri = if parts.uri.scheme().is_some() && parts.uri.authority().is_some() {
        parts.uri.to_string()
    } else {
        let host = match parts.headers.get(header::HOST) {
            Some(value) => {
                let authority = value
                    .to_str()
                    .ok()
                    .and_then(|h| h.parse::<Authority>().ok())
                    .filter(|a| !a.as_str().contains('@'));
                match authority {
                    Some(authority) => authority.to_string(),
                    None => {
                        tracing::debug!(host = ?value, "Invalid Host header");
                        return Err(StatusCode::BAD_REQUEST);
                    }
                }
            }
            None => "localhost".to_string(),
        };
        let target = parts
            .uri
            .path_and_query()
            .map_or("/", |p| p.as_str());
        format!("http://{host}{target}")
    };

    let reference = Reference::parse(&uri).map_err(|e| {
        tracing::debug!(uri = %uri, error = %e, "Unparseable request target");
        StatusCode::BAD_REQUEST
    })?;

    let bytes = axum::body::to_bytes(body, max_body_size)
        .await
        .map_err(|e| {
            tracing::debug!(error = %e, "Request entity rejected");
            StatusCode::PAYLOAD_TOO_LARGE
        })?;

    let mut call = Request::from_reference(parts.method, reference);
    *call.headers_mut() = parts.headers;
    if !bytes.is_empty() {
        call.set_entity(bytes.to_vec());
    }
    Ok(call)
}

/// The request ID header value, if present.
pub fn request_id(request: &axum::http::Request<Body>) -> String {
    request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("unknown")
        .to_string()
}
