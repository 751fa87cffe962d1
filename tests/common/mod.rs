//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;

use axum::http::Method;
use scored_router::handler::Context;
use scored_router::{Handler, Request, Response, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// Dispatch a GET for `uri` through `router`.
pub fn call(router: &Router, uri: &str) -> Response {
    let mut request = Request::new(Method::GET, uri).unwrap();
    let mut response = Response::new();
    router.handle(&Context::new("test"), &mut request, &mut response);
    response
}

/// Body text of a response, empty without an entity.
pub fn body(response: &Response) -> String {
    response
        .entity()
        .map(|e| e.body.clone())
        .unwrap_or_default()
}

/// Minimal HTTP/1.1 GET over a fresh connection. Returns status and body.
pub async fn http_get(addr: SocketAddr, path: &str, host: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let request = format!("GET {path} HTTP/1.1\r\nHost: {host}\r\nConnection: close\r\n\r\n");
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.unwrap();
    let text = String::from_utf8_lossy(&raw).into_owned();

    let status = text
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .unwrap_or(0);
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

/// Write `contents` to a fresh file under the system temp directory.
pub fn temp_config(contents: &str) -> PathBuf {
    let path = std::env::temp_dir().join(format!("scored-router-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, contents).unwrap();
    path
}
