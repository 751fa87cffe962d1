//! Fixed responses with a templated body.

use axum::http::StatusCode;

use crate::handler::{Context, Handler};
use crate::message::{Request, Response};
use crate::routing::template::TextTemplate;

pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Answers every call with the same status and a body formatted from the
/// request attributes, so `Hello {name}` greets whatever `{name}` captured.
/// Write `{{` or `}}` for a literal brace next to a name.
#[derive(Debug)]
pub struct Responder {
    status: StatusCode,
    body: TextTemplate,
    content_type: String,
}

impl Responder {
    pub fn new(status: StatusCode, body: &str, content_type: impl Into<String>) -> Self {
        Self {
            status,
            body: TextTemplate::new(body),
            content_type: content_type.into(),
        }
    }

    pub fn text(status: StatusCode, body: &str) -> Self {
        Self::new(status, body, TEXT_PLAIN)
    }
}

impl Handler for Responder {
    fn handle(&self, _cx: &Context, request: &mut Request, response: &mut Response) {
        let body = self
            .body
            .format(|name| request.attribute(name).map(str::to_string));
        response.set_status(self.status);
        response.set_entity(body, self.content_type.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;

    #[test]
    fn test_body_uses_attributes() {
        let r = Responder::text(StatusCode::CREATED, "item {id} of {owner}");
        let mut req = Request::new(Method::POST, "http://localhost/").unwrap();
        req.attributes_mut().insert("id".into(), "42".into());
        let mut resp = Response::new();
        r.handle(&Context::default(), &mut req, &mut resp);
        assert_eq!(resp.status(), StatusCode::CREATED);
        // Unknown attributes fall back to the empty default value.
        assert_eq!(resp.entity().unwrap().body, "item 42 of ");
        assert_eq!(resp.entity().unwrap().content_type, TEXT_PLAIN);
    }

    #[test]
    fn test_json_body() {
        let r = Responder::new(StatusCode::OK, r#"{"ok":true,"id":"{id}"}"#, "application/json");
        let mut req = Request::new(Method::GET, "http://localhost/").unwrap();
        req.attributes_mut().insert("id".into(), "7".into());
        let mut resp = Response::new();
        r.handle(&Context::default(), &mut req, &mut resp);
        assert_eq!(resp.entity().unwrap().body, r#"{"ok":true,"id":"7"}"#);
        assert_eq!(resp.entity().unwrap().content_type, "application/json");
    }

    #[test]
    fn test_large_body() {
        let body = "{\"k\": \"v\"}\n".repeat(250_000);
        assert!(body.len() > 2 * 1024 * 1024);
        let r = Responder::text(StatusCode::OK, &body);
        let mut req = Request::new(Method::GET, "http://localhost/").unwrap();
        let mut resp = Response::new();
        r.handle(&Context::default(), &mut req, &mut resp);
        assert_eq!(resp.entity().unwrap().body, body);
    }
}
