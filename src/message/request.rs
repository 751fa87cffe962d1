//! Inbound call as seen by handlers.

use std::collections::HashMap;

use axum::http::{header, HeaderMap, Method};

use crate::message::reference::Reference;

/// An inbound call.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    resource_ref: Reference,
    root_ref: Option<String>,
    headers: HeaderMap,
    entity: Option<Vec<u8>>,
    attributes: HashMap<String, String>,
}

impl Request {
    /// Create a request for an absolute URI.
    pub fn new(method: Method, uri: &str) -> Result<Self, url::ParseError> {
        Ok(Self::from_reference(method, Reference::parse(uri)?))
    }

    pub fn from_reference(method: Method, resource_ref: Reference) -> Self {
        Self {
            method,
            resource_ref,
            root_ref: None,
            headers: HeaderMap::new(),
            entity: None,
            attributes: HashMap::new(),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn resource_ref(&self) -> &Reference {
        &self.resource_ref
    }

    pub fn resource_ref_mut(&mut self) -> &mut Reference {
        &mut self.resource_ref
    }

    /// Root reference set by the virtual host that accepted the call.
    pub fn root_ref(&self) -> Option<&str> {
        self.root_ref.as_deref()
    }

    pub fn set_root_ref(&mut self, root: impl Into<String>) {
        self.root_ref = Some(root.into());
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn entity(&self) -> Option<&[u8]> {
        self.entity.as_deref()
    }

    pub fn set_entity(&mut self, entity: Vec<u8>) {
        self.entity = Some(entity);
    }

    pub fn attributes(&self) -> &HashMap<String, String> {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut HashMap<String, String> {
        &mut self.attributes
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Host domain, from the `Host` header when present, else from the URI.
    pub fn host_domain(&self) -> Option<String> {
        match self.host_header() {
            Some(host) => Some(split_host(host).0.to_string()),
            None => self.resource_ref.host().map(str::to_string),
        }
    }

    /// Host port, from the `Host` header when present, else the URI's
    /// explicit or scheme-default port.
    pub fn host_port(&self) -> Option<u16> {
        match self.host_header().and_then(|h| split_host(h).1) {
            Some(port) => port.parse().ok(),
            None => self.resource_ref.port(),
        }
    }

    pub fn scheme(&self) -> &str {
        self.resource_ref.scheme()
    }

    /// Values of a query parameter, in order of appearance.
    pub fn query_values(&self, name: &str) -> Vec<String> {
        self.resource_ref
            .url()
            .query_pairs()
            .filter(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
            .collect()
    }

    /// Values of a cookie, in order of appearance across `Cookie` headers.
    pub fn cookie_values(&self, name: &str) -> Vec<String> {
        self.headers
            .get_all(header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .filter(|(k, _)| *k == name)
            .map(|(_, v)| v.trim_matches('"').to_string())
            .collect()
    }

    /// Values of a field in a form-encoded entity.
    pub fn entity_form_values(&self, name: &str) -> Vec<String> {
        match &self.entity {
            Some(body) => url::form_urlencoded::parse(body)
                .filter(|(k, _)| k == name)
                .map(|(_, v)| v.into_owned())
                .collect(),
            None => Vec::new(),
        }
    }

    fn host_header(&self) -> Option<&str> {
        self.headers
            .get(header::HOST)
            .and_then(|h| h.to_str().ok())
    }
}

/// Split `domain[:port]`, leaving bracketed IPv6 literals intact.
fn split_host(host: &str) -> (&str, Option<&str>) {
    let colon = if host.starts_with('[') {
        host.find("]:").map(|i| i + 1)
    } else {
        host.rfind(':')
    };
    match colon {
        Some(idx) => (&host[..idx], Some(&host[idx + 1..])),
        None => (host, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_host_from_header_wins() {
        let mut req = Request::new(Method::GET, "http://127.0.0.1:3000/").unwrap();
        assert_eq!(req.host_domain().as_deref(), Some("127.0.0.1"));
        assert_eq!(req.host_port(), Some(3000));

        req.headers_mut()
            .insert(header::HOST, HeaderValue::from_static("Example.com:8443"));
        assert_eq!(req.host_domain().as_deref(), Some("Example.com"));
        assert_eq!(req.host_port(), Some(8443));
    }

    #[test]
    fn test_default_port_from_scheme() {
        let req = Request::new(Method::GET, "https://example.com/x").unwrap();
        assert_eq!(req.host_port(), Some(443));
        assert_eq!(req.scheme(), "https");
    }

    #[test]
    fn test_query_cookie_and_form_values() {
        let mut req = Request::new(Method::POST, "http://h/p?tag=a&tag=b&q=x%20y").unwrap();
        assert_eq!(req.query_values("tag"), vec!["a", "b"]);
        assert_eq!(req.query_values("q"), vec!["x y"]);

        req.headers_mut()
            .insert(header::COOKIE, HeaderValue::from_static("sid=abc; theme=\"dark\""));
        assert_eq!(req.cookie_values("theme"), vec!["dark"]);
        assert!(req.cookie_values("missing").is_empty());

        req.set_entity(b"name=Ada+L&name=Grace".to_vec());
        assert_eq!(req.entity_form_values("name"), vec!["Ada L", "Grace"]);
    }

    #[test]
    fn test_ipv6_host_header() {
        assert_eq!(split_host("[::1]:8080"), ("[::1]", Some("8080")));
        assert_eq!(split_host("[::1]"), ("[::1]", None));
    }
}
