//! Host matching for virtual hosts.
//!
//! # Responsibilities
//! - Match the host domain (regex, case-insensitive)
//! - Match the host port and the scheme (regex)
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Domain matching is case-insensitive
//! - Patterns must match the whole value
//! - Empty condition list = always matches (wildcard)

use regex::{Regex, RegexBuilder};

use crate::error::RoutingError;
use crate::message::Request;

/// Pattern accepting any value.
pub const ANY: &str = ".*";

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &Request) -> bool;
}

fn compile(pattern: &str, case_insensitive: bool) -> Result<Regex, RoutingError> {
    RegexBuilder::new(&format!("^(?:{pattern})$"))
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|source| RoutingError::InvalidHostPattern {
            pattern: pattern.to_string(),
            source,
        })
}

/// Matches the host domain, from the `Host` header or the URI.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    domain: Regex,
}

impl HostMatcher {
    pub fn new(pattern: &str) -> Result<Self, RoutingError> {
        Ok(Self {
            domain: compile(pattern, true)?,
        })
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request) -> bool {
        req.host_domain()
            .is_some_and(|domain| self.domain.is_match(&domain))
    }
}

/// Matches the host port. Calls without a known port see `""`.
#[derive(Debug, Clone)]
pub struct PortMatcher {
    port: Regex,
}

impl PortMatcher {
    pub fn new(pattern: &str) -> Result<Self, RoutingError> {
        Ok(Self {
            port: compile(pattern, false)?,
        })
    }
}

impl Matcher for PortMatcher {
    fn matches(&self, req: &Request) -> bool {
        let port = req.host_port().map(|p| p.to_string()).unwrap_or_default();
        self.port.is_match(&port)
    }
}

/// Matches the URI scheme.
#[derive(Debug, Clone)]
pub struct SchemeMatcher {
    scheme: Regex,
}

impl SchemeMatcher {
    pub fn new(pattern: &str) -> Result<Self, RoutingError> {
        Ok(Self {
            scheme: compile(pattern, true)?,
        })
    }
}

impl Matcher for SchemeMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.scheme.is_match(req.scheme())
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug, Default)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }

    /// Matchers for a virtual host; `.*` patterns are left out.
    pub fn for_host(domain: &str, port: &str, scheme: &str) -> Result<Self, RoutingError> {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        if domain != ANY {
            matchers.push(Box::new(HostMatcher::new(domain)?));
        }
        if port != ANY {
            matchers.push(Box::new(PortMatcher::new(port)?));
        }
        if scheme != ANY {
            matchers.push(Box::new(SchemeMatcher::new(scheme)?));
        }
        Ok(Self { matchers })
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request) -> bool {
        self.matchers.iter().all(|m| m.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, HeaderValue, Method};

    fn req(uri: &str, host: Option<&'static str>) -> Request {
        let mut r = Request::new(Method::GET, uri).unwrap();
        if let Some(h) = host {
            r.headers_mut().insert(header::HOST, HeaderValue::from_static(h));
        }
        r
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new(r"(www\.)?example\.com").unwrap();
        assert!(matcher.matches(&req("http://example.com/", None)));
        assert!(matcher.matches(&req("http://127.0.0.1/", Some("WWW.EXAMPLE.COM"))));
        assert!(!matcher.matches(&req("http://other.com/", None)));
        assert!(!matcher.matches(&req("http://example.com.evil/", None)));
    }

    #[test]
    fn test_port_and_scheme() {
        let port = PortMatcher::new("80|8080").unwrap();
        assert!(port.matches(&req("http://h/", None)));
        assert!(port.matches(&req("http://h:8080/", None)));
        assert!(!port.matches(&req("https://h/", None)));

        let scheme = SchemeMatcher::new("https").unwrap();
        assert!(scheme.matches(&req("https://h/", None)));
        assert!(!scheme.matches(&req("http://h/", None)));
    }

    #[test]
    fn test_and_matcher() {
        let all = AndMatcher::for_host("api\\.example\\.com", ANY, "https").unwrap();
        assert!(all.matches(&req("https://api.example.com/", None)));
        assert!(!all.matches(&req("http://api.example.com/", None)));

        let any = AndMatcher::for_host(ANY, ANY, ANY).unwrap();
        assert!(any.matches(&req("ftp://anything/", None)));
    }

    #[test]
    fn test_invalid_pattern() {
        assert!(matches!(
            HostMatcher::new("("),
            Err(RoutingError::InvalidHostPattern { .. })
        ));
    }
}
