//! Resource references with a movable base.

use url::{Position, Url};

/// An absolute resource URL split into a consumed *base* and the remaining
/// part that enclosing routers have not matched yet.
#[derive(Debug, Clone)]
pub struct Reference {
    url: Url,
    base: String,
}

impl Reference {
    /// Parse an absolute URL. The base starts at the origin, so the first
    /// router sees the path (`/...`) as the remaining part.
    pub fn parse(input: &str) -> Result<Self, url::ParseError> {
        Url::parse(input).map(Self::from_url)
    }

    pub fn from_url(url: Url) -> Self {
        let base = url[..Position::BeforePath].to_string();
        Self { url, base }
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    /// The full reference without its fragment.
    pub fn as_str(&self) -> &str {
        &self.url[..Position::AfterQuery]
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn set_base(&mut self, base: impl Into<String>) {
        self.base = base.into();
    }

    /// The part of the reference after the base.
    ///
    /// The query string is included only when `matching_query` is set. When
    /// the base is not a prefix of the reference the whole reference is
    /// returned.
    pub fn remaining_part(&self, matching_query: bool) -> &str {
        let full = self.as_str();
        let rest = full.strip_prefix(self.base.as_str()).unwrap_or(full);
        if matching_query {
            rest
        } else {
            match rest.find('?') {
                Some(idx) => &rest[..idx],
                None => rest,
            }
        }
    }

    pub fn scheme(&self) -> &str {
        self.url.scheme()
    }

    pub fn path(&self) -> &str {
        self.url.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.url.query()
    }

    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    pub fn port(&self) -> Option<u16> {
        self.url.port_or_known_default()
    }
}
