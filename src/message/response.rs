//! Outbound answer filled by handlers.

use axum::http::{HeaderMap, StatusCode};

/// A textual response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub content_type: String,
    pub body: String,
}

/// The answer to a call. Starts as `200 OK` with no entity.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    description: Option<String>,
    headers: HeaderMap,
    location: Option<String>,
    entity: Option<Entity>,
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn new() -> Self {
        Self {
            status: StatusCode::OK,
            description: None,
            headers: HeaderMap::new(),
            location: None,
            entity: None,
        }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
        self.description = None;
    }

    /// Set the status along with a human readable explanation.
    pub fn set_status_with(&mut self, status: StatusCode, description: impl Into<String>) {
        self.status = status;
        self.description = Some(description.into());
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    pub fn set_location(&mut self, location: impl Into<String>) {
        self.location = Some(location.into());
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_ref()
    }

    pub fn set_entity(&mut self, body: impl Into<String>, content_type: impl Into<String>) {
        self.entity = Some(Entity {
            content_type: content_type.into(),
            body: body.into(),
        });
    }
}
