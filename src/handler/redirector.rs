//! Client redirections.
//!
//! The target is a URI template. Variables resolve first against request
//! attributes, then against these reference variables:
//!
//! | name  | value                              |
//! |-------|------------------------------------|
//! | `rr`  | resource reference (no fragment)   |
//! | `rb`  | base reference                     |
//! | `rrp` | remaining part, query included     |
//! | `rp`  | resource path                      |
//! | `rq`  | query string                       |
//! | `rh`  | host domain                        |
//! | `rs`  | scheme                             |
//! | `m`   | method                             |

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::TemplateError;
use crate::handler::{Context, Handler};
use crate::message::{Request, Response};
use crate::routing::template::{MatchingMode, Template};

/// Which redirection status to answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RedirectKind {
    /// 301
    Permanent,
    /// 302
    #[default]
    Found,
    /// 303
    SeeOther,
    /// 307
    Temporary,
}

impl RedirectKind {
    pub fn status(self) -> StatusCode {
        match self {
            RedirectKind::Permanent => StatusCode::MOVED_PERMANENTLY,
            RedirectKind::Found => StatusCode::FOUND,
            RedirectKind::SeeOther => StatusCode::SEE_OTHER,
            RedirectKind::Temporary => StatusCode::TEMPORARY_REDIRECT,
        }
    }
}

#[derive(Debug)]
pub struct Redirector {
    target: Template,
    kind: RedirectKind,
}

impl Redirector {
    pub fn new(target: &str, kind: RedirectKind) -> Result<Self, TemplateError> {
        Ok(Self {
            target: Template::new(target, MatchingMode::Equals)?,
            kind,
        })
    }

    /// The location this redirector sends `request` to.
    pub fn target_for(&self, request: &Request) -> String {
        self.target.format(|name| {
            if let Some(value) = request.attribute(name) {
                return Some(value.to_string());
            }
            let reference = request.resource_ref();
            match name {
                "rr" => Some(reference.as_str().to_string()),
                "rb" => Some(reference.base().to_string()),
                "rrp" => Some(reference.remaining_part(true).to_string()),
                "rp" => Some(reference.path().to_string()),
                "rq" => reference.query().map(str::to_string),
                "rh" => request.host_domain(),
                "rs" => Some(request.scheme().to_string()),
                "m" => Some(request.method().to_string()),
                _ => None,
            }
        })
    }
}

impl Handler for Redirector {
    fn handle(&self, _cx: &Context, request: &mut Request, response: &mut Response) {
        let location = self.target_for(request);
        tracing::debug!(location = %location, status = %self.kind.status(), "Redirecting client");
        response.set_status(self.kind.status());
        response.set_location(location);
    }
}
