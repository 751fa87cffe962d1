//! Routes: a match predicate bound to a target handler.
//!
//! # Responsibilities
//! - Score a call in `[0, 1]` without side effects
//! - For the selected route only, consume the matched prefix of the
//!   remaining part and capture template variables
//! - Extract and validate extra attributes before delegating
//!
//! # Design Decisions
//! - The route holds a weak reference to its router's settings; a route
//!   whose router is gone scores 0
//! - A successful match always scores at least the router's required score,
//!   longer matches scoring strictly higher

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use axum::http::StatusCode;
use regex::Regex;

use crate::error::RoutingError;
use crate::handler::{Context, Handler};
use crate::message::{Request, Response};
use crate::routing::router::RouterSettings;
use crate::routing::template::Template;

/// What a filter step asks the caller to do next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    /// Invoke the target, then `after_handle`.
    Continue,
    /// Skip the target but still run `after_handle`.
    Skip,
    /// Stop immediately.
    Stop,
}

/// A scored binding between a match predicate and a target.
pub trait Route: Send + Sync + fmt::Debug {
    /// Affinity of this route for the call, in `[0, 1]`. Must not modify
    /// the call.
    fn score(&self, request: &Request, response: &Response) -> f32;

    fn target(&self) -> &Arc<dyn Handler>;

    /// Prepare the call for the target. Only invoked on the selected route.
    fn before_handle(&self, _cx: &Context, _request: &mut Request, _response: &mut Response) -> Flow {
        Flow::Continue
    }

    fn after_handle(&self, _cx: &Context, _request: &mut Request, _response: &mut Response) {}

    /// Run `before_handle`, the target and `after_handle` as a filter.
    fn handle(&self, cx: &Context, request: &mut Request, response: &mut Response) {
        match self.before_handle(cx, request, response) {
            Flow::Continue => {
                self.target().handle(cx, request, response);
                self.after_handle(cx, request, response);
            }
            Flow::Skip => self.after_handle(cx, request, response),
            Flow::Stop => {}
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ExtractSource {
    Query,
    Cookie,
    Entity,
}

#[derive(Debug, Clone)]
struct Extract {
    attribute: String,
    parameter: String,
    first: bool,
    source: ExtractSource,
}

#[derive(Debug, Clone)]
struct Validation {
    attribute: String,
    required: bool,
    format: Option<Regex>,
}

/// A route scoring calls by matching a URI template against the remaining
/// part of the resource reference.
pub struct TemplateRoute {
    router: Weak<RouterSettings>,
    template: Template,
    target: Arc<dyn Handler>,
    matching_query: bool,
    sets_root_ref: bool,
    extracts: Vec<Extract>,
    validations: Vec<Validation>,
}

impl fmt::Debug for TemplateRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TemplateRoute")
            .field("pattern", &self.template.pattern())
            .field("mode", &self.template.matching_mode())
            .field("target", &self.target)
            .finish()
    }
}

impl TemplateRoute {
    pub fn new(
        router: &Arc<RouterSettings>,
        template: Template,
        target: Arc<dyn Handler>,
    ) -> Self {
        Self {
            router: Arc::downgrade(router),
            template,
            target,
            matching_query: router.matching_query(),
            sets_root_ref: false,
            extracts: Vec::new(),
            validations: Vec::new(),
        }
    }

    pub fn template(&self) -> &Template {
        &self.template
    }

    pub fn matching_query(&self) -> bool {
        self.matching_query
    }

    /// Include the query string in the matched text.
    pub fn with_matching_query(mut self, matching_query: bool) -> Self {
        self.matching_query = matching_query;
        self
    }

    /// Also record the new base reference as the request's root reference.
    pub(crate) fn setting_root_ref(mut self) -> Self {
        self.sets_root_ref = true;
        self
    }

    /// Copy a query parameter into an attribute. With `first` unset, all
    /// values are joined with `,`.
    pub fn extract_query(mut self, attribute: &str, parameter: &str, first: bool) -> Self {
        self.extracts.push(Extract {
            attribute: attribute.to_string(),
            parameter: parameter.to_string(),
            first,
            source: ExtractSource::Query,
        });
        self
    }

    pub fn extract_cookie(mut self, attribute: &str, cookie: &str, first: bool) -> Self {
        self.extracts.push(Extract {
            attribute: attribute.to_string(),
            parameter: cookie.to_string(),
            first,
            source: ExtractSource::Cookie,
        });
        self
    }

    /// Copy a field of a form-encoded entity into an attribute.
    pub fn extract_entity(mut self, attribute: &str, parameter: &str, first: bool) -> Self {
        self.extracts.push(Extract {
            attribute: attribute.to_string(),
            parameter: parameter.to_string(),
            first,
            source: ExtractSource::Entity,
        });
        self
    }

    /// Require an attribute and/or constrain its value with a regex that
    /// must match the whole value.
    pub fn validate(
        mut self,
        attribute: &str,
        required: bool,
        format: Option<&str>,
    ) -> Result<Self, RoutingError> {
        let format = match format {
            Some(f) => Some(Regex::new(&format!("^(?:{f})$")).map_err(|source| {
                RoutingError::InvalidFormat {
                    format: f.to_string(),
                    source,
                }
            })?),
            None => None,
        };
        self.validations.push(Validation {
            attribute: attribute.to_string(),
            required,
            format,
        });
        Ok(self)
    }

    fn extract_attributes(&self, request: &mut Request) {
        for extract in &self.extracts {
            let values = match extract.source {
                ExtractSource::Query => request.query_values(&extract.parameter),
                ExtractSource::Cookie => request.cookie_values(&extract.parameter),
                ExtractSource::Entity => request.entity_form_values(&extract.parameter),
            };
            if values.is_empty() {
                continue;
            }
            let value = if extract.first {
                values.into_iter().next().unwrap_or_default()
            } else {
                values.join(",")
            };
            request
                .attributes_mut()
                .insert(extract.attribute.clone(), value);
        }
    }

    /// Returns false after setting a 400 status on the first failure.
    fn validate_attributes(&self, request: &Request, response: &mut Response) -> bool {
        for validation in &self.validations {
            match request.attribute(&validation.attribute) {
                None if validation.required => {
                    response.set_status_with(
                        StatusCode::BAD_REQUEST,
                        format!(
                            "Unable to find the \"{}\" attribute in the request. Please check your request.",
                            validation.attribute
                        ),
                    );
                    return false;
                }
                None => {}
                Some(value) => {
                    if let Some(format) = &validation.format {
                        if !format.is_match(value) {
                            response.set_status_with(
                                StatusCode::BAD_REQUEST,
                                format!(
                                    "Unable to validate the value of the \"{}\" attribute. The expected format is: {}. Please check your request.",
                                    validation.attribute,
                                    format.as_str()
                                ),
                            );
                            return false;
                        }
                    }
                }
            }
        }
        true
    }
}

impl Route for TemplateRoute {
    fn score(&self, request: &Request, _response: &Response) -> f32 {
        let Some(router) = self.router.upgrade() else {
            return 0.0;
        };

        let remaining = request.resource_ref().remaining_part(self.matching_query);
        let score = match self.template.match_len(remaining) {
            Some(matched) if !remaining.is_empty() => {
                let required = router.required_score();
                required + (1.0 - required) * (matched as f32 / remaining.len() as f32)
            }
            Some(_) => 1.0,
            None => 0.0,
        };

        tracing::trace!(pattern = %self.template.pattern(), score, "Call score for URI pattern");
        score
    }

    fn target(&self) -> &Arc<dyn Handler> {
        &self.target
    }

    fn before_handle(&self, cx: &Context, request: &mut Request, response: &mut Response) -> Flow {
        let remaining = request
            .resource_ref()
            .remaining_part(self.matching_query)
            .to_string();

        let mut captured = HashMap::new();
        let Some(matched) = self.template.parse(&remaining, &mut captured) else {
            // The route scored but no longer matches: the call is answered here.
            tracing::debug!(
                component = %cx.name(),
                pattern = %self.template.pattern(),
                remaining = %remaining,
                "Selected route no longer matches"
            );
            response.set_status(StatusCode::NOT_FOUND);
            return Flow::Stop;
        };
        request.attributes_mut().extend(captured);

        let base = format!("{}{}", request.resource_ref().base(), &remaining[..matched]);
        if self.sets_root_ref {
            request.set_root_ref(base.clone());
        }
        request.resource_ref_mut().set_base(base);

        tracing::debug!(
            component = %cx.name(),
            base = %request.resource_ref().base(),
            remaining = %request.resource_ref().remaining_part(self.matching_query),
            "Delegating the call to the target"
        );

        self.extract_attributes(request);
        if self.validate_attributes(request, response) {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }
}
