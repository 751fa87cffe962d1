//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (required score, attempts, status codes)
//! - Compile every template and regex once so bad patterns are caught
//!   before the config is accepted
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: AppConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::StatusCode;
use regex::Regex;
use thiserror::Error;

use crate::config::schema::{AppConfig, RouteConfig, TargetConfig};
use crate::routing::matcher::AndMatcher;
use crate::routing::router::RoutingMode;
use crate::routing::template::{MatchingMode, Template};

/// A semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address {0:?} is not a socket address")]
    InvalidBindAddress(String),

    #[error("router.required_score {0} is outside [0, 1]")]
    RequiredScoreOutOfRange(f32),

    #[error("router.max_attempts must be at least 1")]
    NoAttempts,

    #[error("router.routing_mode \"custom\" needs a selector installed in code")]
    CustomModeInConfig,

    #[error("{location}: invalid pattern {pattern:?}: {reason}")]
    InvalidPattern {
        location: String,
        pattern: String,
        reason: String,
    },

    #[error("{location}: exactly one of `respond` or `redirect` must be set")]
    AmbiguousTarget { location: String },

    #[error("{location}: invalid status code {status}")]
    InvalidStatus { location: String, status: u16 },

    #[error("{location}: invalid host pattern: {reason}")]
    InvalidHost { location: String, reason: String },

    #[error("{location}: invalid validation format {format:?}: {reason}")]
    InvalidFormat {
        location: String,
        format: String,
        reason: String,
    },

    #[error("hosts: duplicate host name {0:?}")]
    DuplicateHost(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let score = config.router.required_score;
    if !(0.0..=1.0).contains(&score) {
        errors.push(ValidationError::RequiredScoreOutOfRange(score));
    }
    if config.router.max_attempts == 0 {
        errors.push(ValidationError::NoAttempts);
    }
    if config.router.routing_mode == RoutingMode::Custom {
        errors.push(ValidationError::CustomModeInConfig);
    }

    validate_routes("routes", &config.routes, &mut errors);
    if let Some(target) = &config.default_route {
        validate_target("default_route", target, &mut errors);
    }

    let mut names: Vec<&str> = Vec::new();
    for (i, host) in config.hosts.iter().enumerate() {
        let location = format!("hosts[{i}]");
        if names.contains(&host.name.as_str()) {
            errors.push(ValidationError::DuplicateHost(host.name.clone()));
        }
        names.push(&host.name);

        if let Err(e) = AndMatcher::for_host(&host.domain, &host.port, &host.scheme) {
            errors.push(ValidationError::InvalidHost {
                location: location.clone(),
                reason: e.to_string(),
            });
        }
        validate_routes(&format!("{location}.routes"), &host.routes, &mut errors);
        if let Some(target) = &host.default_route {
            validate_target(&format!("{location}.default_route"), target, &mut errors);
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_routes(prefix: &str, routes: &[RouteConfig], errors: &mut Vec<ValidationError>) {
    for (i, route) in routes.iter().enumerate() {
        let location = format!("{prefix}[{i}]");
        let mode = route.matching.unwrap_or(MatchingMode::StartsWith);
        if let Err(e) = Template::new(route.pattern.as_str(), mode) {
            errors.push(ValidationError::InvalidPattern {
                location: location.clone(),
                pattern: route.pattern.clone(),
                reason: e.to_string(),
            });
        }
        for check in &route.validate {
            if let Some(format) = &check.format {
                if let Err(e) = Regex::new(&format!("^(?:{format})$")) {
                    errors.push(ValidationError::InvalidFormat {
                        location: location.clone(),
                        format: format.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        validate_target(&location, &route.target, errors);
    }
}

fn validate_target(location: &str, target: &TargetConfig, errors: &mut Vec<ValidationError>) {
    match (&target.respond, &target.redirect) {
        (Some(respond), None) => {
            if StatusCode::from_u16(respond.status).is_err() {
                errors.push(ValidationError::InvalidStatus {
                    location: location.to_string(),
                    status: respond.status,
                });
            }
        }
        (None, Some(redirect)) => {
            if let Err(e) = Template::new(redirect.location.as_str(), MatchingMode::Equals) {
                errors.push(ValidationError::InvalidPattern {
                    location: location.to_string(),
                    pattern: redirect.location.clone(),
                    reason: e.to_string(),
                });
            }
        }
        _ => errors.push(ValidationError::AmbiguousTarget {
            location: location.to_string(),
        }),
    }
}
