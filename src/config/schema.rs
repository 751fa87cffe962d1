//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::handler::RedirectKind;
use crate::routing::router::RoutingMode;
use crate::routing::template::MatchingMode;

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Selection settings applied to every host router.
    pub router: RouterConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Virtual hosts, checked in order before the default host.
    pub hosts: Vec<VirtualHostConfig>,

    /// Routes of the default host.
    pub routes: Vec<RouteConfig>,

    /// Target of the default host for calls no route accepts.
    pub default_route: Option<TargetConfig>,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Largest request entity read into memory, in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Route selection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Selection policy: best, first, last, next or random.
    pub routing_mode: RoutingMode,

    /// Minimum score for a route to be selected, in [0, 1].
    pub required_score: f32,

    /// Whether the query string takes part in matching.
    pub matching_query: bool,

    /// Selection attempts before giving up.
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    pub retry_delay_ms: u64,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            routing_mode: RoutingMode::Best,
            required_score: 0.5,
            matching_query: false,
            max_attempts: 1,
            retry_delay_ms: 500,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Pretty,
    Compact,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, overridden by `RUST_LOG`.
    pub log_filter: String,

    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "scored_router=info,tower_http=info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// A virtual host. Patterns are regexes matched against the whole value.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct VirtualHostConfig {
    /// Host identifier for logging.
    pub name: String,

    #[serde(default = "any_pattern")]
    pub domain: String,

    #[serde(default = "any_pattern")]
    pub port: String,

    #[serde(default = "any_pattern")]
    pub scheme: String,

    #[serde(default)]
    pub routes: Vec<RouteConfig>,

    #[serde(default)]
    pub default_route: Option<TargetConfig>,
}

fn any_pattern() -> String {
    ".*".to_string()
}

/// A URI template bound to a target.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// URI template, e.g. `/users/{user}`.
    pub pattern: String,

    /// Insert ahead of previously declared routes.
    #[serde(default)]
    pub first: bool,

    /// Overrides the host's default matching mode.
    #[serde(default)]
    pub matching: Option<MatchingMode>,

    #[serde(default)]
    pub extract: Vec<ExtractConfig>,

    #[serde(default)]
    pub validate: Vec<ValidateConfig>,

    #[serde(flatten)]
    pub target: TargetConfig,
}

/// What answers the call. Exactly one field must be set.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct TargetConfig {
    pub respond: Option<RespondConfig>,
    pub redirect: Option<RedirectConfig>,
}

/// A fixed response; `{name}` in the body is replaced by request attributes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RespondConfig {
    pub status: u16,
    pub body: String,
    pub content_type: String,
}

impl Default for RespondConfig {
    fn default() -> Self {
        Self {
            status: 200,
            body: String::new(),
            content_type: crate::handler::responder::TEXT_PLAIN.to_string(),
        }
    }
}

/// A client redirection to a URI template.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedirectConfig {
    pub location: String,
    #[serde(default)]
    pub kind: RedirectKind,
}

/// Where an extracted attribute comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractSource {
    Query,
    Cookie,
    Entity,
}

/// Copy a query parameter, cookie or form field into a request attribute.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractConfig {
    pub attribute: String,
    pub source: ExtractSource,
    /// Parameter name; defaults to the attribute name.
    #[serde(default)]
    pub parameter: Option<String>,
    /// Keep only the first value instead of joining all with `,`.
    #[serde(default = "default_true")]
    pub first: bool,
}

fn default_true() -> bool {
    true
}

/// Check a request attribute before the target runs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ValidateConfig {
    pub attribute: String,
    #[serde(default)]
    pub required: bool,
    /// Regex the whole value must match.
    #[serde(default)]
    pub format: Option<String>,
}
