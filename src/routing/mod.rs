//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming call (resource reference: base + remaining part)
//!     → router.rs (routing mode, required score, attempts)
//!     → route_list.rs (snapshot; best / first / last / next / random)
//!     → route.rs (score each route against the remaining part)
//!     → winner's before_handle: capture variables, move base forward
//!     → target Handler (nested Router, VirtualHost, Responder, ...)
//!     → none qualifies: default route, else 404
//!
//! Route construction (attach / config):
//!     pattern
//!     → template.rs + variable.rs (compile to an anchored regex)
//!     → TemplateRoute bound to the router's settings
//!     → copy-on-write insert into the RouteList
//! ```
//!
//! # Design Decisions
//! - Readers never lock: selection works on an immutable snapshot
//! - Scores are pure; only the selected route mutates the call
//! - Malformed patterns fail at attach time, not per request
//! - Prefix matching by default so routers compose hierarchically

pub mod builder;
pub mod matcher;
pub mod route;
pub mod route_list;
pub mod router;
pub mod template;
pub mod variable;
pub mod virtual_host;

pub use route::{Flow, Route, TemplateRoute};
pub use route_list::RouteList;
pub use router::{RouteSelector, Router, RouterSettings, RoutingMode};
pub use template::{MatchingMode, Template, TemplateBuilder};
pub use variable::{Variable, VariableKind};
pub use virtual_host::{host_router, HostRoute, VirtualHost};
