//! Scored URI routing and dispatch.
//!
//! Calls are dispatched through a tree of routers. Each router scores its
//! routes against the part of the URI its parents have not consumed yet and
//! picks one with its routing mode (best, first, last, round robin, random
//! or custom). Route tables can be changed while calls are being served.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod lifecycle;
pub mod message;
pub mod observability;
pub mod routing;

pub use config::schema::AppConfig;
pub use error::{RoutingError, TemplateError};
pub use handler::{handler_fn, Context, Handler};
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use message::{Request, Response};
pub use routing::{Router, RoutingMode, VirtualHost};
