//! Virtual hosting.
//!
//! A [`VirtualHost`] is a router scoped to the calls whose host domain, port
//! and scheme match its patterns. A server-level router holds one
//! [`HostRoute`] per virtual host plus an optional default host:
//!
//! ```text
//! server Router (First)
//!     → HostRoute(example.com)  → VirtualHost → Router (Best) → targets
//!     → HostRoute(api.example.com) → ...
//!     → default route           → default VirtualHost
//! ```

use std::sync::Arc;

use crate::error::RoutingError;
use crate::handler::{Context, Handler};
use crate::message::{Request, Response};
use crate::routing::matcher::{AndMatcher, Matcher, ANY};
use crate::routing::route::{Route, TemplateRoute};
use crate::routing::router::{Router, RoutingMode};
use crate::routing::template::MatchingMode;

/// A router serving the calls addressed to one host.
#[derive(Debug)]
pub struct VirtualHost {
    name: String,
    matcher: AndMatcher,
    router: Router,
}

impl VirtualHost {
    /// A host accepting every domain, port and scheme.
    pub fn new(name: impl Into<String>) -> Self {
        Self::build(name.into(), AndMatcher::default())
    }

    /// A host accepting calls whose domain, port and scheme match the given
    /// regexes. Use `.*` for "any".
    pub fn with_host(
        name: impl Into<String>,
        domain: &str,
        port: &str,
        scheme: &str,
    ) -> Result<Self, RoutingError> {
        Ok(Self::build(name.into(), AndMatcher::for_host(domain, port, scheme)?))
    }

    fn build(name: String, matcher: AndMatcher) -> Self {
        let router = Router::with_mode(RoutingMode::Best);
        router
            .settings()
            .set_default_matching_mode(MatchingMode::StartsWith);
        Self {
            name,
            matcher,
            router,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Whether this host accepts the call.
    pub fn matches(&self, request: &Request) -> bool {
        self.matcher.matches(request)
    }

    /// Build a route that also records the new base as the root reference.
    pub fn route(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
        mode: MatchingMode,
    ) -> Result<TemplateRoute, RoutingError> {
        Ok(self.router.route(pattern, target, mode)?.setting_root_ref())
    }

    pub fn attach(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
    ) -> Result<Arc<TemplateRoute>, RoutingError> {
        let mode = self.router.settings().default_matching_mode();
        let route = Arc::new(self.route(pattern, target, mode)?);
        self.router.attach_route(route.clone());
        Ok(route)
    }

    pub fn attach_first(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
    ) -> Result<Arc<TemplateRoute>, RoutingError> {
        let mode = self.router.settings().default_matching_mode();
        let route = Arc::new(self.route(pattern, target, mode)?);
        self.router.routes().add_first(route.clone());
        Ok(route)
    }

    pub fn attach_default(
        &self,
        target: Arc<dyn Handler>,
    ) -> Result<Arc<TemplateRoute>, RoutingError> {
        let route = Arc::new(self.route("", target, MatchingMode::StartsWith)?);
        self.router.set_default_route(route.clone());
        Ok(route)
    }
}

impl Handler for VirtualHost {
    fn handle(&self, cx: &Context, request: &mut Request, response: &mut Response) {
        let cx = cx.child(&self.name);
        tracing::trace!(component = %cx.name(), "Virtual host accepted the call");
        self.router.handle(&cx, request, response);
    }

    fn start(&self) -> Result<(), RoutingError> {
        self.router.start()
    }

    fn stop(&self) -> Result<(), RoutingError> {
        self.router.stop()
    }
}

/// Routes a call to a virtual host: 1.0 when the host accepts it, else 0.
#[derive(Debug)]
pub struct HostRoute {
    host: Arc<VirtualHost>,
    target: Arc<dyn Handler>,
}

impl HostRoute {
    pub fn new(host: Arc<VirtualHost>) -> Self {
        let target: Arc<dyn Handler> = host.clone();
        Self { host, target }
    }

    pub fn host(&self) -> &Arc<VirtualHost> {
        &self.host
    }
}

impl Route for HostRoute {
    fn score(&self, request: &Request, _response: &Response) -> f32 {
        let score = if self.host.matches(request) { 1.0 } else { 0.0 };
        tracing::trace!(host = %self.host.name(), score, "Call score for virtual host");
        score
    }

    fn target(&self) -> &Arc<dyn Handler> {
        &self.target
    }
}

/// Server-level router dispatching on the host, in declaration order.
pub fn host_router(
    hosts: Vec<Arc<VirtualHost>>,
    default_host: Option<Arc<VirtualHost>>,
) -> Result<Router, RoutingError> {
    let router = Router::with_mode(RoutingMode::First);
    for host in hosts {
        tracing::debug!(host = %host.name(), "Virtual host attached");
        router.attach_route(Arc::new(HostRoute::new(host)));
    }
    if let Some(host) = default_host {
        router.attach_default(host)?;
    }
    Ok(router)
}
