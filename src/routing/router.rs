//! Route selection and dispatch.
//!
//! # Responsibilities
//! - Own the route table and the selection settings
//! - Build template routes from patterns at attach time
//! - Pick a route with the configured policy and required score
//! - Fall back to the default route, else answer 404
//!
//! # Design Decisions
//! - Settings are atomics so routers can be reconfigured while serving
//! - Routes keep a weak handle to the settings; the router owns them
//! - Attach fails eagerly on malformed patterns
//! - A router is a `Handler`, so routers nest

use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};

use crate::error::RoutingError;
use crate::handler::{same_handler, Context, Handler};
use crate::message::{Request, Response};
use crate::observability::metrics;
use crate::routing::route::{Route, TemplateRoute};
use crate::routing::route_list::RouteList;
use crate::routing::template::{MatchingMode, Template};

/// Policy used to pick among the routes meeting the required score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoutingMode {
    /// Highest score wins.
    Best,
    /// First route in list order.
    #[default]
    First,
    /// Last route in list order.
    Last,
    /// Round robin across calls.
    Next,
    /// Random start, then list order.
    Random,
    /// Delegated to the installed [`RouteSelector`].
    Custom,
}

impl RoutingMode {
    const ALL: [RoutingMode; 6] = [
        RoutingMode::Best,
        RoutingMode::First,
        RoutingMode::Last,
        RoutingMode::Next,
        RoutingMode::Random,
        RoutingMode::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            RoutingMode::Best => "best",
            RoutingMode::First => "first",
            RoutingMode::Last => "last",
            RoutingMode::Next => "next",
            RoutingMode::Random => "random",
            RoutingMode::Custom => "custom",
        }
    }

    fn index(self) -> u8 {
        self as u8
    }

    fn from_index(index: u8) -> Self {
        Self::ALL
            .get(usize::from(index))
            .copied()
            .unwrap_or_default()
    }
}

impl fmt::Display for RoutingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Selection settings shared by a router and its routes.
#[derive(Debug)]
pub struct RouterSettings {
    routing_mode: AtomicU8,
    /// `f32` bits.
    required_score: AtomicU32,
    default_equals: AtomicBool,
    matching_query: AtomicBool,
    max_attempts: AtomicU32,
    retry_delay_ms: AtomicU64,
}

impl Default for RouterSettings {
    fn default() -> Self {
        Self {
            routing_mode: AtomicU8::new(RoutingMode::First.index()),
            required_score: AtomicU32::new(0.5f32.to_bits()),
            default_equals: AtomicBool::new(false),
            matching_query: AtomicBool::new(false),
            max_attempts: AtomicU32::new(1),
            retry_delay_ms: AtomicU64::new(500),
        }
    }
}

impl RouterSettings {
    pub fn routing_mode(&self) -> RoutingMode {
        RoutingMode::from_index(self.routing_mode.load(Ordering::Relaxed))
    }

    pub fn set_routing_mode(&self, mode: RoutingMode) {
        self.routing_mode.store(mode.index(), Ordering::Relaxed);
    }

    pub fn required_score(&self) -> f32 {
        f32::from_bits(self.required_score.load(Ordering::Relaxed))
    }

    /// Clamped to `[0, 1]`.
    pub fn set_required_score(&self, score: f32) {
        let score = if score.is_nan() { 0.0 } else { score.clamp(0.0, 1.0) };
        self.required_score.store(score.to_bits(), Ordering::Relaxed);
    }

    pub fn default_matching_mode(&self) -> MatchingMode {
        if self.default_equals.load(Ordering::Relaxed) {
            MatchingMode::Equals
        } else {
            MatchingMode::StartsWith
        }
    }

    pub fn set_default_matching_mode(&self, mode: MatchingMode) {
        self.default_equals
            .store(mode == MatchingMode::Equals, Ordering::Relaxed);
    }

    /// Default for new routes: whether the query string takes part in matching.
    pub fn matching_query(&self) -> bool {
        self.matching_query.load(Ordering::Relaxed)
    }

    pub fn set_matching_query(&self, matching_query: bool) {
        self.matching_query.store(matching_query, Ordering::Relaxed);
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts.load(Ordering::Relaxed)
    }

    /// At least one attempt is always made.
    pub fn set_max_attempts(&self, attempts: u32) {
        self.max_attempts.store(attempts.max(1), Ordering::Relaxed);
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.load(Ordering::Relaxed))
    }

    pub fn set_retry_delay(&self, delay: Duration) {
        let millis = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self.retry_delay_ms.store(millis, Ordering::Relaxed);
    }
}

/// Selection policy for [`RoutingMode::Custom`].
pub trait RouteSelector: Send + Sync + fmt::Debug {
    fn select(
        &self,
        routes: &[Arc<dyn Route>],
        request: &Request,
        response: &Response,
        required_score: f32,
    ) -> Option<Arc<dyn Route>>;
}

/// Dispatches calls to the route chosen by its routing mode.
pub struct Router {
    settings: Arc<RouterSettings>,
    routes: RouteList,
    default_route: ArcSwapOption<TemplateRoute>,
    selector: ArcSwapOption<Box<dyn RouteSelector>>,
    started: AtomicBool,
    lifecycle: Mutex<()>,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("routing_mode", &self.settings.routing_mode())
            .field("required_score", &self.settings.required_score())
            .field("routes", &self.routes.len())
            .field("started", &self.is_started())
            .finish()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

impl Router {
    pub fn new() -> Self {
        Self {
            settings: Arc::new(RouterSettings::default()),
            routes: RouteList::new(),
            default_route: ArcSwapOption::empty(),
            selector: ArcSwapOption::empty(),
            started: AtomicBool::new(false),
            lifecycle: Mutex::new(()),
        }
    }

    /// A router using `mode`.
    pub fn with_mode(mode: RoutingMode) -> Self {
        let router = Self::new();
        router.settings.set_routing_mode(mode);
        router
    }

    pub fn settings(&self) -> &Arc<RouterSettings> {
        &self.settings
    }

    pub fn routes(&self) -> &RouteList {
        &self.routes
    }

    pub fn routing_mode(&self) -> RoutingMode {
        self.settings.routing_mode()
    }

    pub fn set_routing_mode(&self, mode: RoutingMode) {
        self.settings.set_routing_mode(mode);
    }

    pub fn required_score(&self) -> f32 {
        self.settings.required_score()
    }

    pub fn set_required_score(&self, score: f32) {
        self.settings.set_required_score(score);
    }

    pub fn default_route(&self) -> Option<Arc<TemplateRoute>> {
        self.default_route.load_full()
    }

    /// Install the policy used in [`RoutingMode::Custom`].
    pub fn set_custom_selector(&self, selector: Box<dyn RouteSelector>) {
        self.selector.store(Some(Arc::new(selector)));
    }

    /// Build a route bound to this router without attaching it.
    pub fn route(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
        mode: MatchingMode,
    ) -> Result<TemplateRoute, RoutingError> {
        let template = Template::new(pattern, mode)?;
        Ok(TemplateRoute::new(&self.settings, template, target))
    }

    /// Attach `target` behind `pattern`, after existing routes.
    pub fn attach(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
    ) -> Result<Arc<TemplateRoute>, RoutingError> {
        self.attach_with_mode(pattern, target, self.settings.default_matching_mode())
    }

    /// Attach `target` ahead of existing routes.
    pub fn attach_first(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
    ) -> Result<Arc<TemplateRoute>, RoutingError> {
        let route = Arc::new(self.route(pattern, target, self.settings.default_matching_mode())?);
        self.routes.add_first(route.clone());
        Ok(route)
    }

    pub fn attach_with_mode(
        &self,
        pattern: &str,
        target: Arc<dyn Handler>,
        mode: MatchingMode,
    ) -> Result<Arc<TemplateRoute>, RoutingError> {
        let route = Arc::new(self.route(pattern, target, mode)?);
        self.routes.add(route.clone());
        Ok(route)
    }

    /// Attach a prepared route, for instance one built with [`Router::route`]
    /// and then given extractions or validations.
    pub fn attach_route(&self, route: Arc<dyn Route>) {
        self.routes.add(route);
    }

    /// Target used when no route meets the required score.
    pub fn attach_default(&self, target: Arc<dyn Handler>) -> Result<Arc<TemplateRoute>, RoutingError> {
        let route = Arc::new(self.route("", target, MatchingMode::StartsWith)?);
        self.set_default_route(route.clone());
        Ok(route)
    }

    pub(crate) fn set_default_route(&self, route: Arc<TemplateRoute>) {
        self.default_route.store(Some(route));
    }

    /// Remove every route to `target`, the default route included. Returns
    /// the number of routes removed.
    pub fn detach(&self, target: &Arc<dyn Handler>) -> usize {
        let removed = self.routes.remove_all(target);
        let cleared = self.clear_default_if(|route| same_handler(route.target(), target));
        removed + usize::from(cleared)
    }

    /// Remove every route whose target is a `T`. Returns the number removed.
    pub fn detach_type<T: Handler>(&self) -> usize {
        let type_id = TypeId::of::<T>();
        let removed = self
            .routes
            .retain(|route| route.target().handler_type() != type_id);
        let cleared = self.clear_default_if(|route| route.target().handler_type() == type_id);
        removed + usize::from(cleared)
    }

    fn clear_default_if<F>(&self, matches: F) -> bool
    where
        F: Fn(&TemplateRoute) -> bool,
    {
        let previous = self.default_route.rcu(|current| match current {
            Some(route) if matches(&**route) => None,
            other => other.clone(),
        });
        previous.is_some_and(|route| matches(&*route))
    }

    /// The route that should handle the call, if any.
    pub fn select(&self, request: &Request, response: &Response) -> Option<Arc<dyn Route>> {
        let mode = self.settings.routing_mode();
        let required = self.settings.required_score();
        let attempts = self.settings.max_attempts().max(1);

        for attempt in 1..=attempts {
            if let Some(route) = self.select_once(mode, request, response, required) {
                metrics::record_selection(mode.as_str(), "matched");
                return Some(route);
            }
            if attempt < attempts {
                thread::sleep(self.settings.retry_delay());
            }
        }

        if let Some(route) = self.default_route.load_full() {
            if route.score(request, response) >= required {
                metrics::record_selection(mode.as_str(), "default");
                return Some(route as Arc<dyn Route>);
            }
        }

        metrics::record_selection(mode.as_str(), "none");
        None
    }

    fn select_once(
        &self,
        mode: RoutingMode,
        request: &Request,
        response: &Response,
        required: f32,
    ) -> Option<Arc<dyn Route>> {
        match mode {
            RoutingMode::Best => self.routes.get_best(request, response, required),
            RoutingMode::First => self.routes.get_first(request, response, required),
            RoutingMode::Last => self.routes.get_last(request, response, required),
            RoutingMode::Next => self.routes.get_next(request, response, required),
            RoutingMode::Random => self.routes.get_random(request, response, required),
            RoutingMode::Custom => {
                let routes = self.routes.snapshot();
                self.selector
                    .load_full()
                    .and_then(|s| s.select(&routes, request, response, required))
            }
        }
    }

    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::Acquire)
    }
}

impl Handler for Router {
    fn handle(&self, cx: &Context, request: &mut Request, response: &mut Response) {
        if !self.is_started() {
            if let Err(e) = self.start() {
                tracing::error!(component = %cx.name(), error = %e, "Unable to start the router");
                response.set_status(StatusCode::INTERNAL_SERVER_ERROR);
                return;
            }
        }

        match self.select(request, response) {
            Some(route) => {
                tracing::debug!(component = %cx.name(), route = ?route, "Route selected");
                route.handle(cx, request, response);
            }
            None => {
                tracing::debug!(
                    component = %cx.name(),
                    remaining = %request.resource_ref().remaining_part(self.settings.matching_query()),
                    "No route matched"
                );
                response.set_status(StatusCode::NOT_FOUND);
            }
        }
    }

    /// Start every target, the default one last. If one fails, the targets
    /// already started are stopped again and the router stays stopped.
    fn start(&self) -> Result<(), RoutingError> {
        let _guard = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if self.is_started() {
            return Ok(());
        }
        let targets = self.targets();
        for (i, target) in targets.iter().enumerate() {
            if let Err(e) = target.start() {
                for started in targets[..i].iter().rev() {
                    if let Err(stop_error) = started.stop() {
                        tracing::warn!(handler = ?started, error = %stop_error, "Rollback stop failed");
                    }
                }
                return Err(e);
            }
        }
        self.started.store(true, Ordering::Release);
        Ok(())
    }

    /// Stop targets in reverse order. Every target is stopped even if some
    /// fail; the first failure is returned and the router ends up stopped.
    fn stop(&self) -> Result<(), RoutingError> {
        let _guard = self.lifecycle.lock().unwrap_or_else(|e| e.into_inner());
        if !self.is_started() {
            return Ok(());
        }
        let mut first_error = None;
        for target in self.targets().iter().rev() {
            if let Err(e) = target.stop() {
                tracing::warn!(handler = ?target, error = %e, "Target did not stop cleanly");
                first_error.get_or_insert(e);
            }
        }
        self.started.store(false, Ordering::Release);
        first_error.map_or(Ok(()), Err)
    }
}

impl Router {
    /// Route targets in list order, then the default target.
    fn targets(&self) -> Vec<Arc<dyn Handler>> {
        let mut targets: Vec<Arc<dyn Handler>> = self
            .routes
            .snapshot()
            .iter()
            .map(|route| route.target().clone())
            .collect();
        if let Some(route) = self.default_route.load_full() {
            targets.push(route.target().clone());
        }
        targets
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler_fn, Responder};
    use crate::routing::route_list::tests::FixedRoute;
    use axum::http::Method;
    use std::sync::atomic::AtomicUsize;

    fn text(body: &str) -> Arc<dyn Handler> {
        Arc::new(Responder::text(StatusCode::OK, body))
    }

    fn dispatch(router: &Router, uri: &str) -> Response {
        let mut req = Request::new(Method::GET, uri).unwrap();
        let mut resp = Response::new();
        router.handle(&Context::new("test"), &mut req, &mut resp);
        resp
    }

    fn body(resp: &Response) -> &str {
        resp.entity().map_or("", |e| e.body.as_str())
    }

    #[test]
    fn test_defaults() {
        let router = Router::new();
        assert_eq!(router.routing_mode(), RoutingMode::First);
        assert_eq!(router.required_score(), 0.5);
        assert_eq!(router.settings().default_matching_mode(), MatchingMode::StartsWith);
        assert!(!router.settings().matching_query());
        assert_eq!(router.settings().max_attempts(), 1);
        assert_eq!(router.settings().retry_delay(), Duration::from_millis(500));
    }

    #[test]
    fn test_best_prefers_longer_match() {
        let router = Router::with_mode(RoutingMode::Best);
        router.attach("/items", text("list")).unwrap();
        router.attach("/items/{id}", text("item")).unwrap();

        let resp = dispatch(&router, "http://h/items/42");
        assert_eq!(body(&resp), "item");

        let resp = dispatch(&router, "http://h/other");
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_first_and_override() {
        let router = Router::new();
        router.attach("/items", text("list")).unwrap();
        router.attach("/items/{id}", text("item")).unwrap();
        assert_eq!(body(&dispatch(&router, "http://h/items/42")), "list");

        router.attach_first("/items/{id}", text("override")).unwrap();
        assert_eq!(body(&dispatch(&router, "http://h/items/42")), "override");
    }

    #[test]
    fn test_last_mode() {
        let router = Router::with_mode(RoutingMode::Last);
        router.attach("/a", text("one")).unwrap();
        router.attach("/a", text("two")).unwrap();
        assert_eq!(body(&dispatch(&router, "http://h/a")), "two");
    }

    #[test]
    fn test_malformed_pattern_fails_at_attach() {
        let router = Router::new();
        assert!(matches!(
            router.attach("/items/{id", text("x")),
            Err(RoutingError::Template(_))
        ));
        assert!(router.routes().is_empty());
    }

    #[test]
    fn test_default_route() {
        let router = Router::new();
        router.attach("/items", text("list")).unwrap();
        let fallback = text("fallback");
        router.attach_default(fallback.clone()).unwrap();
        assert_eq!(body(&dispatch(&router, "http://h/unknown")), "fallback");

        assert_eq!(router.detach(&fallback), 1);
        assert!(router.default_route().is_none());
        assert_eq!(dispatch(&router, "http://h/unknown").status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_detach_by_instance_and_type() {
        let router = Router::new();
        let shared = text("shared");
        router.attach("/a", shared.clone()).unwrap();
        router.attach("/b", shared.clone()).unwrap();
        router.attach("/c", handler_fn(|_, _, _| {})).unwrap();

        assert_eq!(router.detach(&shared), 2);
        assert_eq!(router.routes().len(), 1);

        router.attach("/d", text("d")).unwrap();
        assert_eq!(router.detach_type::<Responder>(), 1);
        assert_eq!(router.routes().len(), 1);
    }

    #[test]
    fn test_nested_routers_consume_prefix() {
        let inner = Arc::new(Router::new());
        inner
            .attach(
                "/{user}",
                handler_fn(|_, req, resp| {
                    let text = format!(
                        "{} {}",
                        req.attribute("user").unwrap_or("-"),
                        req.resource_ref().remaining_part(false)
                    );
                    resp.set_entity(text, "text/plain");
                }),
            )
            .unwrap();

        let outer = Router::new();
        outer.attach("/users", inner).unwrap();
        assert_eq!(body(&dispatch(&outer, "http://h/users/ada/posts")), "ada /posts");
    }

    #[test]
    fn test_custom_selector() {
        #[derive(Debug)]
        struct LastOfAll;

        impl RouteSelector for LastOfAll {
            fn select(
                &self,
                routes: &[Arc<dyn Route>],
                _: &Request,
                _: &Response,
                _: f32,
            ) -> Option<Arc<dyn Route>> {
                routes.last().cloned()
            }
        }

        let router = Router::with_mode(RoutingMode::Custom);
        router.attach("/a", text("a")).unwrap();
        router.attach("/b", text("b")).unwrap();
        assert_eq!(dispatch(&router, "http://h/a").status(), StatusCode::NOT_FOUND);

        router.set_custom_selector(Box::new(LastOfAll));
        assert_eq!(body(&dispatch(&router, "http://h/a")), "b");
    }

    #[test]
    fn test_retry_attempts() {
        let router = Router::new();
        router.settings().set_max_attempts(3);
        router.settings().set_retry_delay(Duration::from_millis(1));

        let calls = Arc::new(AtomicUsize::new(0));
        #[derive(Debug)]
        struct Counting(Arc<AtomicUsize>, Arc<dyn Handler>);
        impl Route for Counting {
            fn score(&self, _: &Request, _: &Response) -> f32 {
                self.0.fetch_add(1, Ordering::SeqCst);
                0.0
            }
            fn target(&self) -> &Arc<dyn Handler> {
                &self.1
            }
        }
        router.attach_route(Arc::new(Counting(calls.clone(), handler_fn(|_, _, _| {}))));

        assert_eq!(dispatch(&router, "http://h/x").status(), StatusCode::NOT_FOUND);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_lifecycle_start_failure_answers_500() {
        #[derive(Debug)]
        struct Broken;
        impl Handler for Broken {
            fn handle(&self, _: &Context, _: &mut Request, _: &mut Response) {}
            fn start(&self) -> Result<(), RoutingError> {
                Err(RoutingError::Start {
                    component: "broken".into(),
                    reason: "no backing store".into(),
                })
            }
        }

        let router = Router::new();
        router.attach("/x", Arc::new(Broken)).unwrap();
        assert_eq!(
            dispatch(&router, "http://h/x").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert!(!router.is_started());
    }

    /// Records lifecycle calls; fails where asked to.
    #[derive(Debug, Default)]
    struct Tracked {
        running: AtomicBool,
        fail_start: bool,
        fail_stop: bool,
    }

    impl Handler for Tracked {
        fn handle(&self, _: &Context, _: &mut Request, _: &mut Response) {}

        fn start(&self) -> Result<(), RoutingError> {
            if self.fail_start {
                return Err(RoutingError::Start {
                    component: "tracked".into(),
                    reason: "refused".into(),
                });
            }
            self.running.store(true, Ordering::SeqCst);
            Ok(())
        }

        fn stop(&self) -> Result<(), RoutingError> {
            self.running.store(false, Ordering::SeqCst);
            if self.fail_stop {
                return Err(RoutingError::Start {
                    component: "tracked".into(),
                    reason: "stuck".into(),
                });
            }
            Ok(())
        }
    }

    #[test]
    fn test_failed_start_rolls_back() {
        let first = Arc::new(Tracked::default());
        let broken = Arc::new(Tracked {
            fail_start: true,
            ..Tracked::default()
        });
        let router = Router::new();
        router.attach("/a", first.clone()).unwrap();
        router.attach("/b", broken).unwrap();

        assert!(router.start().is_err());
        assert!(!router.is_started());
        assert!(!first.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_stop_reaches_every_target() {
        let first = Arc::new(Tracked::default());
        let stuck = Arc::new(Tracked {
            fail_stop: true,
            ..Tracked::default()
        });
        let fallback = Arc::new(Tracked::default());
        let router = Router::new();
        router.attach("/a", first.clone()).unwrap();
        router.attach("/b", stuck.clone()).unwrap();
        router.attach_default(fallback.clone()).unwrap();

        router.start().unwrap();
        assert!(first.running.load(Ordering::SeqCst));
        assert!(fallback.running.load(Ordering::SeqCst));

        assert!(matches!(router.stop(), Err(RoutingError::Start { .. })));
        assert!(!router.is_started());
        assert!(!first.running.load(Ordering::SeqCst));
        assert!(!stuck.running.load(Ordering::SeqCst));
        assert!(!fallback.running.load(Ordering::SeqCst));
    }

    #[test]
    fn test_start_and_stop() {
        let router = Router::new();
        router.attach_route(Arc::new(FixedRoute {
            score: 1.0,
            target: text("x"),
        }));
        router.start().unwrap();
        assert!(router.is_started());
        router.stop().unwrap();
        assert!(!router.is_started());
    }

    #[test]
    fn test_required_score_is_clamped() {
        let router = Router::new();
        router.set_required_score(1.5);
        assert_eq!(router.required_score(), 1.0);
        router.set_required_score(-1.0);
        assert_eq!(router.required_score(), 0.0);
    }
}
