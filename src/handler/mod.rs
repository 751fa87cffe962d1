//! Call handlers.
//!
//! # Data Flow
//! ```text
//! Router / VirtualHost (routing)
//!     → selected Route (filter: before_handle, target, after_handle)
//!     → Handler::handle(cx, request, response)
//!         - HandlerFn (closures)
//!         - Responder (fixed status + templated body)
//!         - Redirector (templated Location)
//!         - nested Router / VirtualHost
//! ```
//!
//! # Design Decisions
//! - One narrow trait instead of a class hierarchy; routers are handlers too
//! - Targets are shared as `Arc<dyn Handler>`; identity is pointer identity
//! - The `Context` is passed explicitly into every call

pub mod context;
pub mod redirector;
pub mod responder;

use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use crate::error::RoutingError;
use crate::message::{Request, Response};

pub use context::Context;
pub use redirector::{RedirectKind, Redirector};
pub use responder::Responder;

/// Something that can answer a call.
pub trait Handler: Send + Sync + fmt::Debug + 'static {
    /// Process the call, updating the response in place.
    fn handle(&self, cx: &Context, request: &mut Request, response: &mut Response);

    fn start(&self) -> Result<(), RoutingError> {
        Ok(())
    }

    fn stop(&self) -> Result<(), RoutingError> {
        Ok(())
    }

    /// Concrete type of the handler, used to detach targets by type.
    fn handler_type(&self) -> TypeId {
        TypeId::of::<Self>()
    }
}

/// Whether two handles point at the same handler instance.
pub fn same_handler(a: &Arc<dyn Handler>, b: &Arc<dyn Handler>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

/// Adapter turning a closure into a [`Handler`].
pub struct HandlerFn<F> {
    name: &'static str,
    f: F,
}

impl<F> fmt::Debug for HandlerFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerFn").field("name", &self.name).finish()
    }
}

impl<F> Handler for HandlerFn<F>
where
    F: Fn(&Context, &mut Request, &mut Response) + Send + Sync + 'static,
{
    fn handle(&self, cx: &Context, request: &mut Request, response: &mut Response) {
        (self.f)(cx, request, response)
    }
}

/// Wrap a closure as a shared handler.
pub fn handler_fn<F>(f: F) -> Arc<dyn Handler>
where
    F: Fn(&Context, &mut Request, &mut Response) + Send + Sync + 'static,
{
    named_handler_fn("closure", f)
}

/// Wrap a closure as a shared handler with a name shown in logs.
pub fn named_handler_fn<F>(name: &'static str, f: F) -> Arc<dyn Handler>
where
    F: Fn(&Context, &mut Request, &mut Response) + Send + Sync + 'static,
{
    Arc::new(HandlerFn { name, f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Method, StatusCode};

    #[test]
    fn test_handler_fn_runs_closure() {
        let h = handler_fn(|_cx, req, resp| {
            resp.set_status(StatusCode::ACCEPTED);
            resp.set_entity(req.resource_ref().path().to_string(), "text/plain");
        });
        let mut req = Request::new(Method::GET, "http://localhost/ping").unwrap();
        let mut resp = Response::new();
        h.handle(&Context::new("test"), &mut req, &mut resp);
        assert_eq!(resp.status(), StatusCode::ACCEPTED);
        assert_eq!(resp.entity().unwrap().body, "/ping");
    }

    #[test]
    fn test_identity_and_type() {
        let a = handler_fn(|_, _, _| {});
        let b = handler_fn(|_, _, _| {});
        assert!(same_handler(&a, &a.clone()));
        assert!(!same_handler(&a, &b));

        let r: Arc<dyn Handler> = Arc::new(Responder::text(StatusCode::OK, "ok"));
        assert_eq!(r.handler_type(), TypeId::of::<Responder>());
    }
}
