//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with a catch-all handler
//! - Wire up middleware (request ID, tracing, timeout)
//! - Bridge each HTTP request into the routing core
//! - Swap in a new route tree when the configuration changes
//! - Observability (dispatch metrics, correlation IDs)

use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::any,
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::AppConfig;
use crate::error::RoutingError;
use crate::handler::{Context, Handler};
use crate::http::request::{from_http, request_id};
use crate::http::response::into_http;
use crate::lifecycle::shutdown;
use crate::observability::metrics;
use crate::routing::builder;
use crate::routing::Router as RouteTree;

/// A route tree published to the server. It is stopped when the last call
/// holding it finishes, so a replaced tree drains before it stops.
#[derive(Debug)]
pub struct LiveTree(RouteTree);

impl Deref for LiveTree {
    type Target = RouteTree;

    fn deref(&self) -> &RouteTree {
        &self.0
    }
}

impl Drop for LiveTree {
    fn drop(&mut self) {
        match self.0.stop() {
            Ok(()) => tracing::debug!("Route tree stopped"),
            Err(e) => tracing::warn!(error = %e, "Route tree did not stop cleanly"),
        }
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub root: Arc<ArcSwap<LiveTree>>,
    pub max_body_size: usize,
}

/// HTTP connector serving a route tree.
pub struct HttpServer {
    router: Router,
    root: Arc<ArcSwap<LiveTree>>,
}

impl HttpServer {
    /// Build the route tree described by `config` and the HTTP stack in front
    /// of it.
    pub fn new(config: AppConfig) -> Result<Self, RoutingError> {
        let tree = builder::from_config(&config)?;
        Ok(Self::with_tree(tree, &config))
    }

    /// Serve a route tree assembled in code. HTTP settings come from `config`.
    pub fn with_tree(tree: RouteTree, config: &AppConfig) -> Self {
        let root = Arc::new(ArcSwap::from_pointee(LiveTree(tree)));
        let state = AppState {
            root: root.clone(),
            max_body_size: config.listener.max_body_size,
        };
        let router = Self::build_router(config, state);
        Self { router, root }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &AppConfig, state: AppState) -> Router {
        Router::new()
            .route("/{*path}", any(dispatch))
            .route("/", any(dispatch))
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(TraceLayer::new_for_http())
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The HTTP application, for serving on a custom transport or testing.
    pub fn app(&self) -> Router {
        self.router.clone()
    }

    /// The live route tree.
    pub fn root(&self) -> Arc<LiveTree> {
        self.root.load_full()
    }

    /// Replace the live route tree. Calls in flight finish on the old tree,
    /// which stops once the last of them is done.
    pub fn reload(&self, config: &AppConfig) -> Result<(), RoutingError> {
        replace_tree(&self.root, config)
    }

    /// Run the server until `shutdown` fires, applying configuration updates
    /// as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<AppConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let root = self.root.clone();
        let updates = tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                if let Err(e) = replace_tree(&root, &config) {
                    tracing::error!(error = %e, "Failed to apply config update, keeping current routes");
                }
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown::wait(shutdown))
            .await?;
        updates.abort();

        if let Err(e) = self.root.load().stop() {
            tracing::warn!(error = %e, "Route tree did not stop cleanly");
        }
        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn replace_tree(root: &ArcSwap<LiveTree>, config: &AppConfig) -> Result<(), RoutingError> {
    let tree = builder::from_config(config)?;
    let previous = root.swap(Arc::new(LiveTree(tree)));
    tracing::info!(
        in_flight = Arc::strong_count(&previous) - 1,
        "Route tree replaced"
    );
    Ok(())
}

/// Catch-all handler: route the call through the live tree.
async fn dispatch(State(state): State<AppState>, request: axum::http::Request<Body>) -> Response {
    let start_time = Instant::now();
    let request_id = request_id(&request);

    tracing::debug!(
        request_id = %request_id,
        method = %request.method(),
        uri = %request.uri(),
        "Dispatching request"
    );

    let mut call = match from_http(request, state.max_body_size).await {
        Ok(call) => call,
        Err(status) => {
            metrics::record_dispatch(status.as_u16(), start_time);
            return status.into_response();
        }
    };

    let root = state.root.load_full();
    let handled = tokio::task::spawn_blocking(move || {
        let cx = Context::new("server").with_parameter("request_id", request_id);
        let mut response = crate::message::Response::new();
        root.handle(&cx, &mut call, &mut response);
        response
    })
    .await;

    match handled {
        Ok(response) => {
            metrics::record_dispatch(response.status().as_u16(), start_time);
            into_http(response)
        }
        Err(e) => {
            tracing::error!(error = %e, "Routing task failed");
            metrics::record_dispatch(500, start_time);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
