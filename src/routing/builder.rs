//! Route tree construction from configuration.
//!
//! ```text
//! AppConfig
//!     → one VirtualHost per [[hosts]] entry, in order
//!     → default VirtualHost holding [[routes]] and default_route
//!     → server Router (First) over HostRoutes
//! ```

use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;

use crate::config::schema::{
    AppConfig, ExtractSource, RouteConfig, RouterConfig, TargetConfig,
};
use crate::error::RoutingError;
use crate::handler::{Handler, Redirector, Responder};
use crate::routing::router::Router;
use crate::routing::virtual_host::{host_router, VirtualHost};

/// Build the server-level router described by `config`.
pub fn from_config(config: &AppConfig) -> Result<Router, RoutingError> {
    let mut hosts = Vec::with_capacity(config.hosts.len());
    for (i, host_config) in config.hosts.iter().enumerate() {
        let host = VirtualHost::with_host(
            host_config.name.as_str(),
            &host_config.domain,
            &host_config.port,
            &host_config.scheme,
        )?;
        let location = format!("hosts[{i}]");
        populate(
            &host,
            &config.router,
            &location,
            &host_config.routes,
            host_config.default_route.as_ref(),
        )?;
        hosts.push(Arc::new(host));
    }

    let default_host = VirtualHost::new("default");
    populate(
        &default_host,
        &config.router,
        "",
        &config.routes,
        config.default_route.as_ref(),
    )?;

    tracing::info!(
        hosts = hosts.len(),
        routes = config.routes.len(),
        routing_mode = %config.router.routing_mode,
        "Route tree built"
    );
    host_router(hosts, Some(Arc::new(default_host)))
}

/// Apply selection settings to a router.
pub fn configure(router: &Router, config: &RouterConfig) {
    let settings = router.settings();
    settings.set_routing_mode(config.routing_mode);
    settings.set_required_score(config.required_score);
    settings.set_matching_query(config.matching_query);
    settings.set_max_attempts(config.max_attempts);
    settings.set_retry_delay(Duration::from_millis(config.retry_delay_ms));
}

fn populate(
    host: &VirtualHost,
    router_config: &RouterConfig,
    prefix: &str,
    routes: &[RouteConfig],
    default_route: Option<&TargetConfig>,
) -> Result<(), RoutingError> {
    configure(host.router(), router_config);

    for (i, route_config) in routes.iter().enumerate() {
        let location = if prefix.is_empty() {
            format!("routes[{i}]")
        } else {
            format!("{prefix}.routes[{i}]")
        };
        let target = target(&location, &route_config.target)?;
        let mode = route_config
            .matching
            .unwrap_or_else(|| host.router().settings().default_matching_mode());

        let mut route = host.route(&route_config.pattern, target, mode)?;
        for extract in &route_config.extract {
            let parameter = extract.parameter.as_deref().unwrap_or(&extract.attribute);
            route = match extract.source {
                ExtractSource::Query => route.extract_query(&extract.attribute, parameter, extract.first),
                ExtractSource::Cookie => route.extract_cookie(&extract.attribute, parameter, extract.first),
                ExtractSource::Entity => route.extract_entity(&extract.attribute, parameter, extract.first),
            };
        }
        for check in &route_config.validate {
            route = route.validate(&check.attribute, check.required, check.format.as_deref())?;
        }

        let route = Arc::new(route);
        if route_config.first {
            host.router().routes().add_first(route);
        } else {
            host.router().attach_route(route);
        }
    }

    if let Some(target_config) = default_route {
        let location = if prefix.is_empty() {
            "default_route".to_string()
        } else {
            format!("{prefix}.default_route")
        };
        host.attach_default(target(&location, target_config)?)?;
    }
    Ok(())
}

fn target(location: &str, config: &TargetConfig) -> Result<Arc<dyn Handler>, RoutingError> {
    match (&config.respond, &config.redirect) {
        (Some(respond), None) => {
            let status = StatusCode::from_u16(respond.status).map_err(|e| {
                RoutingError::InvalidTarget {
                    location: location.to_string(),
                    reason: e.to_string(),
                }
            })?;
            let responder = Responder::new(status, &respond.body, respond.content_type.as_str());
            Ok(Arc::new(responder))
        }
        (None, Some(redirect)) => Ok(Arc::new(Redirector::new(&redirect.location, redirect.kind)?)),
        _ => Err(RoutingError::InvalidTarget {
            location: location.to_string(),
            reason: "exactly one of `respond` or `redirect` must be set".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::handler::Context;
    use crate::message::{Request, Response};
    use crate::routing::router::RoutingMode;
    use axum::http::{header, HeaderValue, Method};

    fn call(router: &Router, uri: &str, host: Option<&'static str>) -> Response {
        let mut req = Request::new(Method::GET, uri).unwrap();
        if let Some(h) = host {
            req.headers_mut().insert(header::HOST, HeaderValue::from_static(h));
        }
        let mut resp = Response::new();
        router.handle(&Context::new("server"), &mut req, &mut resp);
        resp
    }

    fn body(resp: &Response) -> &str {
        resp.entity().map_or("", |e| e.body.as_str())
    }

    #[test]
    fn test_builds_hosts_and_routes() {
        let config = parse_config(
            r#"
            [[routes]]
            pattern = "/items"
            respond = { body = "list" }

            [[routes]]
            pattern = "/items/{id}"
            respond = { body = "item {id}" }

            [[routes]]
            pattern = "/old"
            redirect = { location = "/new{rrp}", kind = "permanent" }

            [[hosts]]
            name = "api"
            domain = "api\\.example\\.com"

            [[hosts.routes]]
            pattern = "/search"
            respond = { body = "results for {q}" }

            [[hosts.routes.extract]]
            attribute = "q"
            source = "query"
            first = false

            [default_route]
            respond = { status = 404, body = "nothing here" }
            "#,
        )
        .unwrap();
        let router = from_config(&config).unwrap();
        assert_eq!(router.routing_mode(), RoutingMode::First);

        assert_eq!(body(&call(&router, "http://h/items/42", None)), "item 42");
        assert_eq!(body(&call(&router, "http://h/items", None)), "list");

        let resp = call(&router, "http://h/old/page", None);
        assert_eq!(resp.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(resp.location(), Some("/new/page"));

        let resp = call(&router, "http://h/search?q=a&q=b", Some("api.example.com"));
        assert_eq!(body(&resp), "results for a,b");

        let resp = call(&router, "http://h/missing", None);
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body(&resp), "nothing here");
    }

    #[test]
    fn test_first_routes_take_priority() {
        let config = parse_config(
            r#"
            [router]
            routing_mode = "first"

            [[routes]]
            pattern = "/a"
            respond = { body = "declared" }

            [[routes]]
            pattern = "/a"
            first = true
            respond = { body = "override" }
            "#,
        )
        .unwrap();
        let router = from_config(&config).unwrap();
        assert_eq!(body(&call(&router, "http://h/a", None)), "override");
    }

    #[test]
    fn test_validation_answers_400() {
        let config = parse_config(
            r#"
            [[routes]]
            pattern = "/orders"
            respond = { body = "order {id}" }

            [[routes.extract]]
            attribute = "id"
            source = "query"

            [[routes.validate]]
            attribute = "id"
            required = true
            format = "[0-9]+"
            "#,
        )
        .unwrap();
        let router = from_config(&config).unwrap();
        assert_eq!(body(&call(&router, "http://h/orders?id=7", None)), "order 7");
        assert_eq!(
            call(&router, "http://h/orders?id=x", None).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            call(&router, "http://h/orders", None).status(),
            StatusCode::BAD_REQUEST
        );
    }

    #[test]
    fn test_json_bodies_are_served() {
        let config = parse_config(
            r#"
            [[routes]]
            pattern = "/health/{node}"
            respond = { body = '{"status":"up","node":"{node}"}', content_type = "application/json" }
            "#,
        )
        .unwrap();
        let router = from_config(&config).unwrap();
        let resp = call(&router, "http://h/health/n1", None);
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body(&resp), r#"{"status":"up","node":"n1"}"#);
        assert_eq!(resp.entity().unwrap().content_type, "application/json");
    }

    #[test]
    fn test_invalid_target() {
        let mut config = AppConfig::default();
        config.default_route = Some(TargetConfig::default());
        assert!(matches!(
            from_config(&config),
            Err(RoutingError::InvalidTarget { .. })
        ));
    }
}
