//! Selection properties of routers and route lists.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use axum::http::{Method, StatusCode};
use scored_router::handler::Responder;
use scored_router::routing::{Route, RouteList};
use scored_router::{Handler, Request, Response, Router, RoutingMode};

mod common;

fn text(body: &str) -> Arc<dyn Handler> {
    Arc::new(Responder::text(StatusCode::OK, body))
}

fn request(uri: &str) -> Request {
    Request::new(Method::GET, uri).unwrap()
}

fn same(a: &Arc<dyn Route>, b: &Arc<dyn Route>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

#[test]
fn test_items_example() {
    let router = Router::with_mode(RoutingMode::Best);
    let list = router.attach("/items", text("H1")).unwrap();
    let item = router.attach("/items/{id}", text("H2")).unwrap();

    let req = request("http://h/items/42");
    let resp = Response::new();
    let list_score = list.score(&req, &resp);
    assert!((list_score - (0.5 + 0.5 * 6.0 / 9.0)).abs() < 1e-6);
    assert_eq!(item.score(&req, &resp), 1.0);
    assert_eq!(common::body(&common::call(&router, "http://h/items/42")), "H2");

    let other = request("http://h/other");
    assert_eq!(list.score(&other, &resp), 0.0);
    assert_eq!(item.score(&other, &resp), 0.0);
    assert_eq!(
        common::call(&router, "http://h/other").status(),
        StatusCode::NOT_FOUND
    );
}

#[test]
fn test_best_match_monotonicity() {
    let patterns = ["/a", "/a/b", "/a/b/c", "/a/b/c/d"];
    let router = Router::with_mode(RoutingMode::Best);
    // Attach shortest last so list order cannot explain the outcome.
    for pattern in patterns.iter().rev() {
        router.attach(pattern, text(pattern)).unwrap();
    }
    assert_eq!(common::body(&common::call(&router, "http://h/a/b/c/d/e")), "/a/b/c/d");
    assert_eq!(common::body(&common::call(&router, "http://h/a/b/x")), "/a/b");
    assert_eq!(common::body(&common::call(&router, "http://h/a/x")), "/a");
}

/// A route with a constant score.
#[derive(Debug)]
struct Fixed(f32, Arc<dyn Handler>);

impl Route for Fixed {
    fn score(&self, _: &Request, _: &Response) -> f32 {
        self.0
    }

    fn target(&self) -> &Arc<dyn Handler> {
        &self.1
    }
}

#[test]
fn test_threshold_invariant() {
    let list = RouteList::new();
    for score in [0.2, 0.95, 0.4, 0.91, 0.0, 0.89] {
        list.add(Arc::new(Fixed(score, text("x"))));
    }
    let req = request("http://h/");
    let resp = Response::new();

    for required in [0.0, 0.5, 0.9, 0.93, 0.99] {
        for _ in 0..20 {
            let picks = [
                list.get_best(&req, &resp, required),
                list.get_first(&req, &resp, required),
                list.get_last(&req, &resp, required),
                list.get_next(&req, &resp, required),
                list.get_random(&req, &resp, required),
            ];
            for route in picks.into_iter().flatten() {
                assert!(route.score(&req, &resp) >= required);
            }
        }
    }
    assert!(list.get_next(&req, &resp, 0.99).is_none());
    assert!(list.get_random(&req, &resp, 0.99).is_none());

    // A matching template always scores at least the required score.
    let router = Router::new();
    router.set_required_score(0.9);
    let route = router.attach("/long", text("long")).unwrap();
    let score = route.score(&request("http://h/long/path/and/more"), &resp);
    assert!(score >= 0.9 && score < 1.0);
}

#[test]
fn test_round_robin_fairness() {
    let router = Router::with_mode(RoutingMode::Next);
    let names = ["r0", "r1", "r2", "r3"];
    for name in names {
        router.attach("/", text(name)).unwrap();
    }

    let visited: Vec<String> = (0..names.len() + 1)
        .map(|_| common::body(&common::call(&router, "http://h/x")))
        .collect();

    let mut first_round = visited[..names.len()].to_vec();
    first_round.sort();
    assert_eq!(first_round, names);
    assert_eq!(visited[names.len()], visited[0]);
}

#[test]
fn test_selection_idempotence() {
    let router = Router::new();
    router.attach("/a", text("a")).unwrap();
    router.attach("/b", text("b")).unwrap();
    let list = router.routes();
    let resp = Response::new();

    for uri in ["http://h/a/1", "http://h/zzz"] {
        let req = request(uri);
        let best = list.get_best(&req, &resp, 0.5);
        let first = list.get_first(&req, &resp, 0.5);
        let last = list.get_last(&req, &resp, 0.5);
        for _ in 0..10 {
            assert_eq!(
                list.get_best(&req, &resp, 0.5).map(|r| Arc::as_ptr(&r).cast::<()>()),
                best.as_ref().map(|r| Arc::as_ptr(r).cast::<()>())
            );
            assert_eq!(
                list.get_first(&req, &resp, 0.5).is_some(),
                first.is_some()
            );
            assert_eq!(list.get_last(&req, &resp, 0.5).is_some(), last.is_some());
        }
    }
}

#[test]
fn test_random_covers_qualifying_routes() {
    let router = Router::with_mode(RoutingMode::Random);
    router.attach("/", text("one")).unwrap();
    router.attach("/", text("two")).unwrap();
    router.attach("/nope", text("never")).unwrap();

    let mut seen = Vec::new();
    for _ in 0..200 {
        let body = common::body(&common::call(&router, "http://h/x"));
        assert_ne!(body, "never");
        if !seen.contains(&body) {
            seen.push(body);
        }
    }
    seen.sort();
    assert_eq!(seen, ["one", "two"]);
}

#[test]
fn test_concurrent_mutation_safety() {
    let router = Arc::new(Router::with_mode(RoutingMode::Next));
    let stable = router.attach("/", text("stable")).unwrap();
    let stable: Arc<dyn Route> = stable;
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let router = router.clone();
        let stop = stop.clone();
        thread::spawn(move || {
            let mut attached = 0usize;
            loop {
                let target = text("transient");
                router.attach("/", target.clone()).unwrap();
                router.detach(&target);
                attached += 1;
                if stop.load(Ordering::Relaxed) {
                    return attached;
                }
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let router = router.clone();
            thread::spawn(move || {
                // Route tables are read without locks while the writer runs.
                let list = router.routes();
                let req = request("http://h/anything");
                let resp = Response::new();
                for _ in 0..2_000 {
                    let snapshot = list.snapshot();
                    assert!(!snapshot.is_empty());
                    for pick in [
                        list.get_best(&req, &resp, 0.5),
                        list.get_first(&req, &resp, 0.5),
                        list.get_last(&req, &resp, 0.5),
                        list.get_next(&req, &resp, 0.5),
                        list.get_random(&req, &resp, 0.5),
                    ] {
                        assert!(pick.is_some());
                    }
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    assert!(writer.join().unwrap() > 0);

    // Every transient route was detached again.
    let snapshot = router.routes().snapshot();
    assert_eq!(snapshot.len(), 1);
    assert!(same(&snapshot[0], &stable));

    router.attach("/", text("late")).unwrap();
    assert_eq!(router.routes().len(), 2);
}

#[test]
fn test_route_list_empty_is_no_match() {
    let list = RouteList::new();
    let req = request("http://h/");
    let resp = Response::new();
    assert!(list.get_next(&req, &resp, 0.0).is_none());
    assert!(list.get_random(&req, &resp, 0.0).is_none());
}
