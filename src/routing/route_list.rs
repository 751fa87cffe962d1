//! Snapshot-isolated route table.
//!
//! Readers load the current `Arc<Vec<_>>` and work on it without locking;
//! writers build a new vector and swap it in. A selection in progress keeps
//! the snapshot it loaded, so it never observes a half-applied mutation.
//!
//! The round-robin cursor is the only mutable state shared by readers. It is
//! advanced with compare-and-swap, which keeps it in range when the list
//! shrinks but gives no strict per-call ordering under contention: each
//! route gets an approximately equal share of turns over time.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use rand::Rng;

use crate::handler::{same_handler, Handler};
use crate::message::{Request, Response};
use crate::routing::route::Route;

pub type Routes = Vec<Arc<dyn Route>>;

/// Ordered, concurrently mutable list of routes.
#[derive(Debug)]
pub struct RouteList {
    routes: ArcSwap<Routes>,
    next_index: AtomicUsize,
}

impl Default for RouteList {
    fn default() -> Self {
        Self::new()
    }
}

fn same_route(a: &Arc<dyn Route>, b: &Arc<dyn Route>) -> bool {
    Arc::as_ptr(a).cast::<()>() == Arc::as_ptr(b).cast::<()>()
}

impl RouteList {
    pub fn new() -> Self {
        Self {
            routes: ArcSwap::from_pointee(Vec::new()),
            next_index: AtomicUsize::new(0),
        }
    }

    /// The current routes. Later mutations do not affect the returned value.
    pub fn snapshot(&self) -> Arc<Routes> {
        self.routes.load_full()
    }

    pub fn len(&self) -> usize {
        self.routes.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.load().is_empty()
    }

    pub fn add(&self, route: Arc<dyn Route>) {
        self.routes.rcu(|routes| {
            let mut next = Vec::clone(routes);
            next.push(Arc::clone(&route));
            next
        });
    }

    /// Add a route ahead of every existing one.
    pub fn add_first(&self, route: Arc<dyn Route>) {
        self.insert(0, route);
    }

    /// Insert at `index`, clamped to the list length.
    pub fn insert(&self, index: usize, route: Arc<dyn Route>) {
        self.routes.rcu(|routes| {
            let mut next = Vec::clone(routes);
            next.insert(index.min(next.len()), Arc::clone(&route));
            next
        });
    }

    /// Remove one route instance. Returns whether it was present.
    pub fn remove(&self, route: &Arc<dyn Route>) -> bool {
        self.retain(|r| !same_route(r, route)) > 0
    }

    /// Remove every route leading to `target`. Returns the number removed.
    pub fn remove_all(&self, target: &Arc<dyn Handler>) -> usize {
        self.retain(|r| !same_handler(r.target(), target))
    }

    /// Keep only the routes satisfying `keep`. Returns the number removed.
    pub fn retain<F>(&self, keep: F) -> usize
    where
        F: Fn(&Arc<dyn Route>) -> bool,
    {
        let previous = self.routes.rcu(|routes| {
            routes
                .iter()
                .filter(|r| keep(r))
                .cloned()
                .collect::<Routes>()
        });
        previous.iter().filter(|r| !keep(r)).count()
    }

    pub fn clear(&self) {
        self.routes.store(Arc::new(Vec::new()));
    }

    /// Highest-scoring route meeting `required_score`; the first one wins ties.
    pub fn get_best(
        &self,
        request: &Request,
        response: &Response,
        required_score: f32,
    ) -> Option<Arc<dyn Route>> {
        let routes = self.routes.load();
        let mut best: Option<&Arc<dyn Route>> = None;
        let mut best_score = 0.0f32;

        for route in routes.iter() {
            let score = route.score(request, response);
            if score > best_score && score >= required_score {
                best_score = score;
                best = Some(route);
            }
        }
        best.cloned()
    }

    pub fn get_first(
        &self,
        request: &Request,
        response: &Response,
        required_score: f32,
    ) -> Option<Arc<dyn Route>> {
        self.routes
            .load()
            .iter()
            .find(|r| r.score(request, response) >= required_score)
            .cloned()
    }

    pub fn get_last(
        &self,
        request: &Request,
        response: &Response,
        required_score: f32,
    ) -> Option<Arc<dyn Route>> {
        self.routes
            .load()
            .iter()
            .rev()
            .find(|r| r.score(request, response) >= required_score)
            .cloned()
    }

    /// Round-robin: try each position at most once, starting after the
    /// route handed out by the previous call.
    pub fn get_next(
        &self,
        request: &Request,
        response: &Response,
        required_score: f32,
    ) -> Option<Arc<dyn Route>> {
        let routes = self.routes.load();
        let len = routes.len();

        for _ in 0..len {
            let route = &routes[self.advance(len)];
            if route.score(request, response) >= required_score {
                return Some(Arc::clone(route));
            }
        }
        None
    }

    /// Scan once around the list from a random start.
    pub fn get_random(
        &self,
        request: &Request,
        response: &Response,
        required_score: f32,
    ) -> Option<Arc<dyn Route>> {
        let routes = self.routes.load();
        let len = routes.len();
        if len == 0 {
            return None;
        }

        let start = rand::thread_rng().gen_range(0..len);
        (0..len)
            .map(|i| &routes[(start + i) % len])
            .find(|r| r.score(request, response) >= required_score)
            .cloned()
    }

    /// Claim the cursor position and move it one step forward.
    fn advance(&self, len: usize) -> usize {
        let mut current = self.next_index.load(Ordering::Relaxed);
        loop {
            let index = current % len;
            match self.next_index.compare_exchange_weak(
                current,
                (index + 1) % len,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => return index,
                Err(actual) => current = actual,
            }
        }
    }
}
