//! Declarative routing from request shape to caching strategy.
//!
//! Admission comes first: only same-origin GET requests are ever routed.
//! Admitted requests are matched against an ordered table of
//! `(name, predicate, strategy)` routes; the first match wins.

use crate::{Request, Scope};

/// Caching strategy applied to an admitted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Try the network, fall back to the cache, then to the offline page.
    NetworkFirst,
    /// Serve from cache, fill from the network on a miss.
    CacheFirst,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::NetworkFirst => "network-first",
            Strategy::CacheFirst => "cache-first",
        }
    }
}

/// Predicate over request metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestPredicate {
    /// Top-level navigation.
    Navigation,
    /// `Accept` header mentions `text/html`.
    AcceptsHtml,
    /// Matches every request.
    Any,
    AnyOf(Vec<RequestPredicate>),
}

impl RequestPredicate {
    pub fn matches(&self, request: &Request) -> bool {
        match self {
            RequestPredicate::Navigation => request.is_navigation(),
            RequestPredicate::AcceptsHtml => request.accepts_html(),
            RequestPredicate::Any => true,
            RequestPredicate::AnyOf(preds) => preds.iter().any(|p| p.matches(request)),
        }
    }
}

/// One row of the routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    pub name: String,
    pub predicate: RequestPredicate,
    pub strategy: Strategy,
}

impl Route {
    pub fn new(name: impl Into<String>, predicate: RequestPredicate, strategy: Strategy) -> Self {
        Self { name: name.into(), predicate, strategy }
    }
}

/// Why a request was left to default network handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    NotGet,
    CrossOrigin,
    NoRoute,
    /// No generation is active yet, so nothing controls the page.
    NotControlled,
}

impl PassthroughReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            PassthroughReason::NotGet => "not-get",
            PassthroughReason::CrossOrigin => "cross-origin",
            PassthroughReason::NoRoute => "no-route",
            PassthroughReason::NotControlled => "not-controlled",
        }
    }
}

/// Outcome of routing a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteDecision<'a> {
    Passthrough(PassthroughReason),
    Handle { route: &'a str, strategy: Strategy },
}

/// Ordered routing table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new(routes: Vec<Route>) -> Self {
        Self { routes }
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    pub fn route<'a>(&'a self, scope: &Scope, request: &Request) -> RouteDecision<'a> {
        if !request.is_get() {
            return RouteDecision::Passthrough(PassthroughReason::NotGet);
        }
        if !scope.is_same_origin(&request.url) {
            return RouteDecision::Passthrough(PassthroughReason::CrossOrigin);
        }

        self.routes
            .iter()
            .find(|r| r.predicate.matches(request))
            .map(|r| RouteDecision::Handle { route: r.name.as_str(), strategy: r.strategy })
            .unwrap_or(RouteDecision::Passthrough(PassthroughReason::NoRoute))
    }
}

impl Default for Router {
    /// HTML pages are network-first, everything else cache-first.
    fn default() -> Self {
        Self::new(vec![
            Route::new(
                "pages",
                RequestPredicate::AnyOf(vec![RequestPredicate::Navigation, RequestPredicate::AcceptsHtml]),
                Strategy::NetworkFirst,
            ),
            Route::new("assets", RequestPredicate::Any, Strategy::CacheFirst),
        ])
    }
}
