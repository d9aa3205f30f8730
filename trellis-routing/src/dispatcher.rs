//! Dispatcher collaborator traits and the in-memory recording dispatcher.
//!
//! The builder never talks to a real HTTP engine. It drives these traits:
//! a [`Dispatcher`] hands out route collections, collections register routes
//! and mount sub-collections under a prefix, and each registration returns a
//! fluent [`RouteHandle`] for attaching handlers, names, asserts, and
//! defaults. [`MemoryDispatcher`] is the reference implementation: it
//! records everything and can flatten the mount tree for inspection, but
//! performs no matching or dispatch.

use indexmap::IndexMap;
use serde_json::Value;
use smol_str::SmolStr;

use crate::handler::{AfterHandler, BeforeHandler};
use crate::http::Method;

/// Fluent configuration surface of one registered route.
pub trait RouteHandle {
    /// Attach a before-handler. Handlers run in attachment order.
    fn before(&mut self, handler: BeforeHandler);

    /// Attach an after-handler. Handlers run in attachment order.
    fn after(&mut self, handler: AfterHandler);

    /// Bind a name the route can be referenced by.
    fn bind(&mut self, name: &str);

    /// Constrain a pattern parameter to a regular expression.
    fn assert(&mut self, param: &str, pattern: &str);

    /// Register a default value for a pattern parameter.
    fn value(&mut self, param: &str, value: Value);
}

/// A set of routes that can be mounted under a prefix.
pub trait RouteCollection: Sized {
    /// The route handle type registrations return.
    type Route: RouteHandle;

    /// Register a route. `None` matches any verb.
    fn route(&mut self, method: Option<Method>, pattern: &str, action: &str) -> &mut Self::Route;

    /// Mount a sub-collection under a prefix, returning the mounted child.
    fn mount(&mut self, prefix: &str, collection: Self) -> &mut Self;
}

/// The external routing engine as seen by the builder.
pub trait Dispatcher {
    /// The collection type routes are registered into.
    type Collection: RouteCollection;

    /// Create a fresh, empty collection (the target of a group body).
    fn new_collection(&mut self) -> Self::Collection;

    /// The top-level collection routes outside any group register into.
    fn root_mut(&mut self) -> &mut Self::Collection;
}

/// A route recorded by the in-memory dispatcher.
#[derive(Debug, Default)]
pub struct MemoryRoute {
    method: Option<Method>,
    pattern: String,
    action: String,
    name: Option<SmolStr>,
    before: Vec<BeforeHandler>,
    after: Vec<AfterHandler>,
    asserts: IndexMap<SmolStr, String>,
    defaults: IndexMap<SmolStr, Value>,
}

impl MemoryRoute {
    /// Registered verb, `None` for match-any.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// Registered pattern, relative to the enclosing collection.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Registered action.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// Bound name, if any.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Attached before-handlers, in attachment order.
    pub fn before_handlers(&self) -> &[BeforeHandler] {
        &self.before
    }

    /// Attached after-handlers, in attachment order.
    pub fn after_handlers(&self) -> &[AfterHandler] {
        &self.after
    }
}

impl RouteHandle for MemoryRoute {
    fn before(&mut self, handler: BeforeHandler) {
        self.before.push(handler);
    }

    fn after(&mut self, handler: AfterHandler) {
        self.after.push(handler);
    }

    fn bind(&mut self, name: &str) {
        self.name = Some(SmolStr::from(name));
    }

    fn assert(&mut self, param: &str, pattern: &str) {
        self.asserts.insert(SmolStr::from(param), pattern.to_string());
    }

    fn value(&mut self, param: &str, value: Value) {
        self.defaults.insert(SmolStr::from(param), value);
    }
}

/// A recorded collection: direct routes plus prefixed sub-collections.
#[derive(Debug, Default)]
pub struct MemoryCollection {
    routes: Vec<MemoryRoute>,
    mounts: Vec<(String, MemoryCollection)>,
}

impl MemoryCollection {
    /// Routes registered directly on this collection.
    pub fn routes(&self) -> &[MemoryRoute] {
        &self.routes
    }

    /// Sub-collections mounted on this collection, with their prefixes.
    pub fn mounts(&self) -> &[(String, MemoryCollection)] {
        &self.mounts
    }

    fn flatten_into(&self, prefix: &str, out: &mut Vec<RegisteredRoute>) {
        for route in &self.routes {
            out.push(RegisteredRoute {
                method: route.method,
                pattern: join_pattern(prefix, &route.pattern),
                action: route.action.clone(),
                name: route.name.clone(),
                before: route.before.clone(),
                after: route.after.clone(),
                asserts: route.asserts.clone(),
                defaults: route.defaults.clone(),
            });
        }
        for (mount_prefix, child) in &self.mounts {
            child.flatten_into(&join_pattern(prefix, mount_prefix), out);
        }
    }
}

impl RouteCollection for MemoryCollection {
    type Route = MemoryRoute;

    fn route(&mut self, method: Option<Method>, pattern: &str, action: &str) -> &mut MemoryRoute {
        let index = self.routes.len();
        self.routes.push(MemoryRoute {
            method,
            pattern: pattern.to_string(),
            action: action.to_string(),
            ..MemoryRoute::default()
        });
        &mut self.routes[index]
    }

    fn mount(&mut self, prefix: &str, collection: Self) -> &mut Self {
        let index = self.mounts.len();
        self.mounts.push((prefix.to_string(), collection));
        &mut self.mounts[index].1
    }
}

/// In-memory dispatcher that records registrations for inspection.
#[derive(Debug, Default)]
pub struct MemoryDispatcher {
    root: MemoryCollection,
}

impl MemoryDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// The top-level collection.
    pub fn root(&self) -> &MemoryCollection {
        &self.root
    }

    /// Flatten the mount tree into registration rows with fully joined
    /// patterns, in registration order.
    pub fn routes(&self) -> Vec<RegisteredRoute> {
        let mut out = Vec::new();
        self.root.flatten_into("", &mut out);
        out
    }

    /// Find a registered route by its bound name.
    pub fn find(&self, name: &str) -> Option<RegisteredRoute> {
        self.routes()
            .into_iter()
            .find(|route| route.name.as_deref() == Some(name))
    }
}

impl Dispatcher for MemoryDispatcher {
    type Collection = MemoryCollection;

    fn new_collection(&mut self) -> MemoryCollection {
        MemoryCollection::default()
    }

    fn root_mut(&mut self) -> &mut MemoryCollection {
        &mut self.root
    }
}

/// A flattened view of one registered route.
#[derive(Debug, Clone)]
pub struct RegisteredRoute {
    /// Registered verb, `None` for match-any.
    pub method: Option<Method>,
    /// Full pattern with all mount prefixes joined in.
    pub pattern: String,
    /// Registered action.
    pub action: String,
    /// Bound name, if any.
    pub name: Option<SmolStr>,
    /// Attached before-handlers, in run order.
    pub before: Vec<BeforeHandler>,
    /// Attached after-handlers, in run order.
    pub after: Vec<AfterHandler>,
    /// Parameter assertions, in registration order.
    pub asserts: IndexMap<SmolStr, String>,
    /// Parameter defaults, in registration order.
    pub defaults: IndexMap<SmolStr, Value>,
}

impl RegisteredRoute {
    /// Names of the attached before-handlers, in run order.
    pub fn before_names(&self) -> Vec<&str> {
        self.before.iter().map(BeforeHandler::name).collect()
    }

    /// Names of the attached after-handlers, in run order.
    pub fn after_names(&self) -> Vec<&str> {
        self.after.iter().map(AfterHandler::name).collect()
    }
}

/// Join a mount prefix and a route pattern into a single path.
pub(crate) fn join_pattern(prefix: &str, pattern: &str) -> String {
    let prefix = prefix.trim_end_matches('/');
    let pattern = pattern.trim_start_matches('/');
    if pattern.is_empty() {
        if prefix.is_empty() {
            "/".to_string()
        } else {
            prefix.to_string()
        }
    } else {
        format!("{prefix}/{pattern}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_join_pattern() {
        assert_eq!(join_pattern("", "/x"), "/x");
        assert_eq!(join_pattern("", "/"), "/");
        assert_eq!(join_pattern("/admin", "/"), "/admin");
        assert_eq!(join_pattern("/admin", "/x"), "/admin/x");
        assert_eq!(join_pattern("/posts", "/page/{page}"), "/posts/page/{page}");
        assert_eq!(join_pattern("/a/", "/b/"), "/a/b/");
    }

    #[test]
    fn test_record_and_flatten() {
        let mut dispatcher = MemoryDispatcher::new();

        let route = dispatcher
            .root_mut()
            .route(Some(Method::Get), "/y", "Ctrl@y");
        route.bind("y");

        let mut child = dispatcher.new_collection();
        child.route(Some(Method::Get), "/x", "Ctrl@x");
        dispatcher.root_mut().mount("/admin", child);

        let routes = dispatcher.routes();
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].pattern, "/y");
        assert_eq!(routes[1].pattern, "/admin/x");
        assert_eq!(routes[1].method, Some(Method::Get));
    }

    #[test]
    fn test_nested_mounts_join_prefixes() {
        let mut dispatcher = MemoryDispatcher::new();

        let mut inner = dispatcher.new_collection();
        inner.route(None, "/ping", "Health@ping");
        let mut outer = dispatcher.new_collection();
        outer.mount("/v1", inner);
        dispatcher.root_mut().mount("/api", outer);

        let routes = dispatcher.routes();
        assert_eq!(routes[0].pattern, "/api/v1/ping");
        assert_eq!(routes[0].method, None);
    }

    #[test]
    fn test_find_by_bound_name() {
        let mut dispatcher = MemoryDispatcher::new();
        dispatcher
            .root_mut()
            .route(Some(Method::Get), "/posts", "PostController@index")
            .bind("posts.index");

        let found = dispatcher.find("posts.index").expect("route should exist");
        assert_eq!(found.action, "PostController@index");
        assert!(dispatcher.find("posts.show").is_none());
    }

    #[test]
    fn test_asserts_and_defaults_preserve_order() {
        let mut dispatcher = MemoryDispatcher::new();
        let route = dispatcher
            .root_mut()
            .route(Some(Method::Get), "/{year}/{month}", "Archive@show");
        route.assert("year", r"\d{4}");
        route.assert("month", r"\d{2}");
        route.value("month", serde_json::json!("01"));

        let routes = dispatcher.routes();
        let keys: Vec<_> = routes[0].asserts.keys().map(SmolStr::as_str).collect();
        assert_eq!(keys, vec!["year", "month"]);
        assert_eq!(routes[0].defaults["month"], serde_json::json!("01"));
    }
}
