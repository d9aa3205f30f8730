//! The fluent route builder.
//!
//! [`RouteBuilder`] translates a grouping/prefixing/controller-mapping DSL
//! into calls against a [`Dispatcher`]. Verb methods register immediately;
//! [`group`] stacks before/after handlers, namespace segments, and a fresh
//! mount context around its body; [`resource`] and [`controller`] expand
//! naming conventions into batches of routes.
//!
//! [`group`]: RouteBuilder::group
//! [`resource`]: RouteBuilder::resource
//! [`controller`]: RouteBuilder::controller

use std::sync::Arc;

use indexmap::IndexMap;
use serde_json::Value;
use smol_str::SmolStr;
use tracing::{debug, warn};

use crate::controller::{split_action_name, ControllerRegistry};
use crate::dispatcher::{Dispatcher, RouteCollection, RouteHandle};
use crate::error::{RoutingError, RoutingResult};
use crate::handler::{permission_guard, AfterHandler, BeforeHandler, PermissionChecker};
use crate::http::Method;

/// Route handle type produced by a dispatcher's collections.
pub type RouteOf<D> = <<D as Dispatcher>::Collection as RouteCollection>::Route;

/// One route to register: verb, pattern, action, and per-route options.
///
/// Immutable after construction. `resource` and `controller` generate one
/// per expanded route and consume it on registration.
#[derive(Debug, Clone)]
pub struct RouteMap {
    method: Option<Method>,
    pattern: String,
    action: String,
    options: RouteOptions,
}

impl RouteMap {
    /// Create a route map. `None` matches any verb.
    pub fn new(
        method: Option<Method>,
        pattern: impl Into<String>,
        action: impl Into<String>,
        options: RouteOptions,
    ) -> Self {
        Self {
            method,
            pattern: pattern.into(),
            action: action.into(),
            options,
        }
    }

    /// The route's verb, `None` for match-any.
    pub fn method(&self) -> Option<Method> {
        self.method
    }

    /// The route's pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The route's action reference.
    pub fn action(&self) -> &str {
        &self.action
    }

    /// The route's options.
    pub fn options(&self) -> &RouteOptions {
        &self.options
    }
}

/// Per-route registration options.
#[derive(Debug, Clone, Default)]
pub struct RouteOptions {
    /// Permission required to reach the route; enforced by a guard
    /// before-handler.
    pub permission: Option<SmolStr>,
    /// Route-specific before-handler, run after any group handlers.
    pub before: Option<BeforeHandler>,
    /// Route-specific after-handler, run before any group handlers.
    pub after: Option<AfterHandler>,
    /// Name to bind the route under.
    pub name: Option<SmolStr>,
    /// Parameter assertions, applied in insertion order.
    pub asserts: IndexMap<SmolStr, String>,
    /// Parameter defaults, applied in insertion order.
    pub defaults: IndexMap<SmolStr, Value>,
}

impl RouteOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Require a permission.
    pub fn permission(mut self, permission: impl Into<SmolStr>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    /// Attach a route-specific before-handler.
    pub fn before(mut self, handler: BeforeHandler) -> Self {
        self.before = Some(handler);
        self
    }

    /// Attach a route-specific after-handler.
    pub fn after(mut self, handler: AfterHandler) -> Self {
        self.after = Some(handler);
        self
    }

    /// Bind the route under a name.
    pub fn named(mut self, name: impl Into<SmolStr>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Constrain a pattern parameter to a regular expression.
    pub fn assert(mut self, param: impl Into<SmolStr>, pattern: impl Into<String>) -> Self {
        self.asserts.insert(param.into(), pattern.into());
        self
    }

    /// Register a default value for a pattern parameter.
    pub fn value(mut self, param: impl Into<SmolStr>, value: Value) -> Self {
        self.defaults.insert(param.into(), value);
        self
    }
}

/// Options for a [`RouteBuilder::group`] call. Each present field pushes one
/// stack frame for the duration of the group body.
#[derive(Debug, Clone, Default)]
pub struct GroupOptions {
    /// Before-handler wrapped around every route in the group.
    pub before: Option<BeforeHandler>,
    /// After-handler wrapped around every route in the group.
    pub after: Option<AfterHandler>,
    /// Namespace segment prefixed to every action in the group.
    pub namespace: Option<SmolStr>,
}

impl GroupOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap the group in a before-handler.
    pub fn before(mut self, handler: BeforeHandler) -> Self {
        self.before = Some(handler);
        self
    }

    /// Wrap the group in an after-handler.
    pub fn after(mut self, handler: AfterHandler) -> Self {
        self.after = Some(handler);
        self
    }

    /// Prefix actions in the group with a namespace segment.
    pub fn namespace(mut self, segment: impl Into<SmolStr>) -> Self {
        self.namespace = Some(segment.into());
        self
    }
}

/// Fixed route table expanded by [`RouteBuilder::resource`]:
/// (verb, pattern, action, name suffix).
const RESOURCE_ROUTES: [(Method, &str, &str, &str); 8] = [
    (Method::Get, "/", "index", "index"),
    (Method::Get, "/page/{page}", "index", "paged"),
    (Method::Get, "/create", "create", "create"),
    (Method::Get, "/{id}/edit", "edit", "edit"),
    (Method::Get, "/{id}", "show", "show"),
    (Method::Post, "/", "store", "store"),
    (Method::Put, "/{id}", "update", "update"),
    (Method::Delete, "/{id}", "destroy", "delete"),
];

/// Stateful fluent route builder over a dispatcher.
///
/// The builder keeps four parallel stacks: mount contexts, before-handlers,
/// after-handlers, and namespace segments. [`group`] pushes onto them for
/// the duration of its body and restores them afterwards, on both the
/// success and the error path, so a failing body can never corrupt sibling
/// registrations.
///
/// [`group`]: RouteBuilder::group
pub struct RouteBuilder<D: Dispatcher> {
    dispatcher: D,
    registry: ControllerRegistry,
    permissions: Option<Arc<dyn PermissionChecker>>,
    contexts: Vec<D::Collection>,
    before_stack: Vec<BeforeHandler>,
    after_stack: Vec<AfterHandler>,
    namespace_stack: Vec<SmolStr>,
}

impl<D: Dispatcher> RouteBuilder<D> {
    /// Create a builder over a dispatcher.
    pub fn new(dispatcher: D) -> Self {
        Self {
            dispatcher,
            registry: ControllerRegistry::new(),
            permissions: None,
            contexts: Vec::new(),
            before_stack: Vec::new(),
            after_stack: Vec::new(),
            namespace_stack: Vec::new(),
        }
    }

    /// Replace the controller registry.
    pub fn with_registry(mut self, registry: ControllerRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Set the permission checker consulted by permission guards.
    pub fn with_permission_checker(mut self, checker: impl PermissionChecker + 'static) -> Self {
        self.permissions = Some(Arc::new(checker));
        self
    }

    /// The controller registry, for incremental registration.
    pub fn registry_mut(&mut self) -> &mut ControllerRegistry {
        &mut self.registry
    }

    /// The underlying dispatcher.
    pub fn dispatcher(&self) -> &D {
        &self.dispatcher
    }

    /// Consume the builder and return the dispatcher.
    pub fn into_dispatcher(self) -> D {
        self.dispatcher
    }

    /// Register a `GET` route.
    pub fn get(&mut self, pattern: &str, action: &str, options: RouteOptions) -> &mut RouteOf<D> {
        self.register(RouteMap::new(Some(Method::Get), pattern, action, options))
    }

    /// Register a `POST` route.
    pub fn post(&mut self, pattern: &str, action: &str, options: RouteOptions) -> &mut RouteOf<D> {
        self.register(RouteMap::new(Some(Method::Post), pattern, action, options))
    }

    /// Register a `PUT` route.
    pub fn put(&mut self, pattern: &str, action: &str, options: RouteOptions) -> &mut RouteOf<D> {
        self.register(RouteMap::new(Some(Method::Put), pattern, action, options))
    }

    /// Register a `DELETE` route.
    pub fn delete(&mut self, pattern: &str, action: &str, options: RouteOptions) -> &mut RouteOf<D> {
        self.register(RouteMap::new(Some(Method::Delete), pattern, action, options))
    }

    /// Register a `PATCH` route.
    pub fn patch(&mut self, pattern: &str, action: &str, options: RouteOptions) -> &mut RouteOf<D> {
        self.register(RouteMap::new(Some(Method::Patch), pattern, action, options))
    }

    /// Register a route matching any verb.
    pub fn any(&mut self, pattern: &str, action: &str, options: RouteOptions) -> &mut RouteOf<D> {
        self.register(RouteMap::new(None, pattern, action, options))
    }

    /// Register a prepared route map against the current mount context.
    ///
    /// The action is prefixed with the active namespace, then the route
    /// receives, in order: the permission guard, the group before-stack
    /// (outer to inner), the route-level before-handler, the route-level
    /// after-handler, the group after-stack (inner to outer), the bound
    /// name, and the parameter asserts and defaults.
    pub fn register(&mut self, map: RouteMap) -> &mut RouteOf<D> {
        let RouteMap {
            method,
            pattern,
            action,
            options,
        } = map;
        let action = self.qualify_action(&action);

        let guard = options.permission.as_deref().map(|permission| {
            if self.permissions.is_none() {
                warn!(
                    permission,
                    pattern = %pattern,
                    "permission option used without a configured checker; denying all requests"
                );
            }
            permission_guard(permission, self.permissions.clone())
        });
        let stack_before = self.before_stack.clone();
        let stack_after = self.after_stack.clone();

        debug!(method = ?method, pattern = %pattern, action = %action, "registering route");
        let route = match self.contexts.last_mut() {
            Some(context) => context.route(method, &pattern, &action),
            None => self.dispatcher.root_mut().route(method, &pattern, &action),
        };

        if let Some(guard) = guard {
            route.before(guard);
        }
        for handler in stack_before {
            route.before(handler);
        }
        if let Some(handler) = options.before {
            route.before(handler);
        }
        if let Some(handler) = options.after {
            route.after(handler);
        }
        for handler in stack_after.into_iter().rev() {
            route.after(handler);
        }
        if let Some(name) = options.name {
            route.bind(name.as_str());
        }
        for (param, pattern) in options.asserts {
            route.assert(&param, &pattern);
        }
        for (param, value) in options.defaults {
            route.value(&param, value);
        }
        route
    }

    /// Run `body` against a fresh mount context and mount the result under
    /// `prefix` on the enclosing context.
    ///
    /// Present options push one frame each (before, after, namespace) for
    /// the duration of the body. All frames and the context are popped in
    /// strict reverse push order before this method returns, also when the
    /// body fails; the body's error is then propagated and nothing is
    /// mounted.
    pub fn group<F>(
        &mut self,
        prefix: &str,
        options: GroupOptions,
        body: F,
    ) -> RoutingResult<&mut D::Collection>
    where
        F: FnOnce(&mut Self) -> RoutingResult<()>,
    {
        let GroupOptions {
            before,
            after,
            namespace,
        } = options;

        let pushed_before = before.is_some();
        if let Some(handler) = before {
            self.before_stack.push(handler);
        }
        let pushed_after = after.is_some();
        if let Some(handler) = after {
            self.after_stack.push(handler);
        }
        let pushed_namespace = namespace.is_some();
        if let Some(segment) = namespace {
            self.namespace_stack.push(segment);
        }
        let fresh = self.dispatcher.new_collection();
        self.contexts.push(fresh);
        debug!(prefix, "entering route group");

        let outcome = body(self);

        // Frames are released in strict reverse push order, on the error
        // path as well, so sibling registrations see the builder unchanged.
        let child = self.contexts.pop();
        if pushed_namespace {
            self.namespace_stack.pop();
        }
        if pushed_after {
            self.after_stack.pop();
        }
        if pushed_before {
            self.before_stack.pop();
        }

        outcome?;
        let child = child.ok_or(RoutingError::ContextUnderflow)?;
        let parent = match self.contexts.last_mut() {
            Some(context) => context,
            None => self.dispatcher.root_mut(),
        };
        debug!(prefix, "mounting route group");
        Ok(parent.mount(prefix, child))
    }

    /// Register the eight conventional REST routes for a controller,
    /// mounted together under `prefix`.
    ///
    /// | verb   | pattern        | action    | name suffix |
    /// |--------|----------------|-----------|-------------|
    /// | GET    | `/`            | `index`   | `index`     |
    /// | GET    | `/page/{page}` | `index`   | `paged`     |
    /// | GET    | `/create`      | `create`  | `create`    |
    /// | GET    | `/{id}/edit`   | `edit`    | `edit`      |
    /// | GET    | `/{id}`        | `show`    | `show`      |
    /// | POST   | `/`            | `store`   | `store`     |
    /// | PUT    | `/{id}`        | `update`  | `update`    |
    /// | DELETE | `/{id}`        | `destroy` | `delete`    |
    ///
    /// Routes are bound as `{options.name}.{suffix}` when a name is given;
    /// the remaining option fields propagate to all eight routes. Fails when
    /// the controller is not registered.
    pub fn resource(
        &mut self,
        prefix: &str,
        controller: &str,
        options: RouteOptions,
    ) -> RoutingResult<&mut D::Collection> {
        let controller = self.registry.resolve(controller)?.name().to_string();
        let maps: Vec<RouteMap> = RESOURCE_ROUTES
            .iter()
            .map(|(method, pattern, action, suffix)| {
                let mut route_options = options.clone();
                route_options.name = options
                    .name
                    .as_ref()
                    .map(|name| SmolStr::from(format!("{name}.{suffix}")));
                RouteMap::new(
                    Some(*method),
                    *pattern,
                    format!("{controller}@{action}"),
                    route_options,
                )
            })
            .collect();

        debug!(prefix, controller = %controller, "expanding resource routes");
        self.group(prefix, GroupOptions::new(), move |builder| {
            for map in maps {
                builder.register(map);
            }
            Ok(())
        })
    }

    /// Expand a controller blueprint's actions into routes, mounted
    /// together under `prefix`.
    ///
    /// Each action name is split at its first uppercase boundary; a
    /// recognized verb prefix selects the route's verb, otherwise the route
    /// matches any verb. The snake-cased action name becomes the pattern
    /// (`index` maps to `/`), each declared parameter appends a `/{param}`
    /// segment, and declared defaults are registered on the route. Actions
    /// with a leading underscore are skipped. Fails when the controller is
    /// not registered.
    pub fn controller(
        &mut self,
        prefix: &str,
        controller: &str,
        options: RouteOptions,
    ) -> RoutingResult<&mut D::Collection> {
        let blueprint = self.registry.resolve(controller)?;
        let controller = blueprint.name().to_string();

        let mut maps = Vec::new();
        for action in blueprint.actions() {
            if action.name().starts_with('_') {
                continue;
            }
            let split = split_action_name(action.name());
            let mut pattern = if split.action == "index" {
                String::from("/")
            } else {
                format!("/{}", split.action)
            };
            let mut route_options = options.clone();
            route_options.name = options
                .name
                .as_ref()
                .map(|name| SmolStr::from(format!("{name}.{}", split.action)));
            for param in action.params() {
                if pattern.ends_with('/') {
                    pattern.pop();
                }
                pattern.push_str(&format!("/{{{}}}", param.name()));
                if let Some(default) = param.default() {
                    route_options
                        .defaults
                        .insert(SmolStr::from(param.name()), default.clone());
                }
            }
            maps.push(RouteMap::new(
                split.method,
                pattern,
                format!("{controller}@{}", action.name()),
                route_options,
            ));
        }

        debug!(prefix, controller = %controller, routes = maps.len(), "expanding controller routes");
        self.group(prefix, GroupOptions::new(), move |builder| {
            for map in maps {
                builder.register(map);
            }
            Ok(())
        })
    }

    /// Prefix an action with the active namespace path.
    fn qualify_action(&self, action: &str) -> String {
        let path: Vec<&str> = self
            .namespace_stack
            .iter()
            .map(|segment| segment.as_str().trim_matches(':'))
            .filter(|segment| !segment.is_empty())
            .collect();
        if path.is_empty() {
            action.to_string()
        } else {
            format!("{}::{action}", path.join("::"))
        }
    }
}
