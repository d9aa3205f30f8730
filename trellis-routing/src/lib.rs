//! # trellis-routing
//!
//! Fluent route-building DSL for the Trellis micro-framework.
//!
//! This crate provides:
//! - A [`RouteBuilder`] that stacks before/after handlers, namespace
//!   segments, and mount contexts around a grouping DSL
//! - REST-ful `resource` expansion and convention-based `controller`
//!   expansion from explicit blueprints
//! - Permission-guarded routes backed by a pluggable [`PermissionChecker`]
//! - Collaborator traits for the underlying routing engine, plus an
//!   in-memory recording implementation
//!
//! Pattern matching and request dispatch belong to the external engine
//! behind the [`Dispatcher`] traits; this crate only builds and registers
//! routes.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis_routing::{
//!     BeforeHandler, GroupOptions, MemoryDispatcher, RouteBuilder, RouteOptions,
//! };
//!
//! let mut builder = RouteBuilder::new(MemoryDispatcher::new())
//!     .with_permission_checker(|permission: &str| permission != "admin.nuke");
//!
//! builder.get("/", "HomeController@index", RouteOptions::new().named("home"));
//!
//! builder.group(
//!     "/admin",
//!     GroupOptions::new()
//!         .before(BeforeHandler::new("auth", |request| { /* ... */ None }))
//!         .namespace("Admin"),
//!     |routes| {
//!         routes.get("/dashboard", "DashboardController@show", RouteOptions::new());
//!         routes.resource("/posts", "PostController", RouteOptions::new().named("posts"))?;
//!         Ok(())
//!     },
//! )?;
//! ```

pub mod builder;
pub mod controller;
pub mod dispatcher;
pub mod error;
pub mod handler;
pub mod http;

// Re-exports
pub use builder::{GroupOptions, RouteBuilder, RouteMap, RouteOf, RouteOptions};
pub use controller::{
    ActionSpec, ControllerBlueprint, ControllerRegistry, ParamSpec, TableBlueprint,
};
pub use dispatcher::{
    Dispatcher, MemoryCollection, MemoryDispatcher, MemoryRoute, RegisteredRoute, RouteCollection,
    RouteHandle,
};
pub use error::{RoutingError, RoutingResult};
pub use handler::{
    AfterHandler, AllowAll, BeforeHandler, PermissionChecker, ACCESS_DENIED_BODY,
};
pub use http::{Method, Request, Response};
