//! # Trellis
//!
//! A micro-framework core: fluent route building atop a pluggable
//! dispatcher, and a flat-file migration batch ledger.
//!
//! Trellis deliberately stops at the bookkeeping layer. Routes are built and
//! registered through collaborator traits an HTTP engine implements;
//! migration batches are tracked in a JSON document an external runner
//! consults. Parsing, matching, dispatch, and database execution all live
//! outside this crate.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trellis::prelude::*;
//!
//! // Route building
//! let mut routes = RouteBuilder::new(MemoryDispatcher::new());
//! routes.get("/", "HomeController@index", RouteOptions::new().named("home"));
//! routes.group(
//!     "/admin",
//!     GroupOptions::new().namespace("Admin"),
//!     |routes| {
//!         routes.resource("/posts", "PostController", RouteOptions::new().named("posts"))?;
//!         Ok(())
//!     },
//! )?;
//!
//! // Migration tracking
//! let mut ledger = MigrationLedger::open(JsonFileStore::new("./migrations/state")).await?;
//! if ledger.add_migrations(&["001_users.sql"], DEFAULT_MODULE).is_some() {
//!     ledger.save().await?;
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// Route building DSL and dispatcher collaborator traits.
pub mod routing {
    pub use trellis_routing::*;
}

/// Migration batch ledger and document store collaborators.
pub mod migrate {
    pub use trellis_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{
        DocumentStore, JsonFileStore, LedgerConfig, LedgerError, MemoryStore, MigrationLedger,
        DEFAULT_MODULE,
    };
    pub use crate::routing::{
        AfterHandler, BeforeHandler, ControllerRegistry, GroupOptions, MemoryDispatcher, Method,
        PermissionChecker, RouteBuilder, RouteOptions, RoutingError,
    };
}

// Re-export key types at the crate root
pub use migrate::{LedgerError, MigrationLedger};
pub use routing::{RouteBuilder, RoutingError};
