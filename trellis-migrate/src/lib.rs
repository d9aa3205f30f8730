//! # trellis-migrate
//!
//! Migration batch ledger for the Trellis micro-framework.
//!
//! This crate provides the bookkeeping half of a schema-migration system:
//! - Tracking which migration files have been applied, per logical module
//! - Batch numbering for grouped apply and rollback
//! - Deterministic, filename-sorted filtering of pending migrations
//! - Flat-file JSON persistence behind a pluggable document store
//!
//! Running the migration files themselves (SQL execution, database
//! connections) is out of scope; an external runner consults the ledger
//! before and after each batch.
//!
//! ## Example
//!
//! ```rust,ignore
//! use trellis_migrate::{JsonFileStore, MigrationLedger, DEFAULT_MODULE};
//!
//! async fn migrate(files: Vec<String>) -> Result<(), trellis_migrate::LedgerError> {
//!     let store = JsonFileStore::new("./migrations/state");
//!     let mut ledger = MigrationLedger::open(store).await?;
//!
//!     let pending = ledger.filter_unmigrated(&files, Some(DEFAULT_MODULE));
//!     // ... run each pending file against the database ...
//!
//!     if ledger.add_migrations(&pending, DEFAULT_MODULE).is_some() {
//!         ledger.save().await?;
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Persisted document
//!
//! The ledger is stored as a single JSON document:
//!
//! ```json
//! {
//!   "batch": 2,
//!   "batch_module": { "1": "main", "2": "auth" },
//!   "migrations": {
//!     "main": { "1": ["001_users.sql", "002_posts.sql"] },
//!     "auth": { "2": ["001_tokens.sql"] }
//!   }
//! }
//! ```
//!
//! The document is validated eagerly when the ledger is opened; structural
//! violations are rejected as [`LedgerError::Corrupt`] instead of surfacing
//! mid-operation.

pub mod error;
pub mod ledger;
pub mod store;

// Re-exports
pub use error::{LedgerError, LedgerResult};
pub use ledger::{
    LedgerConfig, LedgerState, LedgerStatus, MigrationLedger, ModuleStatus, RolledBackBatch,
    DEFAULT_DOCUMENT, DEFAULT_MODULE,
};
pub use store::{DocumentStore, JsonFileStore, MemoryStore};
