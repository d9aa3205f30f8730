//! The migration batch ledger.
//!
//! The ledger records which migration files have been applied, per logical
//! module, in numbered batches. It is loaded from a [`DocumentStore`] at
//! construction, mutated in memory, and flushed with an explicit
//! [`MigrationLedger::save`] call.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{LedgerError, LedgerResult};
use crate::store::DocumentStore;

/// Module name used when the caller does not group migrations.
pub const DEFAULT_MODULE: &str = "main";

/// Default name of the persisted ledger document.
pub const DEFAULT_DOCUMENT: &str = "migrations";

/// Configuration for the migration ledger.
#[derive(Debug, Clone)]
pub struct LedgerConfig {
    /// Name of the persisted ledger document.
    pub document: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            document: DEFAULT_DOCUMENT.to_string(),
        }
    }
}

impl LedgerConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the persisted document name.
    pub fn document(mut self, name: impl Into<String>) -> Self {
        self.document = name.into();
        self
    }
}

/// The persisted ledger document.
///
/// `batch` is the highest batch number recorded anywhere; `batch_module`
/// maps each batch number to the module that owns it; `migrations` maps each
/// module to its batches and their file lists, in apply order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerState {
    batch: u64,
    batch_module: BTreeMap<u64, String>,
    migrations: BTreeMap<String, BTreeMap<u64, Vec<String>>>,
}

impl LedgerState {
    /// Check every structural invariant of the persisted document.
    ///
    /// Violations surface as [`LedgerError::Corrupt`] naming the failed
    /// rule, so a bad document is rejected at load time rather than
    /// mid-operation.
    fn validate(&self) -> LedgerResult<()> {
        let mut highest = 0u64;

        for (module, batches) in &self.migrations {
            let mut seen = BTreeSet::new();
            for (&batch, files) in batches {
                highest = highest.max(batch);
                if files.is_empty() {
                    return Err(LedgerError::corrupt(format!(
                        "batch {batch} of module '{module}' has no recorded files"
                    )));
                }
                match self.batch_module.get(&batch) {
                    Some(owner) if owner == module => {}
                    Some(owner) => {
                        return Err(LedgerError::corrupt(format!(
                            "batch {batch} is recorded under module '{module}' but claimed by '{owner}'"
                        )));
                    }
                    None => {
                        return Err(LedgerError::corrupt(format!(
                            "batch {batch} of module '{module}' is missing from batch_module"
                        )));
                    }
                }
                for file in files {
                    if !seen.insert(file.as_str()) {
                        return Err(LedgerError::corrupt(format!(
                            "file '{file}' is recorded more than once for module '{module}'"
                        )));
                    }
                }
            }
        }

        for (&batch, module) in &self.batch_module {
            highest = highest.max(batch);
            let present = self
                .migrations
                .get(module)
                .and_then(|batches| batches.get(&batch))
                .is_some_and(|files| !files.is_empty());
            if !present {
                return Err(LedgerError::corrupt(format!(
                    "batch_module claims batch {batch} for module '{module}' but no files are recorded"
                )));
            }
        }

        if self.batch != highest {
            return Err(LedgerError::corrupt(format!(
                "batch counter is {} but the highest recorded batch is {highest}",
                self.batch
            )));
        }
        // Batch numbers are allocated sequentially and released one at a
        // time, so a valid ledger covers exactly 1..=batch.
        if self.batch_module.len() as u64 != self.batch {
            return Err(LedgerError::corrupt(format!(
                "batch numbers are not contiguous: counter is {} but {} batches are recorded",
                self.batch,
                self.batch_module.len()
            )));
        }

        Ok(())
    }
}

/// A batch removed by [`MigrationLedger::remove_latest_batch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RolledBackBatch {
    /// The removed batch number.
    pub batch: u64,
    /// The module that owned the batch.
    pub module: String,
    /// The batch's files in rollback order (reverse of apply order).
    pub files: Vec<String>,
}

/// Per-module entry in a [`LedgerStatus`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleStatus {
    /// Module name.
    pub module: String,
    /// Number of batches recorded for the module.
    pub batches: usize,
    /// Number of files recorded for the module.
    pub files: usize,
}

/// Snapshot of the ledger's bookkeeping state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerStatus {
    /// Current batch number.
    pub batch: u64,
    /// Per-module counts.
    pub modules: Vec<ModuleStatus>,
}

impl LedgerStatus {
    /// Total number of migrated files across all modules.
    pub fn total_files(&self) -> usize {
        self.modules.iter().map(|m| m.files).sum()
    }

    /// Get a summary of the status.
    pub fn summary(&self) -> String {
        if self.batch == 0 {
            "No migrations recorded".to_string()
        } else {
            format!(
                "batch {}, {} module(s), {} file(s)",
                self.batch,
                self.modules.len(),
                self.total_files()
            )
        }
    }
}

/// Tracker of applied migration files, grouped into numbered batches.
///
/// Batches advance monotonically: each non-empty [`add_migrations`] call
/// consumes the next batch number, and [`remove_latest_batch`] releases the
/// most recent one. Persistence is explicit via [`save`]; nothing is written
/// on drop.
///
/// Concurrent migration runs against the same persisted document are unsafe:
/// the store interface has no lock or transaction, so the last writer wins.
///
/// [`add_migrations`]: MigrationLedger::add_migrations
/// [`remove_latest_batch`]: MigrationLedger::remove_latest_batch
/// [`save`]: MigrationLedger::save
#[derive(Debug)]
pub struct MigrationLedger<S: DocumentStore> {
    store: S,
    config: LedgerConfig,
    state: LedgerState,
}

impl<S: DocumentStore> MigrationLedger<S> {
    /// Open the ledger under the default document name.
    pub async fn open(store: S) -> LedgerResult<Self> {
        Self::open_with(store, LedgerConfig::default()).await
    }

    /// Open the ledger with an explicit configuration.
    ///
    /// The persisted document is validated eagerly; a document that violates
    /// the batch/module invariants is rejected with [`LedgerError::Corrupt`]
    /// before any operation can observe it. A missing document starts the
    /// ledger empty at batch 0.
    pub async fn open_with(store: S, config: LedgerConfig) -> LedgerResult<Self> {
        let state = match store.load(&config.document).await? {
            Some(document) => {
                let state: LedgerState = serde_json::from_value(document)?;
                state.validate()?;
                state
            }
            None => {
                debug!(document = %config.document, "no persisted ledger, starting empty");
                LedgerState::default()
            }
        };
        info!(document = %config.document, batch = state.batch, "migration ledger opened");
        Ok(Self {
            store,
            config,
            state,
        })
    }

    /// Current batch number (0 when nothing has been migrated).
    pub fn batch(&self) -> u64 {
        self.state.batch
    }

    /// Check whether any batches are recorded.
    pub fn is_empty(&self) -> bool {
        self.state.batch == 0
    }

    /// Modules with recorded migrations, in name order.
    pub fn modules(&self) -> Vec<&str> {
        self.state.migrations.keys().map(String::as_str).collect()
    }

    /// All files recorded for a module, concatenated in ascending batch
    /// order.
    ///
    /// Unknown modules yield an empty list; the read never mutates state.
    pub fn get_migrated(&self, module: &str) -> Vec<String> {
        self.state
            .migrations
            .get(module)
            .map(|batches| batches.values().flatten().cloned().collect())
            .unwrap_or_default()
    }

    /// All files recorded for every module, in global batch order.
    pub fn get_all_migrated(&self) -> Vec<String> {
        let mut files = Vec::new();
        for (batch, module) in &self.state.batch_module {
            if let Some(list) = self
                .state
                .migrations
                .get(module)
                .and_then(|batches| batches.get(batch))
            {
                files.extend(list.iter().cloned());
            }
        }
        files
    }

    /// Filter `files` down to the ones not yet migrated.
    ///
    /// With a module, "migrated" means recorded for that module; without,
    /// recorded anywhere. The result is deduplicated and sorted ascending so
    /// that migrations apply in a deterministic, filename-sorted order.
    pub fn filter_unmigrated<F: AsRef<str>>(
        &self,
        files: &[F],
        module: Option<&str>,
    ) -> Vec<String> {
        let migrated: BTreeSet<String> = match module {
            Some(module) => self.get_migrated(module).into_iter().collect(),
            None => self.get_all_migrated().into_iter().collect(),
        };
        let mut pending: Vec<String> = files
            .iter()
            .map(|file| file.as_ref().to_string())
            .filter(|file| !migrated.contains(file))
            .collect();
        pending.sort();
        pending.dedup();
        pending
    }

    /// Record a new batch of migrations for a module.
    ///
    /// Files already recorded for the module are filtered out first; the
    /// remainder is stored in sorted order under the next batch number,
    /// which is returned. When nothing remains after filtering the ledger is
    /// left untouched and `None` is returned, so batch numbers are never
    /// consumed by a no-op call.
    pub fn add_migrations<F: AsRef<str>>(&mut self, files: &[F], module: &str) -> Option<u64> {
        let pending = self.filter_unmigrated(files, Some(module));
        if pending.is_empty() {
            debug!(module, "all files already migrated, batch number not consumed");
            return None;
        }

        let next = self.state.batch + 1;
        info!(module, batch = next, files = pending.len(), "recording migration batch");
        self.state
            .migrations
            .entry(module.to_string())
            .or_default()
            .insert(next, pending);
        self.state.batch_module.insert(next, module.to_string());
        self.state.batch = next;
        Some(next)
    }

    /// The most recent batch recorded for a module, in rollback order
    /// (reverse of apply order). Empty when the module has no batches.
    pub fn get_latest_migrated(&self, module: &str) -> Vec<String> {
        self.state
            .migrations
            .get(module)
            .and_then(|batches| batches.values().next_back())
            .map(|files| files.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove the most recent batch and release its number.
    ///
    /// Fails with [`LedgerError::NothingToRollback`] at batch 0 and with
    /// [`LedgerError::Corrupt`] when the batch's bookkeeping entries are
    /// missing; corruption is detected before anything is mutated.
    pub fn remove_latest_batch(&mut self) -> LedgerResult<RolledBackBatch> {
        if self.state.batch == 0 {
            return Err(LedgerError::NothingToRollback);
        }
        let batch = self.state.batch;
        let module = match self.state.batch_module.get(&batch) {
            Some(module) => module.clone(),
            None => {
                return Err(LedgerError::corrupt(format!(
                    "batch {batch} is missing from batch_module"
                )));
            }
        };
        let recorded = self
            .state
            .migrations
            .get(&module)
            .is_some_and(|batches| batches.contains_key(&batch));
        if !recorded {
            return Err(LedgerError::corrupt(format!(
                "batch {batch} of module '{module}' has no recorded files"
            )));
        }

        let files = self
            .state
            .migrations
            .get_mut(&module)
            .and_then(|batches| batches.remove(&batch))
            .unwrap_or_default();
        self.state.batch_module.remove(&batch);
        self.state.batch -= 1;

        let files: Vec<String> = files.into_iter().rev().collect();
        info!(module = %module, batch, files = files.len(), "rolled back migration batch");
        Ok(RolledBackBatch {
            batch,
            module,
            files,
        })
    }

    /// Check whether every given file is already recorded, for any module.
    pub fn is_migrated<F: AsRef<str>>(&self, files: &[F]) -> bool {
        let migrated: BTreeSet<String> = self.get_all_migrated().into_iter().collect();
        files.iter().all(|file| migrated.contains(file.as_ref()))
    }

    /// Flush the ledger to the document store.
    ///
    /// Idempotent; intended to be called after each successful batch or
    /// rollback so that process termination between steps cannot lose state.
    /// Store failures propagate to the caller.
    pub async fn save(&self) -> LedgerResult<()> {
        let document = serde_json::to_value(&self.state)?;
        self.store.persist(&self.config.document, &document).await?;
        debug!(document = %self.config.document, batch = self.state.batch, "ledger persisted");
        Ok(())
    }

    /// Get a snapshot of the bookkeeping state.
    pub fn status(&self) -> LedgerStatus {
        let modules = self
            .state
            .migrations
            .iter()
            .map(|(module, batches)| ModuleStatus {
                module: module.clone(),
                batches: batches.len(),
                files: batches.values().map(Vec::len).sum(),
            })
            .collect();
        LedgerStatus {
            batch: self.state.batch,
            modules,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    async fn fresh() -> MigrationLedger<MemoryStore> {
        MigrationLedger::open(MemoryStore::new()).await.unwrap()
    }

    async fn open_document(document: serde_json::Value) -> LedgerResult<MigrationLedger<MemoryStore>> {
        let store = MemoryStore::new();
        store.persist(DEFAULT_DOCUMENT, &document).await.unwrap();
        MigrationLedger::open(store).await
    }

    #[tokio::test]
    async fn test_fresh_ledger_is_empty() {
        let ledger = fresh().await;
        assert_eq!(ledger.batch(), 0);
        assert!(ledger.is_empty());
        assert!(ledger.get_migrated(DEFAULT_MODULE).is_empty());
        assert!(ledger.get_all_migrated().is_empty());
        assert!(ledger.get_latest_migrated(DEFAULT_MODULE).is_empty());
    }

    #[tokio::test]
    async fn test_add_migrations_advances_batch() {
        let mut ledger = fresh().await;

        let batch = ledger.add_migrations(&["b.sql", "a.sql"], "main");
        assert_eq!(batch, Some(1));
        assert_eq!(ledger.batch(), 1);

        // Stored order is the sorted filter output.
        assert_eq!(ledger.get_migrated("main"), vec!["a.sql", "b.sql"]);
        // Rollback order is the reverse of the stored order.
        assert_eq!(ledger.get_latest_migrated("main"), vec!["b.sql", "a.sql"]);
    }

    #[tokio::test]
    async fn test_add_migrations_filters_already_migrated() {
        let mut ledger = fresh().await;
        ledger.add_migrations(&["a.sql"], "main");

        let batch = ledger.add_migrations(&["a.sql", "c.sql", "b.sql"], "main");
        assert_eq!(batch, Some(2));
        assert_eq!(ledger.get_migrated("main"), vec!["a.sql", "b.sql", "c.sql"]);
        assert_eq!(ledger.get_latest_migrated("main"), vec!["c.sql", "b.sql"]);
    }

    #[tokio::test]
    async fn test_no_op_add_does_not_burn_batch_number() {
        let mut ledger = fresh().await;
        ledger.add_migrations(&["a.sql", "b.sql"], "main");
        let before = ledger.get_migrated("main");

        let batch = ledger.add_migrations(&["a.sql", "b.sql"], "main");
        assert_eq!(batch, None);
        assert_eq!(ledger.batch(), 1);
        assert_eq!(ledger.get_migrated("main"), before);
    }

    #[tokio::test]
    async fn test_batches_are_global_across_modules() {
        let mut ledger = fresh().await;
        assert_eq!(ledger.add_migrations(&["m1.sql"], "main"), Some(1));
        assert_eq!(ledger.add_migrations(&["a1.sql"], "auth"), Some(2));
        assert_eq!(ledger.add_migrations(&["m2.sql"], "main"), Some(3));

        assert_eq!(ledger.batch(), 3);
        assert_eq!(ledger.modules(), vec!["auth", "main"]);
        assert_eq!(ledger.get_migrated("main"), vec!["m1.sql", "m2.sql"]);
        // Global order follows batch numbers, not module grouping.
        assert_eq!(
            ledger.get_all_migrated(),
            vec!["m1.sql", "a1.sql", "m2.sql"]
        );
    }

    #[tokio::test]
    async fn test_filter_unmigrated_sorted_and_disjoint() {
        let mut ledger = fresh().await;
        ledger.add_migrations(&["b.sql"], "main");

        let pending =
            ledger.filter_unmigrated(&["d.sql", "b.sql", "c.sql", "c.sql"], Some("main"));
        assert_eq!(pending, vec!["c.sql", "d.sql"]);

        // Global filtering treats every module's files as migrated.
        ledger.add_migrations(&["x.sql"], "auth");
        let pending = ledger.filter_unmigrated(&["x.sql", "y.sql"], None);
        assert_eq!(pending, vec!["y.sql"]);
        // Per-module filtering does not.
        let pending = ledger.filter_unmigrated(&["x.sql", "y.sql"], Some("main"));
        assert_eq!(pending, vec!["x.sql", "y.sql"]);
    }

    #[tokio::test]
    async fn test_remove_latest_batch_undoes_add() {
        let mut ledger = fresh().await;
        ledger.add_migrations(&["a.sql"], "main");
        let before = ledger.get_migrated("main");

        ledger.add_migrations(&["c.sql", "b.sql"], "main");
        let removed = ledger.remove_latest_batch().unwrap();

        assert_eq!(removed.batch, 2);
        assert_eq!(removed.module, "main");
        assert_eq!(removed.files, vec!["c.sql", "b.sql"]);
        assert_eq!(ledger.batch(), 1);
        assert_eq!(ledger.get_migrated("main"), before);

        // The released files count as unmigrated again.
        assert!(!ledger.is_migrated(&["b.sql"]));
        assert_eq!(ledger.add_migrations(&["b.sql"], "main"), Some(2));
    }

    #[tokio::test]
    async fn test_remove_latest_batch_crosses_modules() {
        let mut ledger = fresh().await;
        ledger.add_migrations(&["m1.sql"], "main");
        ledger.add_migrations(&["a1.sql"], "auth");

        let removed = ledger.remove_latest_batch().unwrap();
        assert_eq!(removed.module, "auth");
        assert_eq!(ledger.get_migrated("auth"), Vec::<String>::new());
        assert_eq!(ledger.get_migrated("main"), vec!["m1.sql"]);

        let removed = ledger.remove_latest_batch().unwrap();
        assert_eq!(removed.module, "main");
        assert!(ledger.is_empty());
    }

    #[tokio::test]
    async fn test_rollback_on_empty_ledger_errors() {
        let mut ledger = fresh().await;
        let err = ledger.remove_latest_batch().unwrap_err();
        assert!(matches!(err, LedgerError::NothingToRollback));
    }

    #[tokio::test]
    async fn test_is_migrated_set_containment() {
        let mut ledger = fresh().await;
        ledger.add_migrations(&["a.sql", "b.sql"], "main");

        assert!(ledger.is_migrated(&["a.sql"]));
        assert!(ledger.is_migrated(&["a.sql", "b.sql"]));
        assert!(!ledger.is_migrated(&["a.sql", "c.sql"]));
        // Vacuously true on an empty list.
        assert!(ledger.is_migrated(&Vec::<String>::new()));
    }

    #[tokio::test]
    async fn test_save_and_reopen_round_trip() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut ledger = MigrationLedger::open(store.clone()).await.unwrap();
        ledger.add_migrations(&["b.sql", "a.sql"], "main");
        ledger.add_migrations(&["auth.sql"], "auth");
        ledger.save().await.unwrap();

        let reopened = MigrationLedger::open(store).await.unwrap();
        assert_eq!(reopened.batch(), 2);
        assert_eq!(reopened.get_migrated("main"), vec!["a.sql", "b.sql"]);
        assert_eq!(reopened.get_latest_migrated("auth"), vec!["auth.sql"]);
    }

    #[tokio::test]
    async fn test_persisted_document_shape() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let mut ledger = MigrationLedger::open(store.clone()).await.unwrap();
        ledger.add_migrations(&["a.sql"], "main");
        ledger.save().await.unwrap();

        let document = store.load(DEFAULT_DOCUMENT).await.unwrap().unwrap();
        assert_eq!(
            document,
            json!({
                "batch": 1,
                "batch_module": {"1": "main"},
                "migrations": {"main": {"1": ["a.sql"]}},
            })
        );
    }

    #[tokio::test]
    async fn test_open_rejects_batch_counter_mismatch() {
        let err = open_document(json!({
            "batch": 2,
            "batch_module": {"1": "main"},
            "migrations": {"main": {"1": ["a.sql"]}},
        }))
        .await
        .unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_open_rejects_orphan_batch_module_entry() {
        let err = open_document(json!({
            "batch": 1,
            "batch_module": {"1": "main"},
            "migrations": {},
        }))
        .await
        .unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_open_rejects_empty_batch_file_list() {
        let err = open_document(json!({
            "batch": 1,
            "batch_module": {"1": "main"},
            "migrations": {"main": {"1": []}},
        }))
        .await
        .unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_open_rejects_duplicate_file_in_module() {
        let err = open_document(json!({
            "batch": 2,
            "batch_module": {"1": "main", "2": "main"},
            "migrations": {"main": {"1": ["a.sql"], "2": ["a.sql"]}},
        }))
        .await
        .unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_open_rejects_unclaimed_batch() {
        let err = open_document(json!({
            "batch": 1,
            "batch_module": {"1": "auth"},
            "migrations": {
                "auth": {"1": ["a.sql"]},
                "main": {"1": ["m.sql"]},
            },
        }))
        .await
        .unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_open_rejects_non_contiguous_batches() {
        let err = open_document(json!({
            "batch": 3,
            "batch_module": {"1": "main", "3": "main"},
            "migrations": {"main": {"1": ["a.sql"], "3": ["c.sql"]}},
        }))
        .await
        .unwrap_err();
        assert!(err.is_corruption(), "unexpected error: {err}");
    }

    #[tokio::test]
    async fn test_open_accepts_valid_document() {
        let ledger = open_document(json!({
            "batch": 2,
            "batch_module": {"1": "main", "2": "auth"},
            "migrations": {
                "main": {"1": ["a.sql", "b.sql"]},
                "auth": {"2": ["users.sql"]},
            },
        }))
        .await
        .unwrap();
        assert_eq!(ledger.batch(), 2);
        assert_eq!(ledger.get_all_migrated(), vec!["a.sql", "b.sql", "users.sql"]);
    }

    #[tokio::test]
    async fn test_status_summary() {
        let mut ledger = fresh().await;
        assert_eq!(ledger.status().summary(), "No migrations recorded");

        ledger.add_migrations(&["a.sql", "b.sql"], "main");
        ledger.add_migrations(&["users.sql"], "auth");
        let status = ledger.status();
        assert_eq!(status.batch, 2);
        assert_eq!(status.total_files(), 3);
        assert_eq!(status.summary(), "batch 2, 2 module(s), 3 file(s)");
    }

    #[tokio::test]
    async fn test_config_document_name() {
        let store = std::sync::Arc::new(MemoryStore::new());
        let config = LedgerConfig::new().document("schema_history");
        let mut ledger = MigrationLedger::open_with(store.clone(), config)
            .await
            .unwrap();
        ledger.add_migrations(&["a.sql"], "main");
        ledger.save().await.unwrap();

        assert!(store.contains("schema_history"));
        assert!(!store.contains(DEFAULT_DOCUMENT));
    }
}
