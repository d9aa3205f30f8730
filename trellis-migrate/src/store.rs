//! Document store collaborators for ledger persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::debug;

use crate::error::{LedgerError, LedgerResult};

/// A named JSON document store.
///
/// The ledger reads and writes a single document through this interface,
/// keyed by a fixed document name. Implementations decide where the document
/// lives; the ledger never touches storage directly.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document by name. Returns `None` when the document has never
    /// been persisted.
    async fn load(&self, name: &str) -> LedgerResult<Option<Value>>;

    /// Persist a document under the given name, replacing any previous
    /// version.
    async fn persist(&self, name: &str, document: &Value) -> LedgerResult<()>;
}

#[async_trait]
impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    async fn load(&self, name: &str) -> LedgerResult<Option<Value>> {
        (**self).load(name).await
    }

    async fn persist(&self, name: &str, document: &Value) -> LedgerResult<()> {
        (**self).persist(name, document).await
    }
}

/// Flat-file document store.
///
/// Each document is a pretty-printed `<name>.json` file under a base
/// directory. The directory is created on first persist; a missing file
/// loads as `None`.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    dir: PathBuf,
}

impl JsonFileStore {
    /// Create a store rooted at the given directory.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Get the base directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn document_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl DocumentStore for JsonFileStore {
    async fn load(&self, name: &str) -> LedgerResult<Option<Value>> {
        let path = self.document_path(name);
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => {
                debug!(path = %path.display(), "loaded ledger document");
                Ok(Some(serde_json::from_str(&raw)?))
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(LedgerError::Io(err)),
        }
    }

    async fn persist(&self, name: &str, document: &Value) -> LedgerResult<()> {
        tokio::fs::create_dir_all(&self.dir).await?;
        let path = self.document_path(name);
        let raw = serde_json::to_string_pretty(document)?;
        tokio::fs::write(&path, raw).await?;
        debug!(path = %path.display(), "persisted ledger document");
        Ok(())
    }
}

/// In-memory document store for tests and ephemeral runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: RwLock<HashMap<String, Value>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check whether a document has been persisted.
    pub fn contains(&self, name: &str) -> bool {
        self.documents.read().contains_key(name)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn load(&self, name: &str) -> LedgerResult<Option<Value>> {
        Ok(self.documents.read().get(name).cloned())
    }

    async fn persist(&self, name: &str, document: &Value) -> LedgerResult<()> {
        self.documents
            .write()
            .insert(name.to_string(), document.clone());
        Ok(())
    }
}
