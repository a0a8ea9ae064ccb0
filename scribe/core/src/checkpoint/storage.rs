//! Durable Checkpoint Ledger
//!
//! The persisted form of a [`CheckpointStore`](super::CheckpointStore): an
//! ordered list of checkpoints (newest first) and the redo stack (most recent
//! last), with camelCase field names.
//!
//! ```json
//! {
//!   "checkpoints": [{"id": "...", "path": "...", "originalContent": "...", ...}],
//!   "redoStack": [{"id": "...", "checkpoints": [...], "restoredFrom": "..."}]
//! }
//! ```
//!
//! Storage is a collaborator behind [`CheckpointStorage`]. [`JsonFileStorage`]
//! writes the ledger atomically (temp file in the same directory, then
//! rename).

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

use super::store::{Checkpoint, RedoEntry};

/// Persisted checkpoint history
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckpointLedger {
    /// Checkpoints, newest first
    #[serde(default)]
    pub checkpoints: Vec<Checkpoint>,
    /// Redo entries, most recent last
    #[serde(default)]
    pub redo_stack: Vec<RedoEntry>,
}

/// Errors from ledger storage
#[derive(Error, Debug)]
pub enum StorageError {
    /// Reading or writing the ledger file failed
    #[error("failed to access ledger {path}: {source}")]
    Io {
        /// Ledger path
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The ledger file is not a valid ledger
    #[error("ledger {path} is corrupt: {source}")]
    Corrupt {
        /// Ledger path
        path: PathBuf,
        /// Underlying parse error
        #[source]
        source: serde_json::Error,
    },

    /// The ledger could not be serialized
    #[error("failed to encode ledger: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Storage collaborator for checkpoint history
#[async_trait]
pub trait CheckpointStorage: Send + Sync {
    /// Load the ledger; a missing ledger is empty
    async fn load(&self) -> Result<CheckpointLedger, StorageError>;

    /// Replace the stored ledger
    async fn save(&self, ledger: &CheckpointLedger) -> Result<(), StorageError>;
}

// ============================================================================
// JSON file
// ============================================================================

/// Ledger stored as one pretty-printed JSON file
#[derive(Clone, Debug)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Store the ledger at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Ledger file location
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

#[async_trait]
impl CheckpointStorage for JsonFileStorage {
    async fn load(&self) -> Result<CheckpointLedger, StorageError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no ledger yet");
                return Ok(CheckpointLedger::default());
            }
            Err(e) => return Err(self.io_error(e)),
        };

        if raw.trim().is_empty() {
            return Ok(CheckpointLedger::default());
        }

        serde_json::from_str(&raw).map_err(|source| StorageError::Corrupt {
            path: self.path.clone(),
            source,
        })
    }

    async fn save(&self, ledger: &CheckpointLedger) -> Result<(), StorageError> {
        let encoded = serde_json::to_string_pretty(ledger)?;

        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&parent)
            .await
            .map_err(|e| self.io_error(e))?;

        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .filter(|name| !name.is_empty())
            .unwrap_or("ledger.json");
        let temp_path = parent.join(format!(".{}.{}.tmp", file_name, uuid::Uuid::new_v4()));

        let mut file = tokio::fs::File::create(&temp_path)
            .await
            .map_err(|e| self.io_error(e))?;
        file.write_all(encoded.as_bytes())
            .await
            .map_err(|e| self.io_error(e))?;
        file.sync_all().await.map_err(|e| self.io_error(e))?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(self.io_error(e));
        }

        tracing::debug!(
            path = %self.path.display(),
            checkpoints = ledger.checkpoints.len(),
            redo = ledger.redo_stack.len(),
            "ledger saved"
        );
        Ok(())
    }
}

// ============================================================================
// In-memory
// ============================================================================

/// Ledger kept in memory, for hosts without durable storage and for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    ledger: Mutex<CheckpointLedger>,
    saves: std::sync::atomic::AtomicUsize,
}

impl MemoryStorage {
    /// Start from an existing ledger
    #[must_use]
    pub fn with_ledger(ledger: CheckpointLedger) -> Self {
        Self {
            ledger: Mutex::new(ledger),
            saves: Default::default(),
        }
    }

    /// Number of completed saves
    #[must_use]
    pub fn save_count(&self) -> usize {
        self.saves.load(std::sync::atomic::Ordering::SeqCst)
    }
}

#[async_trait]
impl CheckpointStorage for MemoryStorage {
    async fn load(&self) -> Result<CheckpointLedger, StorageError> {
        Ok(self.ledger.lock().await.clone())
    }

    async fn save(&self, ledger: &CheckpointLedger) -> Result<(), StorageError> {
        *self.ledger.lock().await = ledger.clone();
        self.saves.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}
