//! Checkpoint Store
//!
//! Bounded, reversible history of AI-driven edits.
//!
//! # Model
//!
//! ```text
//!   undo list (newest first)          redo stack (most recent last)
//!   ┌────┬────┬────┬────┐             ┌──────────────┬──────────────┐
//!   │ c5 │ c4 │ c3 │ .. │  restore c4 │ R1 {c5, c4}  │ R2 {c3, c2}  │
//!   └────┴────┴────┴────┘  ─────────▶ └──────────────┴──────────────┘
//! ```
//!
//! - `create` prepends, evicts beyond capacity, and clears the redo stack.
//! - `restore(c)` moves `c` and everything newer into one [`RedoEntry`].
//! - `redo(r)` splices the entry's checkpoints back to the front.
//!
//! Every mutation completes before the method returns; no caller ever sees a
//! half-applied restore.

use serde::{Deserialize, Serialize};

use super::path::{file_name, paths_match};
use super::storage::CheckpointLedger;

/// Default number of checkpoints retained
pub const DEFAULT_CAPACITY: usize = 30;

/// One reversible edit to a named resource
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Checkpoint {
    /// Unique id
    pub id: String,
    /// Resource the edit applies to
    pub path: String,
    /// Content before the edit
    pub original_content: String,
    /// Content after the edit
    pub new_content: String,
    /// Human-readable summary
    pub description: String,
    /// User prompt that led to the edit
    #[serde(default)]
    pub trigger_prompt: String,
    /// Creation time, Unix milliseconds
    pub timestamp: i64,
}

impl Checkpoint {
    /// Build a checkpoint with a fresh id and the default description
    pub fn new(
        path: impl Into<String>,
        original_content: impl Into<String>,
        new_content: impl Into<String>,
    ) -> Self {
        let path = path.into();
        let description = format!("AI modified {}", file_name(&path));
        Self {
            id: generate_id(),
            path,
            original_content: original_content.into(),
            new_content: new_content.into(),
            description,
            trigger_prompt: String::new(),
            timestamp: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Override the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Record the prompt that triggered the edit
    pub fn with_trigger_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.trigger_prompt = prompt.into();
        self
    }
}

/// Checkpoints set aside by one restore
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedoEntry {
    /// Unique id
    pub id: String,
    /// Removed checkpoints, newest first
    pub checkpoints: Vec<Checkpoint>,
    /// Id of the checkpoint whose restore created this entry
    pub restored_from: String,
}

impl RedoEntry {
    /// Checkpoint whose `new_content` a redo re-applies
    ///
    /// The newest removed checkpoint on the same resource as the restored one,
    /// which is the content that was active just before the restore.
    #[must_use]
    pub fn target(&self) -> Option<&Checkpoint> {
        let restored = self
            .checkpoints
            .iter()
            .find(|cp| cp.id == self.restored_from)
            .or_else(|| self.checkpoints.last())?;
        self.checkpoints
            .iter()
            .find(|cp| paths_match(&cp.path, &restored.path))
            .or(Some(restored))
    }
}

/// Result of [`CheckpointStore::restore`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// History rewound; `content` is the new active content
    Restored {
        /// The restored checkpoint
        checkpoint: Checkpoint,
        /// Content to apply (the checkpoint's original content)
        content: String,
        /// Id of the redo entry that can undo this restore
        redo_entry_id: String,
    },
    /// No checkpoint with that id (stale UI)
    NotFound,
    /// The checkpoint belongs to a resource other than the active one
    TargetMismatch {
        /// Path the checkpoint applies to
        path: String,
    },
}

/// Result of [`CheckpointStore::redo`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RedoOutcome {
    /// Checkpoints re-applied; `content` is the new active content
    Redone {
        /// Checkpoint whose new content is applied
        checkpoint: Checkpoint,
        /// Content to apply
        content: String,
        /// More recent redo entries re-applied first, in order
        reapplied: Vec<String>,
    },
    /// No redo entry with that id
    NotFound,
    /// The entry belongs to a resource other than the active one
    TargetMismatch {
        /// Path the entry applies to
        path: String,
    },
}

/// Bounded undo list plus redo stack
#[derive(Clone, Debug)]
pub struct CheckpointStore {
    /// Newest first
    checkpoints: Vec<Checkpoint>,
    /// Most recent last
    redo: Vec<RedoEntry>,
    capacity: usize,
}

impl Default for CheckpointStore {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl CheckpointStore {
    /// Create an empty store retaining at most `capacity` checkpoints
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            checkpoints: Vec::new(),
            redo: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Rebuild a store from a persisted ledger
    ///
    /// The undo list is truncated to `capacity`.
    #[must_use]
    pub fn from_ledger(ledger: CheckpointLedger, capacity: usize) -> Self {
        let mut store = Self::new(capacity);
        store.checkpoints = ledger.checkpoints;
        store.redo = ledger.redo_stack;
        store.enforce_capacity();
        store
    }

    /// Snapshot for persistence
    #[must_use]
    pub fn ledger(&self) -> CheckpointLedger {
        CheckpointLedger {
            checkpoints: self.checkpoints.clone(),
            redo_stack: self.redo.clone(),
        }
    }

    /// Record an edit with a fresh checkpoint
    pub fn create(
        &mut self,
        path: impl Into<String>,
        original_content: impl Into<String>,
        new_content: impl Into<String>,
        description: impl Into<String>,
    ) -> &Checkpoint {
        let checkpoint =
            Checkpoint::new(path, original_content, new_content).with_description(description);
        self.record(checkpoint)
    }

    /// Record a prepared checkpoint
    ///
    /// Prepends it, evicts the oldest beyond capacity, and clears the redo
    /// stack.
    pub fn record(&mut self, checkpoint: Checkpoint) -> &Checkpoint {
        self.checkpoints.insert(0, checkpoint);
        self.enforce_capacity();
        if !self.redo.is_empty() {
            tracing::debug!(entries = self.redo.len(), "new checkpoint clears redo stack");
            self.redo.clear();
        }
        &self.checkpoints[0]
    }

    /// Rewind to the state before checkpoint `id`
    ///
    /// `active_path` is the resource currently open; restoring a checkpoint
    /// for any other resource is refused.
    pub fn restore(&mut self, id: &str, active_path: &str) -> RestoreOutcome {
        let Some(index) = self.checkpoints.iter().position(|cp| cp.id == id) else {
            tracing::warn!(checkpoint = %id, "restore of unknown checkpoint");
            return RestoreOutcome::NotFound;
        };

        let path = &self.checkpoints[index].path;
        if !paths_match(path, active_path) {
            tracing::warn!(checkpoint = %id, path = %path, active = %active_path, "restore target mismatch");
            return RestoreOutcome::TargetMismatch { path: path.clone() };
        }

        let removed: Vec<Checkpoint> = self.checkpoints.drain(..=index).collect();
        let checkpoint = removed[index].clone();
        let entry = RedoEntry {
            id: format!("redo-{}", generate_id()),
            checkpoints: removed,
            restored_from: checkpoint.id.clone(),
        };
        let redo_entry_id = entry.id.clone();
        self.redo.push(entry);

        tracing::info!(
            checkpoint = %checkpoint.id,
            redo_entry = %redo_entry_id,
            remaining = self.checkpoints.len(),
            "checkpoint restored"
        );

        RestoreOutcome::Restored {
            content: checkpoint.original_content.clone(),
            checkpoint,
            redo_entry_id,
        }
    }

    /// Re-apply the checkpoints set aside by redo entry `entry_id`
    ///
    /// Entries pushed after it hold older checkpoints, so they are re-applied
    /// first to keep the undo list newest-first.
    pub fn redo(&mut self, entry_id: &str, active_path: &str) -> RedoOutcome {
        let Some(index) = self.redo.iter().position(|e| e.id == entry_id) else {
            tracing::warn!(redo_entry = %entry_id, "redo of unknown entry");
            return RedoOutcome::NotFound;
        };

        let Some(target) = self.redo[index].target().cloned() else {
            tracing::warn!(redo_entry = %entry_id, "redo entry holds no checkpoints");
            self.redo.remove(index);
            return RedoOutcome::NotFound;
        };

        if !paths_match(&target.path, active_path) {
            tracing::warn!(redo_entry = %entry_id, path = %target.path, active = %active_path, "redo target mismatch");
            return RedoOutcome::TargetMismatch { path: target.path };
        }

        let mut reapplied = Vec::new();
        while self.redo.len() > index {
            let Some(entry) = self.redo.pop() else {
                break;
            };
            let mut merged = entry.checkpoints;
            merged.append(&mut self.checkpoints);
            self.checkpoints = merged;
            if entry.id != entry_id {
                reapplied.push(entry.id);
            }
        }
        self.enforce_capacity();

        tracing::info!(
            redo_entry = %entry_id,
            checkpoint = %target.id,
            reapplied = reapplied.len(),
            "redo applied"
        );

        RedoOutcome::Redone {
            content: target.new_content.clone(),
            checkpoint: target,
            reapplied,
        }
    }

    /// Checkpoints, newest first
    #[must_use]
    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Redo entries, most recent last
    #[must_use]
    pub fn redo_entries(&self) -> &[RedoEntry] {
        &self.redo
    }

    /// Look up a checkpoint
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Checkpoint> {
        self.checkpoints.iter().find(|cp| cp.id == id)
    }

    /// Number of retained checkpoints
    #[must_use]
    pub fn len(&self) -> usize {
        self.checkpoints.len()
    }

    /// Whether no checkpoints are retained
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.checkpoints.is_empty()
    }

    /// Maximum retained checkpoints
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all history
    pub fn clear(&mut self) {
        self.checkpoints.clear();
        self.redo.clear();
    }

    fn enforce_capacity(&mut self) {
        if self.checkpoints.len() > self.capacity {
            let evicted = self.checkpoints.len() - self.capacity;
            self.checkpoints.truncate(self.capacity);
            tracing::debug!(evicted, capacity = self.capacity, "evicted oldest checkpoints");
        }
    }
}

/// `<base36 millis><4 hex chars><base36 sequence>`
fn generate_id() -> String {
    use std::sync::atomic::{AtomicU64, Ordering};

    static COUNTER: AtomicU64 = AtomicU64::new(0);
    let count = COUNTER.fetch_add(1, Ordering::SeqCst);
    let millis = u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or_default();
    let salt: [u8; 2] = rand::random();

    format!("{}{}{}", to_base36(millis), hex::encode(salt), to_base36(count))
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8(out).unwrap_or_default()
}
