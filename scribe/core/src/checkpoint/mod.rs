//! Checkpoints
//!
//! Reversible history of AI-driven edits: the in-memory [`CheckpointStore`],
//! its persisted [`CheckpointLedger`] form, and path normalization used to
//! decide whether a checkpoint applies to the open resource.

pub mod path;
pub mod storage;
pub mod store;

pub use path::{file_name, normalize_resource_path, paths_match};
pub use storage::{CheckpointLedger, CheckpointStorage, JsonFileStorage, MemoryStorage, StorageError};
pub use store::{
    Checkpoint, CheckpointStore, RedoEntry, RedoOutcome, RestoreOutcome, DEFAULT_CAPACITY,
};
