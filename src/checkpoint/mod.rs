//! Checkpointing
//!
//! Periodic snapshots of the frontier, plus the pages they account for,
//! written through a storage backend, and the matching restore path used
//! by `--resume`.

mod manager;
mod record;

pub use manager::{CheckpointManager, CheckpointSlot, LoadedCheckpoint};
pub use record::{CheckpointRecord, RECORD_VERSION};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors that can occur while saving or loading checkpoints
#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Failed to encode checkpoint: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("Checkpoint at '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
}
