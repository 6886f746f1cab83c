//! Durable record of orders whose invoices were already downloaded.
//!
//! The checkpoint is the only persisted state. It makes re-runs incremental:
//! orders present in it are skipped, everything else is retried.

mod store;

pub use store::{Checkpoint, JsonCheckpointStore};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("Failed to write checkpoint {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize checkpoint: {0}")]
    Serialize(#[from] serde_json::Error),
}
