use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::CheckpointError;

/// Set of order identifiers whose invoice was downloaded in some run.
///
/// Serializes to a JSON object with literal `true` values so the file stays
/// hand-inspectable and diffable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Checkpoint {
    orders: BTreeMap<String, bool>,
}

impl Checkpoint {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an invoice was already downloaded for this order.
    pub fn contains(&self, order_id: &str) -> bool {
        self.orders.contains_key(order_id)
    }

    /// Record a successful download.
    pub fn mark(&mut self, order_id: &str) {
        self.orders.insert(order_id.to_string(), true);
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

/// Checkpoint persistence as a pretty-printed JSON file.
pub struct JsonCheckpointStore {
    path: PathBuf,
}

impl JsonCheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Read the checkpoint. A missing or malformed file yields an empty
    /// checkpoint rather than an error, so a first run and a recovery run
    /// look the same.
    pub fn load(&self) -> Checkpoint {
        let raw = match std::fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("No checkpoint at {}: {}", self.path.display(), e);
                return Checkpoint::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(checkpoint) => checkpoint,
            Err(e) => {
                warn!(
                    "Ignoring malformed checkpoint {}: {}",
                    self.path.display(),
                    e
                );
                Checkpoint::default()
            }
        }
    }

    /// Write the checkpoint, fully replacing prior content.
    pub fn save(&self, checkpoint: &Checkpoint) -> Result<(), CheckpointError> {
        let json = serde_json::to_string_pretty(checkpoint)?;
        std::fs::write(&self.path, json).map_err(|source| CheckpointError::Io {
            path: self.path.display().to_string(),
            source,
        })
    }
}
