//! Types for the invoice run orchestrator.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort an orchestrated run.
///
/// Failures scoped to a single order are not represented here; the run
/// counts them and continues.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Order discovery failed.
    #[error("order discovery failed: {0}")]
    Discovery(#[from] crate::client::ApiError),

    /// Checkpoint load or save failed.
    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] crate::checkpoint::CheckpointError),

    /// Output directory could not be created.
    #[error("failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Counters summarizing one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Distinct orders discovered in the window.
    pub discovered: usize,
    /// Invoices newly downloaded this run.
    pub downloaded: usize,
    /// Orders skipped because the checkpoint already marks them.
    pub skipped: usize,
    /// Orders whose retrieval failed this run.
    pub failed: usize,
    /// Orders marked in the checkpoint after the run.
    pub checkpointed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = OrchestratorError::OutputDir {
            path: "/tmp/invoices".to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/tmp/invoices"));

        let err = OrchestratorError::Discovery(crate::client::ApiError::Auth(
            "token refresh failed".to_string(),
        ));
        assert!(err.to_string().starts_with("order discovery failed"));
    }

    #[test]
    fn test_summary_serializes_counters() {
        let summary = RunSummary {
            discovered: 4,
            downloaded: 2,
            skipped: 1,
            failed: 1,
            checkpointed: 3,
        };
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["downloaded"], 2);
        assert_eq!(json["checkpointed"], 3);
    }
}
