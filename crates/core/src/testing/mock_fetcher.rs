//! Mock invoice fetcher for testing.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::reports::{InvoiceFetcher, PipelineError};

/// Scripted outcome for one order.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    /// Succeed, returning the canonical artifact path.
    Success,
    /// Fail with a terminal report status.
    ReportFailed(String),
    /// Fail with a download HTTP status.
    DownloadFailed(u16),
}

/// Mock implementation of the InvoiceFetcher trait.
///
/// Unscripted orders succeed; failures are opted in per order. No files are
/// written, only the artifact path is returned.
pub struct MockInvoiceFetcher {
    outcomes: Arc<RwLock<HashMap<String, FetchOutcome>>>,
    /// Orders fetched, in call order.
    calls: Arc<RwLock<Vec<String>>>,
    output_dir: PathBuf,
}

impl Default for MockInvoiceFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl MockInvoiceFetcher {
    /// Create a new mock where every fetch succeeds.
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(RwLock::new(HashMap::new())),
            calls: Arc::new(RwLock::new(Vec::new())),
            output_dir: PathBuf::from("invoices"),
        }
    }

    /// Script the outcome for one order.
    pub async fn set_outcome(&self, order_id: &str, outcome: FetchOutcome) {
        self.outcomes
            .write()
            .await
            .insert(order_id.to_string(), outcome);
    }

    /// Get the orders fetched so far, in call order.
    pub async fn recorded_calls(&self) -> Vec<String> {
        self.calls.read().await.clone()
    }
}

#[async_trait]
impl InvoiceFetcher for MockInvoiceFetcher {
    async fn fetch_invoice(&self, order_id: &str) -> Result<PathBuf, PipelineError> {
        self.calls.write().await.push(order_id.to_string());

        let outcome = self
            .outcomes
            .read()
            .await
            .get(order_id)
            .cloned()
            .unwrap_or(FetchOutcome::Success);

        match outcome {
            FetchOutcome::Success => Ok(self
                .output_dir
                .join(format!("amazon-invoice-{}.zip", order_id))),
            FetchOutcome::ReportFailed(status) => Err(PipelineError::ReportFailed { status }),
            FetchOutcome::DownloadFailed(status) => Err(PipelineError::Download { status }),
        }
    }
}
