//! Invoice run orchestrator implementation.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::checkpoint::JsonCheckpointStore;
use crate::config::DateWindow;
use crate::discovery::OrderDiscovery;
use crate::reports::InvoiceFetcher;

use super::types::{OrchestratorError, RunSummary};

/// Drives one end-to-end retrieval run.
pub struct InvoiceOrchestrator {
    discovery: OrderDiscovery,
    fetcher: Arc<dyn InvoiceFetcher>,
    store: JsonCheckpointStore,
    window: DateWindow,
    output_dir: PathBuf,
}

impl InvoiceOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        discovery: OrderDiscovery,
        fetcher: Arc<dyn InvoiceFetcher>,
        store: JsonCheckpointStore,
        window: DateWindow,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            discovery,
            fetcher,
            store,
            window,
            output_dir: output_dir.into(),
        }
    }

    /// Run discovery and retrieval once, returning the run counters.
    ///
    /// Orders already marked in the checkpoint are skipped. A failed order
    /// is logged, counted and left unmarked so the next run retries it; the
    /// remaining orders still run. Discovery and checkpoint failures abort
    /// the whole run.
    pub async fn run(&self) -> Result<RunSummary, OrchestratorError> {
        tokio::fs::create_dir_all(&self.output_dir)
            .await
            .map_err(|e| OrchestratorError::OutputDir {
                path: self.output_dir.display().to_string(),
                source: e,
            })?;

        let mut checkpoint = self.store.load();

        info!(
            "Discovering orders posted between {} and {}",
            self.window.from, self.window.to
        );
        let order_ids = self.discovery.fetch_order_ids(&self.window).await?;
        info!("Discovered {} orders with activity", order_ids.len());

        let mut summary = RunSummary {
            discovered: order_ids.len(),
            ..RunSummary::default()
        };

        for order_id in &order_ids {
            if checkpoint.contains(order_id) {
                debug!("Order {} already downloaded, skipping", order_id);
                summary.skipped += 1;
                continue;
            }

            match self.fetcher.fetch_invoice(order_id).await {
                Ok(path) => {
                    checkpoint.mark(order_id);
                    summary.downloaded += 1;
                    info!("Order {} done: {}", order_id, path.display());
                }
                Err(e) => {
                    summary.failed += 1;
                    error!("Failed to fetch invoice for order {}: {}", order_id, e);
                }
            }
        }

        self.store.save(&checkpoint)?;
        summary.checkpointed = checkpoint.len();

        info!(
            "Run complete: {} newly downloaded, {} total checkpointed",
            summary.downloaded, summary.checkpointed
        );

        Ok(summary)
    }
}
