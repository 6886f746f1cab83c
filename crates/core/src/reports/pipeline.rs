//! Report-based invoice retrieval.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::client::{CreateReportRequest, ReportDocument, ReportOptions, SellingPartnerApi};
use crate::config::PipelineConfig;

use super::types::{InvoiceFetcher, ProcessingStatus};
use super::PipelineError;

/// Report type producing a single-order invoice archive.
const REPORT_TYPE: &str = "GET_AB_INVOICE_PDF";
const DOCUMENT_TYPE: &str = "Invoice";

/// Retrieves invoices through the reports API.
///
/// One [`fetch_invoice`](InvoiceFetcher::fetch_invoice) call runs the full
/// chain for a single order: create report, poll, resolve document,
/// download.
pub struct InvoicePipeline {
    api: Arc<dyn SellingPartnerApi>,
    /// Plain client for the pre-signed document URL; no interceptors.
    downloader: Client,
    marketplace_id: String,
    output_dir: PathBuf,
    poll_interval: Duration,
    /// 0 polls until a terminal status with no upper bound.
    max_poll_attempts: u32,
}

impl InvoicePipeline {
    /// Create a new pipeline writing artifacts into `output_dir`.
    pub fn new(
        api: Arc<dyn SellingPartnerApi>,
        marketplace_id: impl Into<String>,
        output_dir: impl Into<PathBuf>,
        config: &PipelineConfig,
    ) -> Self {
        let downloader = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            api,
            downloader,
            marketplace_id: marketplace_id.into(),
            output_dir: output_dir.into(),
            poll_interval: Duration::from_secs(config.poll_interval_secs),
            max_poll_attempts: config.max_poll_attempts,
        }
    }

    /// Request generation of an invoice report for `order_id`.
    pub async fn create_invoice_report(&self, order_id: &str) -> Result<String, PipelineError> {
        let request = CreateReportRequest {
            report_type: REPORT_TYPE.to_string(),
            marketplace_ids: vec![self.marketplace_id.clone()],
            report_options: ReportOptions {
                order_id: order_id.to_string(),
                document_type: DOCUMENT_TYPE.to_string(),
            },
        };

        let report_id = self.api.create_report(&request).await?;
        debug!("Created report {} for order {}", report_id, order_id);
        Ok(report_id)
    }

    /// Poll `report_id` until it reaches a terminal status, returning the
    /// document id once the report is done.
    ///
    /// A freshly created report has no status yet, so each cycle sleeps
    /// before polling.
    pub async fn wait_for_report(&self, report_id: &str) -> Result<String, PipelineError> {
        let mut attempts = 0u32;

        loop {
            if self.max_poll_attempts > 0 && attempts >= self.max_poll_attempts {
                return Err(PipelineError::PollTimeout { attempts });
            }
            sleep(self.poll_interval).await;
            attempts += 1;

            let report = self.api.get_report(report_id).await?;
            let status = ProcessingStatus::parse(&report.processing_status);
            debug!(
                "Report {} status after {} polls: {}",
                report_id,
                attempts,
                status.as_str()
            );

            if !status.is_terminal() {
                continue;
            }

            return match (status, report.report_document_id) {
                (ProcessingStatus::Done, Some(document_id)) => Ok(document_id),
                (status, _) => Err(PipelineError::ReportFailed {
                    status: status.as_str().to_string(),
                }),
            };
        }
    }

    /// Resolve a finished report document to its download location.
    pub async fn get_report_download_url(
        &self,
        document_id: &str,
    ) -> Result<ReportDocument, PipelineError> {
        let document = self.api.get_report_document(document_id).await?;
        if let Some(algorithm) = &document.compression_algorithm {
            info!(
                "Report document {} is compressed ({}), storing as-is",
                document_id, algorithm
            );
        }
        Ok(document)
    }

    /// Download `url` to `target`, replacing any existing file.
    pub async fn download_to_file(&self, url: &str, target: &Path) -> Result<(), PipelineError> {
        let response = self.downloader.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Download {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        tokio::fs::write(target, &bytes).await?;
        debug!("Wrote {} bytes to {}", bytes.len(), target.display());
        Ok(())
    }

    fn artifact_path(&self, order_id: &str) -> PathBuf {
        self.output_dir
            .join(format!("amazon-invoice-{}.zip", order_id))
    }
}

#[async_trait]
impl InvoiceFetcher for InvoicePipeline {
    async fn fetch_invoice(&self, order_id: &str) -> Result<PathBuf, PipelineError> {
        let report_id = self.create_invoice_report(order_id).await?;
        let document_id = self.wait_for_report(&report_id).await?;
        let document = self.get_report_download_url(&document_id).await?;

        let target = self.artifact_path(order_id);
        self.download_to_file(&document.url, &target).await?;
        info!(
            "Downloaded invoice for order {} to {}",
            order_id,
            target.display()
        );

        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{spawn_one_shot_http, MockSpApi};
    use tempfile::TempDir;

    fn fast_config(max_poll_attempts: u32) -> PipelineConfig {
        PipelineConfig {
            poll_interval_secs: 0,
            max_poll_attempts,
        }
    }

    fn pipeline(api: Arc<MockSpApi>, output_dir: &Path, max_poll_attempts: u32) -> InvoicePipeline {
        InvoicePipeline::new(
            api,
            "A1PA6795UKMFR9",
            output_dir,
            &fast_config(max_poll_attempts),
        )
    }

    #[tokio::test]
    async fn test_wait_for_report_returns_document_id_when_done() {
        let api = Arc::new(MockSpApi::new());
        api.script_report(
            "028-1",
            &["IN_QUEUE", "IN_PROGRESS", "DONE"],
            Some("doc-1"),
        )
        .await;
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::clone(&api), temp.path(), 0);

        let report_id = pipeline.create_invoice_report("028-1").await.unwrap();
        let document_id = pipeline.wait_for_report(&report_id).await.unwrap();

        assert_eq!(document_id, "doc-1");
        assert_eq!(api.poll_count(&report_id).await, 3);
    }

    #[tokio::test]
    async fn test_unknown_status_keeps_polling() {
        let api = Arc::new(MockSpApi::new());
        api.script_report("028-1", &["IN_VALIDATION", "DONE"], Some("doc-1"))
            .await;
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::clone(&api), temp.path(), 0);

        let report_id = pipeline.create_invoice_report("028-1").await.unwrap();
        let document_id = pipeline.wait_for_report(&report_id).await.unwrap();

        assert_eq!(document_id, "doc-1");
        assert_eq!(api.poll_count(&report_id).await, 2);
    }

    #[tokio::test]
    async fn test_cancelled_report_fails_with_status() {
        let api = Arc::new(MockSpApi::new());
        api.script_report("028-1", &["IN_QUEUE", "CANCELLED"], None)
            .await;
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::clone(&api), temp.path(), 0);

        let report_id = pipeline.create_invoice_report("028-1").await.unwrap();
        let err = pipeline.wait_for_report(&report_id).await.unwrap_err();

        match err {
            PipelineError::ReportFailed { status } => assert_eq!(status, "CANCELLED"),
            other => panic!("expected ReportFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_done_without_document_id_is_a_failure() {
        let api = Arc::new(MockSpApi::new());
        api.script_report("028-1", &["DONE"], None).await;
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::clone(&api), temp.path(), 0);

        let report_id = pipeline.create_invoice_report("028-1").await.unwrap();
        let err = pipeline.wait_for_report(&report_id).await.unwrap_err();

        assert!(matches!(
            err,
            PipelineError::ReportFailed { status } if status == "DONE"
        ));
    }

    #[tokio::test]
    async fn test_poll_budget_exhaustion_times_out() {
        let api = Arc::new(MockSpApi::new());
        api.script_report("028-1", &["IN_PROGRESS"], None).await;
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::clone(&api), temp.path(), 3);

        let report_id = pipeline.create_invoice_report("028-1").await.unwrap();
        let err = pipeline.wait_for_report(&report_id).await.unwrap_err();

        match err {
            PipelineError::PollTimeout { attempts } => assert_eq!(attempts, 3),
            other => panic!("expected PollTimeout, got {:?}", other),
        }
        assert_eq!(api.poll_count(&report_id).await, 3);
    }

    #[tokio::test]
    async fn test_download_to_file_writes_payload() {
        let api = Arc::new(MockSpApi::new());
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(api, temp.path(), 0);
        let url = spawn_one_shot_http(200, b"PK\x03\x04 invoice bytes".to_vec()).await;

        let target = temp.path().join("amazon-invoice-028-1.zip");
        pipeline.download_to_file(&url, &target).await.unwrap();

        let written = std::fs::read(&target).unwrap();
        assert_eq!(written, b"PK\x03\x04 invoice bytes");
    }

    #[tokio::test]
    async fn test_download_failure_carries_http_status() {
        let api = Arc::new(MockSpApi::new());
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(api, temp.path(), 0);
        let url = spawn_one_shot_http(403, b"expired".to_vec()).await;

        let target = temp.path().join("amazon-invoice-028-1.zip");
        let err = pipeline.download_to_file(&url, &target).await.unwrap_err();

        assert!(matches!(err, PipelineError::Download { status: 403 }));
        assert!(!target.exists());
    }

    #[tokio::test]
    async fn test_fetch_invoice_writes_named_artifact() {
        let api = Arc::new(MockSpApi::new());
        api.script_report("028-1234567-1234567", &["DONE"], Some("doc-1"))
            .await;
        let url = spawn_one_shot_http(200, b"zip payload".to_vec()).await;
        api.set_document("doc-1", &url, None).await;
        let temp = TempDir::new().unwrap();
        let pipeline = pipeline(Arc::clone(&api), temp.path(), 0);

        let path = pipeline.fetch_invoice("028-1234567-1234567").await.unwrap();

        assert_eq!(
            path,
            temp.path().join("amazon-invoice-028-1234567-1234567.zip")
        );
        assert_eq!(std::fs::read(&path).unwrap(), b"zip payload");
    }
}
