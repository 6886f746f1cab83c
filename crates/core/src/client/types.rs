//! Types for Selling Partner API operations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ApiError;

/// The subset of the Selling Partner API consumed by this crate.
///
/// Implemented by [`SpApiClient`](super::SpApiClient) against the real
/// service and by [`MockSpApi`](crate::testing::MockSpApi) in tests.
#[async_trait]
pub trait SellingPartnerApi: Send + Sync {
    /// Lists one page of financial transactions posted inside the window.
    ///
    /// `next_token` is the cursor returned by the previous page and must be
    /// passed back verbatim.
    async fn list_transactions(
        &self,
        marketplace_id: &str,
        posted_after: DateTime<Utc>,
        posted_before: DateTime<Utc>,
        next_token: Option<&str>,
    ) -> Result<TransactionsPage, ApiError>;

    /// Requests generation of a report, returning the report id.
    async fn create_report(&self, request: &CreateReportRequest) -> Result<String, ApiError>;

    /// Fetches the current processing state of a report.
    async fn get_report(&self, report_id: &str) -> Result<Report, ApiError>;

    /// Resolves a report document id to its download location.
    async fn get_report_document(&self, document_id: &str) -> Result<ReportDocument, ApiError>;
}

/// One page of the transactions listing.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionsPage {
    #[serde(default)]
    pub transactions: Vec<Transaction>,
    /// Cursor for the next page, absent on the last page.
    #[serde(default)]
    pub next_token: Option<String>,
}

/// A single financial transaction.
///
/// Only the order reference is consumed. Transactions without one (service
/// fees, carrier adjustments) carry `None` and are skipped upstream.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    #[serde(default)]
    pub order_id: Option<String>,
}

/// Body of a report creation request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateReportRequest {
    pub report_type: String,
    pub marketplace_ids: Vec<String>,
    pub report_options: ReportOptions,
}

/// Report parameters scoping generation to a single order.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportOptions {
    pub order_id: String,
    pub document_type: String,
}

/// Processing state of a report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    pub processing_status: String,
    /// Set once the report has finished processing successfully.
    #[serde(default)]
    pub report_document_id: Option<String>,
}

/// Download location for a finished report document.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportDocument {
    pub url: String,
    /// Present when the payload is compressed in transit.
    #[serde(default)]
    pub compression_algorithm: Option<String>,
}
