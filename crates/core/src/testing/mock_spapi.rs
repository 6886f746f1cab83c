//! Mock Selling Partner API for testing.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::client::{
    ApiError, CreateReportRequest, Report, ReportDocument, SellingPartnerApi, TransactionsPage,
};

/// A recorded transactions listing call for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedListing {
    pub marketplace_id: String,
    pub posted_after: DateTime<Utc>,
    pub posted_before: DateTime<Utc>,
    /// The cursor the caller passed, None for the first page.
    pub next_token: Option<String>,
}

#[derive(Debug, Clone)]
struct ScriptedReport {
    /// Statuses walked one per poll; the last one repeats.
    statuses: Vec<String>,
    document_id: Option<String>,
    polls: usize,
}

/// Mock implementation of the SellingPartnerApi trait.
///
/// Provides controllable behavior for testing:
/// - Serve scripted transaction pages in sequence
/// - Walk scripted report statuses one poll at a time
/// - Track listing calls and created reports for assertions
///
/// Orders without a report script fail at creation, which is also how
/// per-order failures are simulated.
///
/// # Example
///
/// ```rust,ignore
/// use billhook_core::testing::{fixtures, MockSpApi};
///
/// let api = MockSpApi::new();
/// api.set_transaction_pages(vec![
///     fixtures::transactions_page(&["028-1"], None),
/// ]).await;
/// api.script_report("028-1", &["IN_QUEUE", "DONE"], Some("doc-1")).await;
/// api.set_document("doc-1", "http://127.0.0.1:9/doc", None).await;
/// ```
pub struct MockSpApi {
    /// Pages served in order, one per listing call; empty serves a blank page.
    pages: Arc<RwLock<Vec<TransactionsPage>>>,
    /// Recorded listing calls.
    listings: Arc<RwLock<Vec<RecordedListing>>>,
    /// If set, the next listing call fails with this error.
    next_listing_error: Arc<RwLock<Option<ApiError>>>,
    /// Report scripts keyed by order id.
    scripts: Arc<RwLock<HashMap<String, ScriptedReport>>>,
    /// Report id -> order id for created reports.
    report_orders: Arc<RwLock<HashMap<String, String>>>,
    /// Orders passed to create_report, in call order.
    created: Arc<RwLock<Vec<String>>>,
    /// Documents keyed by document id.
    documents: Arc<RwLock<HashMap<String, ReportDocument>>>,
}

impl Default for MockSpApi {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSpApi {
    /// Create a new mock with no pages and no report scripts.
    pub fn new() -> Self {
        Self {
            pages: Arc::new(RwLock::new(Vec::new())),
            listings: Arc::new(RwLock::new(Vec::new())),
            next_listing_error: Arc::new(RwLock::new(None)),
            scripts: Arc::new(RwLock::new(HashMap::new())),
            report_orders: Arc::new(RwLock::new(HashMap::new())),
            created: Arc::new(RwLock::new(Vec::new())),
            documents: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Set the transaction pages served by subsequent listing calls.
    pub async fn set_transaction_pages(&self, pages: Vec<TransactionsPage>) {
        *self.pages.write().await = pages;
    }

    /// Configure the next listing call to fail with the given error.
    pub async fn set_next_listing_error(&self, error: ApiError) {
        *self.next_listing_error.write().await = Some(error);
    }

    /// Get recorded listing calls.
    pub async fn recorded_listings(&self) -> Vec<RecordedListing> {
        self.listings.read().await.clone()
    }

    /// Get the orders passed to create_report, in call order.
    pub async fn created_reports(&self) -> Vec<String> {
        self.created.read().await.clone()
    }

    /// Script the report lifecycle for one order.
    ///
    /// Each poll advances through `statuses`; the last entry repeats. The
    /// document id is attached once the reported status is DONE.
    pub async fn script_report(
        &self,
        order_id: &str,
        statuses: &[&str],
        document_id: Option<&str>,
    ) {
        self.scripts.write().await.insert(
            order_id.to_string(),
            ScriptedReport {
                statuses: statuses.iter().map(|s| s.to_string()).collect(),
                document_id: document_id.map(str::to_string),
                polls: 0,
            },
        );
    }

    /// Register a document for `get_report_document`.
    pub async fn set_document(&self, document_id: &str, url: &str, compression: Option<&str>) {
        self.documents.write().await.insert(
            document_id.to_string(),
            ReportDocument {
                url: url.to_string(),
                compression_algorithm: compression.map(str::to_string),
            },
        );
    }

    /// Number of status polls recorded for `report_id`.
    pub async fn poll_count(&self, report_id: &str) -> usize {
        let report_orders = self.report_orders.read().await;
        match report_orders.get(report_id) {
            Some(order_id) => self
                .scripts
                .read()
                .await
                .get(order_id)
                .map(|script| script.polls)
                .unwrap_or(0),
            None => 0,
        }
    }

    async fn take_listing_error(&self) -> Option<ApiError> {
        self.next_listing_error.write().await.take()
    }
}

#[async_trait]
impl SellingPartnerApi for MockSpApi {
    async fn list_transactions(
        &self,
        marketplace_id: &str,
        posted_after: DateTime<Utc>,
        posted_before: DateTime<Utc>,
        next_token: Option<&str>,
    ) -> Result<TransactionsPage, ApiError> {
        if let Some(err) = self.take_listing_error().await {
            return Err(err);
        }

        self.listings.write().await.push(RecordedListing {
            marketplace_id: marketplace_id.to_string(),
            posted_after,
            posted_before,
            next_token: next_token.map(str::to_string),
        });

        let mut pages = self.pages.write().await;
        if pages.is_empty() {
            Ok(TransactionsPage::default())
        } else {
            Ok(pages.remove(0))
        }
    }

    async fn create_report(&self, request: &CreateReportRequest) -> Result<String, ApiError> {
        let order_id = request.report_options.order_id.clone();
        self.created.write().await.push(order_id.clone());

        if !self.scripts.read().await.contains_key(&order_id) {
            return Err(ApiError::Api {
                status: 400,
                path: "/reports/2021-09-30/reports".to_string(),
                message: format!("no report scripted for order {}", order_id),
            });
        }

        let report_id = format!("report-{}", order_id);
        self.report_orders
            .write()
            .await
            .insert(report_id.clone(), order_id);
        Ok(report_id)
    }

    async fn get_report(&self, report_id: &str) -> Result<Report, ApiError> {
        let report_orders = self.report_orders.read().await;
        let order_id = report_orders.get(report_id).ok_or_else(|| ApiError::Api {
            status: 404,
            path: format!("/reports/2021-09-30/reports/{}", report_id),
            message: "report not found".to_string(),
        })?;

        let mut scripts = self.scripts.write().await;
        let script = scripts.get_mut(order_id).ok_or_else(|| ApiError::Api {
            status: 404,
            path: format!("/reports/2021-09-30/reports/{}", report_id),
            message: "report script missing".to_string(),
        })?;

        // An empty script stays queued forever.
        let status = if script.statuses.is_empty() {
            "IN_QUEUE".to_string()
        } else {
            script.statuses[script.polls.min(script.statuses.len() - 1)].clone()
        };
        script.polls += 1;

        let report_document_id = if status == "DONE" {
            script.document_id.clone()
        } else {
            None
        };

        Ok(Report {
            processing_status: status,
            report_document_id,
        })
    }

    async fn get_report_document(&self, document_id: &str) -> Result<ReportDocument, ApiError> {
        self.documents
            .read()
            .await
            .get(document_id)
            .cloned()
            .ok_or_else(|| ApiError::Api {
                status: 404,
                path: format!("/reports/2021-09-30/documents/{}", document_id),
                message: "document not found".to_string(),
            })
    }
}
