//! HTTP client for the Selling Partner API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, Request};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::types::{
    CreateReportRequest, Report, ReportDocument, SellingPartnerApi, TransactionsPage,
};
use super::{ApiError, Interceptor};

const TRANSACTIONS_PATH: &str = "/reconciliations/v1/transactions";
const REPORTS_PATH: &str = "/reports/2021-09-30/reports";
const DOCUMENTS_PATH: &str = "/reports/2021-09-30/documents";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateReportResponse {
    report_id: String,
}

/// Selling Partner API client.
///
/// Builds requests against a regional endpoint, runs them through the
/// interceptor chain and decodes JSON responses.
pub struct SpApiClient {
    client: Client,
    endpoint: String,
    interceptors: Vec<Arc<dyn Interceptor>>,
}

impl SpApiClient {
    /// Create a new client for the given endpoint.
    ///
    /// Interceptors are applied to every request in the order given.
    pub fn new(
        endpoint: impl Into<String>,
        user_agent: &str,
        interceptors: Vec<Arc<dyn Interceptor>>,
    ) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            interceptors,
        })
    }

    /// GET `path` with the given query pairs, decoding the JSON response.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let request = self.client.get(self.url(path, query)).build()?;
        self.dispatch(request).await
    }

    /// POST `body` as JSON to `path`, decoding the JSON response.
    pub async fn post<T, B>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let request = self.client.post(self.url(path, &[])).json(body).build()?;
        self.dispatch(request).await
    }

    /// Build the full URL, percent-encoding query values.
    ///
    /// Values are encoded here rather than left to the URL parser so the
    /// bytes on the wire match what the signer canonicalizes.
    fn url(&self, path: &str, query: &[(&str, String)]) -> String {
        let mut url = format!("{}{}", self.endpoint, path);
        if !query.is_empty() {
            let encoded: Vec<String> = query
                .iter()
                .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
                .collect();
            url.push('?');
            url.push_str(&encoded.join("&"));
        }
        url
    }

    async fn dispatch<T: DeserializeOwned>(&self, mut request: Request) -> Result<T, ApiError> {
        for interceptor in &self.interceptors {
            interceptor.apply(&mut request).await?;
        }

        let path = request.url().path().to_string();
        debug!("{} {}", request.method(), path);

        let response = self.client.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Api {
                status: status.as_u16(),
                path,
                message: body.chars().take(200).collect(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Invalid response from {}: {}", path, e)))
    }
}

#[async_trait]
impl SellingPartnerApi for SpApiClient {
    async fn list_transactions(
        &self,
        marketplace_id: &str,
        posted_after: DateTime<Utc>,
        posted_before: DateTime<Utc>,
        next_token: Option<&str>,
    ) -> Result<TransactionsPage, ApiError> {
        let mut query = vec![
            ("marketplaceIds", marketplace_id.to_string()),
            (
                "postedAfter",
                posted_after.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            (
                "postedBefore",
                posted_before.to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
        ];
        if let Some(token) = next_token {
            query.push(("nextToken", token.to_string()));
        }

        self.get(TRANSACTIONS_PATH, &query).await
    }

    async fn create_report(&self, request: &CreateReportRequest) -> Result<String, ApiError> {
        let response: CreateReportResponse = self.post(REPORTS_PATH, request).await?;
        Ok(response.report_id)
    }

    async fn get_report(&self, report_id: &str) -> Result<Report, ApiError> {
        self.get(&format!("{}/{}", REPORTS_PATH, report_id), &[])
            .await
    }

    async fn get_report_document(&self, document_id: &str) -> Result<ReportDocument, ApiError> {
        self.get(&format!("{}/{}", DOCUMENTS_PATH, document_id), &[])
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ReportOptions;
    use crate::testing::spawn_one_shot_http;
    use std::sync::Mutex;

    struct RecordingInterceptor {
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    }

    #[async_trait]
    impl Interceptor for RecordingInterceptor {
        async fn apply(&self, _request: &mut Request) -> Result<(), ApiError> {
            self.order.lock().unwrap().push(self.label);
            Ok(())
        }
    }

    fn plain_client(endpoint: &str) -> SpApiClient {
        SpApiClient::new(endpoint, "billhook-test/0.1", Vec::new()).unwrap()
    }

    #[test]
    fn test_url_percent_encodes_query_values() {
        let client = plain_client("https://sellingpartnerapi-eu.amazon.com/");
        let url = client.url(
            "/reconciliations/v1/transactions",
            &[
                ("postedAfter", "2025-01-01T00:00:00Z".to_string()),
                ("nextToken", "a+b/c==".to_string()),
            ],
        );
        assert_eq!(
            url,
            "https://sellingpartnerapi-eu.amazon.com/reconciliations/v1/transactions\
             ?postedAfter=2025-01-01T00%3A00%3A00Z&nextToken=a%2Bb%2Fc%3D%3D"
        );
    }

    #[tokio::test]
    async fn test_interceptors_run_in_chain_order() {
        let url = spawn_one_shot_http(200, br#"{"transactions":[]}"#.to_vec()).await;
        let order = Arc::new(Mutex::new(Vec::new()));
        let client = SpApiClient::new(
            url,
            "billhook-test/0.1",
            vec![
                Arc::new(RecordingInterceptor {
                    label: "token",
                    order: Arc::clone(&order),
                }),
                Arc::new(RecordingInterceptor {
                    label: "signer",
                    order: Arc::clone(&order),
                }),
            ],
        )
        .unwrap();

        let _: TransactionsPage = client.get("/test", &[]).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["token", "signer"]);
    }

    #[tokio::test]
    async fn test_error_status_carries_path_and_body() {
        let url = spawn_one_shot_http(404, b"report not found".to_vec()).await;
        let client = plain_client(&url);

        let err = client
            .get::<TransactionsPage>("/reports/2021-09-30/reports/r-404", &[])
            .await
            .unwrap_err();

        match err {
            ApiError::Api {
                status,
                path,
                message,
            } => {
                assert_eq!(status, 404);
                assert_eq!(path, "/reports/2021-09-30/reports/r-404");
                assert!(message.contains("report not found"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_create_report_returns_report_id() {
        let url = spawn_one_shot_http(202, br#"{"reportId":"r-123"}"#.to_vec()).await;
        let client = plain_client(&url);

        let request = CreateReportRequest {
            report_type: "GET_AB_INVOICE_PDF".to_string(),
            marketplace_ids: vec!["A1PA6795UKMFR9".to_string()],
            report_options: ReportOptions {
                order_id: "028-1234567-1234567".to_string(),
                document_type: "Invoice".to_string(),
            },
        };
        let report_id = client.create_report(&request).await.unwrap();

        assert_eq!(report_id, "r-123");
    }

    #[tokio::test]
    async fn test_malformed_body_surfaces_parse_error() {
        let url = spawn_one_shot_http(200, b"not json".to_vec()).await;
        let client = plain_client(&url);

        let err = client
            .get::<TransactionsPage>("/reconciliations/v1/transactions", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Parse(_)));
    }
}
