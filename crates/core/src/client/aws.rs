//! SigV4 signing with temporary credentials from STS.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::ACCEPT;
use reqwest::{Client, Request};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

use crate::config::AwsConfig;

use super::sigv4::{self, SigningCredentials};
use super::{ApiError, Interceptor};

/// Signing service name for Selling Partner API requests.
const SPAPI_SERVICE: &str = "execute-api";
const STS_SERVICE: &str = "sts";
const STS_API_VERSION: &str = "2011-06-15";
const SESSION_DURATION_SECS: &str = "3600";
/// Re-assume the role this many seconds before the session expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleEnvelope {
    assume_role_response: AssumeRoleResponse,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResponse {
    assume_role_result: AssumeRoleResult,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct AssumeRoleResult {
    credentials: WireCredentials,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct WireCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    /// Epoch seconds; STS JSON responses carry a number here.
    expiration: f64,
}

#[derive(Debug, Clone)]
struct TempCredentials {
    access_key_id: String,
    secret_access_key: String,
    session_token: String,
    expires_at: DateTime<Utc>,
}

impl TempCredentials {
    fn needs_refresh(&self) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) <= Utc::now()
    }
}

/// Signs outgoing requests with SigV4.
///
/// Static account keys are only used to call STS AssumeRole; the temporary
/// session credentials returned there sign the actual SP-API traffic and are
/// cached until shortly before the session expires.
pub struct AwsSigningInterceptor {
    http: Client,
    config: AwsConfig,
    region: String,
    /// Cached session credentials (re-assumed near expiry).
    credentials: RwLock<Option<TempCredentials>>,
}

impl AwsSigningInterceptor {
    /// Create a new signing interceptor for the given region.
    pub fn new(config: AwsConfig, region: impl Into<String>) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            config,
            region: region.into(),
            credentials: RwLock::new(None),
        }
    }

    /// Return valid session credentials, calling AssumeRole if needed.
    async fn ensure_credentials(&self) -> Result<TempCredentials, ApiError> {
        let cached = self.credentials.read().await;
        if let Some(credentials) = cached.as_ref() {
            if !credentials.needs_refresh() {
                return Ok(credentials.clone());
            }
        }
        drop(cached);
        self.assume_role().await
    }

    async fn assume_role(&self) -> Result<TempCredentials, ApiError> {
        let mut cached = self.credentials.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(credentials) = cached.as_ref() {
            if !credentials.needs_refresh() {
                return Ok(credentials.clone());
            }
        }

        let endpoint = self.config.sts_endpoint_for(&self.region);
        let session_name = format!("billhook-{}", Uuid::new_v4());
        debug!("Assuming role {} via {}", self.config.role_arn, endpoint);

        let params = [
            ("Action", "AssumeRole"),
            ("Version", STS_API_VERSION),
            ("RoleArn", self.config.role_arn.as_str()),
            ("RoleSessionName", session_name.as_str()),
            ("DurationSeconds", SESSION_DURATION_SECS),
        ];

        let mut request = self
            .http
            .post(&endpoint)
            .header(ACCEPT, "application/json")
            .form(&params)
            .build()?;

        let signing = SigningCredentials {
            access_key_id: self.config.access_key_id.clone(),
            secret_access_key: self.config.secret_access_key.clone(),
            session_token: None,
        };
        sigv4::sign(&mut request, &signing, &self.region, STS_SERVICE, Utc::now())?;

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!(
                "STS AssumeRole failed with status {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let envelope: AssumeRoleEnvelope = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Invalid STS response: {}", e)))?;
        let wire = envelope.assume_role_response.assume_role_result.credentials;

        let expires_at = Utc
            .timestamp_opt(wire.expiration as i64, 0)
            .single()
            .ok_or_else(|| {
                ApiError::Parse(format!("Invalid credential expiration: {}", wire.expiration))
            })?;
        debug!("Assumed role, session credentials valid until {}", expires_at);

        let credentials = TempCredentials {
            access_key_id: wire.access_key_id,
            secret_access_key: wire.secret_access_key,
            session_token: wire.session_token,
            expires_at,
        };
        *cached = Some(credentials.clone());

        Ok(credentials)
    }
}

#[async_trait]
impl Interceptor for AwsSigningInterceptor {
    async fn apply(&self, request: &mut Request) -> Result<(), ApiError> {
        let credentials = self.ensure_credentials().await?;
        let signing = SigningCredentials {
            access_key_id: credentials.access_key_id,
            secret_access_key: credentials.secret_access_key,
            session_token: Some(credentials.session_token),
        };
        sigv4::sign(request, &signing, &self.region, SPAPI_SERVICE, Utc::now())
    }
}
