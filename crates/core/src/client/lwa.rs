//! Login with Amazon token exchange.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderValue;
use reqwest::{Client, Request};
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::debug;

use crate::config::LwaConfig;

use super::{ApiError, Interceptor};

/// Refresh the token this many seconds before it actually expires.
const EXPIRY_MARGIN_SECS: i64 = 60;

#[derive(Debug, Deserialize)]
struct LwaTokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn needs_refresh(&self) -> bool {
        self.expires_at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) <= Utc::now()
    }
}

/// Attaches an LWA access token to outgoing requests.
///
/// The access token is obtained from the token endpoint with the long-lived
/// refresh token and cached until shortly before it expires.
pub struct LwaInterceptor {
    http: Client,
    config: LwaConfig,
    /// Cached access token (refreshed near expiry).
    token: RwLock<Option<CachedToken>>,
}

impl LwaInterceptor {
    /// Create a new LWA interceptor.
    pub fn new(config: LwaConfig) -> Self {
        let http = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            http,
            config,
            token: RwLock::new(None),
        }
    }

    /// Return a valid access token, exchanging the refresh token if needed.
    async fn ensure_token(&self) -> Result<String, ApiError> {
        let cached = self.token.read().await;
        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.access_token.clone());
            }
        }
        drop(cached);
        self.refresh().await
    }

    async fn refresh(&self) -> Result<String, ApiError> {
        let mut cached = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(token) = cached.as_ref() {
            if !token.needs_refresh() {
                return Ok(token.access_token.clone());
            }
        }

        debug!("Refreshing LWA access token");

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", self.config.refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = self
            .http
            .post(&self.config.token_url)
            .form(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Auth(format!(
                "LWA token refresh failed with status {}: {}",
                status.as_u16(),
                body.chars().take(200).collect::<String>()
            )));
        }

        let token: LwaTokenResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Parse(format!("Invalid LWA token response: {}", e)))?;

        let expires_at = Utc::now() + chrono::Duration::seconds(token.expires_in);
        debug!("LWA token refreshed, valid until {}", expires_at);

        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            expires_at,
        });

        Ok(token.access_token)
    }
}

#[async_trait]
impl Interceptor for LwaInterceptor {
    async fn apply(&self, request: &mut Request) -> Result<(), ApiError> {
        let token = self.ensure_token().await?;
        let value = HeaderValue::from_str(&token)
            .map_err(|e| ApiError::Auth(format!("Invalid access token: {}", e)))?;
        request.headers_mut().insert("x-amz-access-token", value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_one_shot_http;
    use reqwest::{Method, Url};

    fn lwa_config(token_url: String) -> LwaConfig {
        LwaConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            refresh_token: "refresh-token".to_string(),
            token_url,
        }
    }

    fn empty_request() -> Request {
        Request::new(
            Method::GET,
            Url::parse("https://sellingpartnerapi-eu.amazon.com/x").unwrap(),
        )
    }

    #[tokio::test]
    async fn test_apply_attaches_access_token_header() {
        let url = spawn_one_shot_http(
            200,
            br#"{"access_token":"token-1","token_type":"bearer","expires_in":3600}"#.to_vec(),
        )
        .await;
        let interceptor = LwaInterceptor::new(lwa_config(url));

        let mut request = empty_request();
        interceptor.apply(&mut request).await.unwrap();

        assert_eq!(
            request.headers().get("x-amz-access-token").unwrap(),
            "token-1"
        );
    }

    #[tokio::test]
    async fn test_token_is_cached_across_requests() {
        // The stub serves exactly one response, so a second exchange would
        // fail with a connection error.
        let url = spawn_one_shot_http(
            200,
            br#"{"access_token":"token-1","token_type":"bearer","expires_in":3600}"#.to_vec(),
        )
        .await;
        let interceptor = LwaInterceptor::new(lwa_config(url));

        let mut first = empty_request();
        interceptor.apply(&mut first).await.unwrap();
        let mut second = empty_request();
        interceptor.apply(&mut second).await.unwrap();

        assert_eq!(
            second.headers().get("x-amz-access-token").unwrap(),
            "token-1"
        );
    }

    #[tokio::test]
    async fn test_rejected_refresh_surfaces_auth_error() {
        let url = spawn_one_shot_http(400, br#"{"error":"invalid_grant"}"#.to_vec()).await;
        let interceptor = LwaInterceptor::new(lwa_config(url));

        let mut request = empty_request();
        let err = interceptor.apply(&mut request).await.unwrap_err();

        match err {
            ApiError::Auth(message) => {
                assert!(message.contains("400"));
                assert!(message.contains("invalid_grant"));
            }
            other => panic!("expected Auth error, got {:?}", other),
        }
    }
}
