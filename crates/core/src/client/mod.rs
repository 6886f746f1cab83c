//! Authenticated access to the Selling Partner API.
//!
//! Requests are built by [`SpApiClient`] and run through an ordered chain of
//! [`Interceptor`]s before dispatch. Production wiring attaches the LWA
//! access token first and applies the SigV4 signature second, so the
//! signature covers the token header.

mod aws;
mod lwa;
mod sigv4;
mod spapi;
mod types;

pub use aws::AwsSigningInterceptor;
pub use lwa::LwaInterceptor;
pub use sigv4::SigningCredentials;
pub use spapi::SpApiClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when talking to the Selling Partner API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed before a response was received.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned a non-success status.
    #[error("API call to {path} failed: {status} - {message}")]
    Api {
        status: u16,
        path: String,
        message: String,
    },

    /// Token refresh or request signing failed.
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Failed to parse a response body.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// A preparation step applied to an outgoing request before dispatch.
///
/// Interceptors run in the order they were handed to [`SpApiClient::new`].
/// An error from any interceptor aborts the request.
#[async_trait]
pub trait Interceptor: Send + Sync {
    async fn apply(&self, request: &mut reqwest::Request) -> Result<(), ApiError>;
}
