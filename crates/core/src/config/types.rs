use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub lwa: LwaConfig,
    pub aws: AwsConfig,
    #[serde(default)]
    pub spapi: SpApiConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

/// Login-with-Amazon credentials for the token-refresh interceptor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LwaConfig {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
    /// Token exchange endpoint (default: the public LWA endpoint)
    #[serde(default = "default_token_url")]
    pub token_url: String,
}

fn default_token_url() -> String {
    "https://api.amazon.com/auth/o2/token".to_string()
}

/// AWS credentials for the request-signing interceptor
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AwsConfig {
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Role assumed before signing SP-API requests
    pub role_arn: String,
    /// STS endpoint override, mainly for tests (default: regional endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sts_endpoint: Option<String>,
}

impl AwsConfig {
    /// STS endpoint for the given region, honoring the override.
    pub fn sts_endpoint_for(&self, region: &str) -> String {
        self.sts_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://sts.{}.amazonaws.com", region))
    }
}

/// SP-API endpoint configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SpApiConfig {
    #[serde(default = "default_region")]
    pub region: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_marketplace_id")]
    pub marketplace_id: String,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for SpApiConfig {
    fn default() -> Self {
        Self {
            region: default_region(),
            endpoint: default_endpoint(),
            marketplace_id: default_marketplace_id(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_region() -> String {
    "eu-west-1".to_string()
}

fn default_endpoint() -> String {
    "https://sellingpartnerapi-eu.amazon.com".to_string()
}

fn default_marketplace_id() -> String {
    "A1PA6795UKMFR9".to_string()
}

fn default_user_agent() -> String {
    format!("billhook/{}", env!("CARGO_PKG_VERSION"))
}

/// Date window for order discovery, half-open `[from, to)`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct WindowConfig {
    /// Lower bound (default: 90 days before now)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<DateTime<Utc>>,
    /// Upper bound, exclusive (default: now)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<DateTime<Utc>>,
}

impl WindowConfig {
    /// Resolve the configured bounds, applying defaults relative to now.
    pub fn bounds(&self) -> DateWindow {
        DateWindow {
            from: self.from.unwrap_or_else(|| Utc::now() - Duration::days(90)),
            to: self.to.unwrap_or_else(Utc::now),
        }
    }
}

/// Resolved date window passed to discovery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

/// Output paths
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    /// Directory receiving downloaded invoice archives
    #[serde(default = "default_out_dir")]
    pub dir: PathBuf,
    /// Checkpoint file recording completed orders
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_out_dir(),
            state_file: default_state_file(),
        }
    }
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("invoices")
}

fn default_state_file() -> PathBuf {
    PathBuf::from("state.json")
}

/// Report polling behavior
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineConfig {
    /// Delay between report status polls in seconds (default: 3)
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    /// Maximum status polls per report; 0 polls until a terminal status
    #[serde(default)]
    pub max_poll_attempts: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval(),
            max_poll_attempts: 0,
        }
    }
}

fn default_poll_interval() -> u64 {
    3
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub lwa: SanitizedLwaConfig,
    pub aws: SanitizedAwsConfig,
    pub spapi: SpApiConfig,
    pub window: WindowConfig,
    pub output: OutputConfig,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedLwaConfig {
    pub client_id: String,
    pub client_secret_configured: bool,
    pub refresh_token_configured: bool,
    pub token_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedAwsConfig {
    pub access_key_id_configured: bool,
    pub secret_access_key_configured: bool,
    pub role_arn: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sts_endpoint: Option<String>,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            lwa: SanitizedLwaConfig {
                client_id: config.lwa.client_id.clone(),
                client_secret_configured: !config.lwa.client_secret.is_empty(),
                refresh_token_configured: !config.lwa.refresh_token.is_empty(),
                token_url: config.lwa.token_url.clone(),
            },
            aws: SanitizedAwsConfig {
                access_key_id_configured: !config.aws.access_key_id.is_empty(),
                secret_access_key_configured: !config.aws.secret_access_key.is_empty(),
                role_arn: config.aws.role_arn.clone(),
                sts_endpoint: config.aws.sts_endpoint.clone(),
            },
            spapi: config.spapi.clone(),
            window: config.window.clone(),
            output: config.output.clone(),
            pipeline: config.pipeline.clone(),
        }
    }
}
