use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use billhook_core::{
    load_config, load_config_from_env, validate_config, AwsSigningInterceptor, Interceptor,
    InvoiceOrchestrator, InvoicePipeline, JsonCheckpointStore, LwaInterceptor, OrderDiscovery,
    SanitizedConfig, SellingPartnerApi, SpApiClient,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("billhook {}", VERSION);

    // Load configuration: explicit path, local file, or environment only
    let config = match std::env::var("BILLHOOK_CONFIG") {
        Ok(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {:?}", path);
            load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))?
        }
        Err(_) => {
            let path = PathBuf::from("billhook.toml");
            if path.exists() {
                info!("Loading configuration from {:?}", path);
                load_config(&path)
                    .with_context(|| format!("Failed to load config from {:?}", path))?
            } else {
                info!("No config file found, reading configuration from environment");
                load_config_from_env().context("Failed to load config from environment")?
            }
        }
    };

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    // Build the interceptor chain: LWA token first, then the SigV4 signer,
    // so the signature covers the token header.
    let lwa = Arc::new(LwaInterceptor::new(config.lwa.clone()));
    let signer = Arc::new(AwsSigningInterceptor::new(
        config.aws.clone(),
        config.spapi.region.clone(),
    ));
    let interceptors: Vec<Arc<dyn Interceptor>> = vec![lwa, signer];

    let api: Arc<dyn SellingPartnerApi> = Arc::new(
        SpApiClient::new(
            config.spapi.endpoint.clone(),
            &config.spapi.user_agent,
            interceptors,
        )
        .context("Failed to create SP-API client")?,
    );
    info!("SP-API client initialized for {}", config.spapi.endpoint);

    // Assemble the orchestrator
    let discovery = OrderDiscovery::new(Arc::clone(&api), config.spapi.marketplace_id.clone());
    let pipeline = Arc::new(InvoicePipeline::new(
        Arc::clone(&api),
        config.spapi.marketplace_id.clone(),
        config.output.dir.clone(),
        &config.pipeline,
    ));
    let store = JsonCheckpointStore::new(config.output.state_file.clone());

    let orchestrator = InvoiceOrchestrator::new(
        discovery,
        pipeline,
        store,
        config.window.bounds(),
        config.output.dir.clone(),
    );

    let summary = orchestrator.run().await.context("Invoice run failed")?;

    info!(
        "Summary: {}",
        serde_json::to_string(&summary).unwrap_or_default()
    );

    Ok(())
}
