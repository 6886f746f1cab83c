pub mod checkpoint;
pub mod client;
pub mod config;
pub mod discovery;
pub mod orchestrator;
pub mod reports;
pub mod testing;

pub use checkpoint::{Checkpoint, CheckpointError, JsonCheckpointStore};
pub use client::{
    ApiError, AwsSigningInterceptor, Interceptor, LwaInterceptor, SellingPartnerApi, SpApiClient,
};
pub use config::{
    load_config, load_config_from_env, load_config_from_str, validate_config, Config, ConfigError,
    DateWindow, SanitizedConfig,
};
pub use discovery::OrderDiscovery;
pub use orchestrator::{InvoiceOrchestrator, OrchestratorError, RunSummary};
pub use reports::{InvoiceFetcher, InvoicePipeline, PipelineError, ProcessingStatus};
