use super::{types::Config, ConfigError};

/// Validate configuration before any network activity.
/// Checks:
/// - All credential fields are non-empty (serde only enforces presence)
/// - SP-API endpoint, region and marketplace are non-empty
/// - An explicit window is ordered `from < to`
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let credentials = [
        ("lwa.client_id", &config.lwa.client_id),
        ("lwa.client_secret", &config.lwa.client_secret),
        ("lwa.refresh_token", &config.lwa.refresh_token),
        ("aws.access_key_id", &config.aws.access_key_id),
        ("aws.secret_access_key", &config.aws.secret_access_key),
        ("aws.role_arn", &config.aws.role_arn),
    ];
    for (key, value) in credentials {
        if value.is_empty() {
            return Err(ConfigError::ValidationError(format!(
                "Missing credential: {}",
                key
            )));
        }
    }

    if config.spapi.endpoint.is_empty() {
        return Err(ConfigError::ValidationError(
            "spapi.endpoint cannot be empty".to_string(),
        ));
    }
    if config.spapi.region.is_empty() {
        return Err(ConfigError::ValidationError(
            "spapi.region cannot be empty".to_string(),
        ));
    }
    if config.spapi.marketplace_id.is_empty() {
        return Err(ConfigError::ValidationError(
            "spapi.marketplace_id cannot be empty".to_string(),
        ));
    }

    if let (Some(from), Some(to)) = (config.window.from, config.window.to) {
        if from >= to {
            return Err(ConfigError::ValidationError(format!(
                "window.from ({}) must be before window.to ({})",
                from, to
            )));
        }
    }

    Ok(())
}
