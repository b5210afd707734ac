use crate::config::types::{Config, CrawlerConfig, ImageConfig, OutputConfig, RetryConfig};
use crate::ConfigError;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_retry_config(&config.retry)?;
    validate_output_config(&config.output)?;
    validate_image_config(&config.images)?;
    Ok(())
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_workers < 1 || config.max_workers > 100 {
        return Err(ConfigError::Validation(format!(
            "max_workers must be between 1 and 100, got {}",
            config.max_workers
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.request_timeout_secs < 1 || config.connect_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeouts must be >= 1s, got request={}s connect={}s",
            config.request_timeout_secs, config.connect_timeout_secs
        )));
    }

    Ok(())
}

fn validate_retry_config(config: &RetryConfig) -> Result<(), ConfigError> {
    if config.max_attempts < 1 {
        return Err(ConfigError::Validation(format!(
            "max_attempts must be >= 1, got {}",
            config.max_attempts
        )));
    }

    if !config.backoff_factor.is_finite() || config.backoff_factor < 0.0 {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be a non-negative number, got {}",
            config.backoff_factor
        )));
    }

    if let Some(status) = config
        .retry_statuses
        .iter()
        .find(|s| !(400..=599).contains(*s))
    {
        return Err(ConfigError::Validation(format!(
            "retry status {} is not an HTTP error status (400-599)",
            status
        )));
    }

    Ok(())
}

fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.image_dir.is_empty() {
        return Err(ConfigError::Validation(
            "image_dir cannot be empty".to_string(),
        ));
    }

    if config.manifest_path.is_empty() {
        return Err(ConfigError::Validation(
            "manifest_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_image_config(config: &ImageConfig) -> Result<(), ConfigError> {
    for ext in &config.excluded_extensions {
        if !ext.starts_with('.') || ext.len() < 2 {
            return Err(ConfigError::Validation(format!(
                "excluded extension '{}' must look like '.ext'",
                ext
            )));
        }
    }
    Ok(())
}
