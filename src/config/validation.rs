use crate::config::types::{CategoryEntry, Config, ExecutorConfig, PaginationConfig, RateLimitEntry};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_executor_config(&config.executor)?;

    if config.scheduler.tick_ms < 1 {
        return Err(ConfigError::Validation(
            "tick_ms must be >= 1".to_string(),
        ));
    }

    validate_pagination_config(&config.pagination)?;

    if config.output.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    validate_rate_limits(&config.rate_limits)?;
    validate_categories(&config.categories)?;
    Ok(())
}

/// Validates executor configuration
fn validate_executor_config(config: &ExecutorConfig) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if let Some(proxy) = &config.proxy {
        Url::parse(proxy)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid proxy '{}': {}", proxy, e)))?;
    }

    for name in config.headers.keys() {
        if name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "header names cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}

/// Validates pagination defaults
fn validate_pagination_config(config: &PaginationConfig) -> Result<(), ConfigError> {
    if config.page_param.is_empty() {
        return Err(ConfigError::Validation(
            "page_param cannot be empty".to_string(),
        ));
    }

    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max_pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    Ok(())
}

/// Validates per-domain rate limits
fn validate_rate_limits(entries: &[RateLimitEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        let domain = entry.domain.trim().to_lowercase();
        if domain.is_empty() {
            return Err(ConfigError::Validation(
                "rate-limit domain cannot be empty".to_string(),
            ));
        }

        if !entry.requests_per_second.is_finite() || entry.requests_per_second <= 0.0 {
            return Err(ConfigError::Validation(format!(
                "requests_per_second for '{}' must be a positive number, got {}",
                entry.domain, entry.requests_per_second
            )));
        }

        if !seen.insert(domain) {
            return Err(ConfigError::Validation(format!(
                "Duplicate rate-limit domain '{}'",
                entry.domain
            )));
        }
    }

    Ok(())
}

/// Validates classification categories
fn validate_categories(entries: &[CategoryEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if entry.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "category name cannot be empty".to_string(),
            ));
        }

        if !seen.insert(entry.name.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Duplicate category '{}'",
                entry.name
            )));
        }
    }

    Ok(())
}
