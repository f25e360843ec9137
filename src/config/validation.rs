use crate::config::types::{CheckpointConfig, Config, CrawlerConfig, FilterConfig};
use crate::filter::UrlPattern;
use crate::ConfigError;
use url::Url;

/// Upper bound on concurrent workers
const MAX_CONCURRENCY: usize = 100;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawler_config(&config.crawler)?;
    validate_filter_config(&config.filters)?;
    validate_checkpoint_config(&config.checkpoint)?;
    Ok(())
}

/// Validates the crawl start URL and returns it parsed
///
/// The start URL must be an absolute `http` or `https` URL with a host.
pub fn validate_start_url(start_url: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(start_url.trim())
        .map_err(|e| ConfigError::InvalidUrl(format!("'{}': {}", start_url, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}': start URL must use http or https",
            start_url
        )));
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(ConfigError::InvalidUrl(format!(
            "'{}': start URL has no host",
            start_url
        )));
    }

    Ok(url)
}

fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.max_pages < 1 {
        return Err(ConfigError::Validation(format!(
            "max-pages must be >= 1, got {}",
            config.max_pages
        )));
    }

    if config.max_concurrency < 1 || config.max_concurrency > MAX_CONCURRENCY {
        return Err(ConfigError::Validation(format!(
            "max-concurrency must be between 1 and {}, got {}",
            MAX_CONCURRENCY, config.max_concurrency
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout-secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max-retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user-agent cannot be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_filter_config(config: &FilterConfig) -> Result<(), ConfigError> {
    for pattern in config.include.iter().chain(config.exclude.iter()) {
        UrlPattern::compile(pattern)?;
    }

    for ext in &config.skip_extensions {
        let trimmed = ext.trim().trim_start_matches('.');
        if trimmed.is_empty() || trimmed.contains('/') {
            return Err(ConfigError::Validation(format!(
                "skip-extensions entry '{}' is not a file extension",
                ext
            )));
        }
    }

    for domain in &config.allowed_domains {
        let base = domain.trim().trim_start_matches("*.");
        if base.is_empty() || base.contains('/') || base.contains(char::is_whitespace) {
            return Err(ConfigError::InvalidPattern(format!(
                "allowed-domains entry '{}' is not a domain",
                domain
            )));
        }
    }

    Ok(())
}

fn validate_checkpoint_config(config: &CheckpointConfig) -> Result<(), ConfigError> {
    if config.interval < 1 {
        return Err(ConfigError::Validation(format!(
            "checkpoint interval must be >= 1, got {}",
            config.interval
        )));
    }

    if config.resume && config.location.is_none() {
        return Err(ConfigError::Validation(
            "resume requires a checkpoint location".to_string(),
        ));
    }

    if let Some(location) = &config.location {
        if location.trim().is_empty() {
            return Err(ConfigError::Validation(
                "checkpoint location cannot be empty".to_string(),
            ));
        }
    }

    Ok(())
}
