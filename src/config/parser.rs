use crate::config::types::Config;
use crate::config::validation::validate;
use crate::ConfigError;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;

/// Loads and parses a configuration file from the given path
///
/// # Arguments
///
/// * `path` - Path to the TOML configuration file
///
/// # Returns
///
/// * `Ok(Config)` - Successfully loaded and validated configuration
/// * `Err(ConfigError)` - Failed to load, parse, or validate the configuration
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parses and validates configuration from a TOML string
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

/// Settings that decide which URLs a crawl can ever reach
#[derive(Serialize)]
struct FingerprintInput<'a> {
    start_url: &'a str,
    max_depth: u32,
    follow_external: bool,
    include: &'a [String],
    exclude: &'a [String],
    skip_extensions: &'a [String],
    allowed_domains: &'a [String],
}

/// Computes a SHA-256 fingerprint of the crawl-shaping settings
///
/// The fingerprint is stored in every checkpoint. A resumed run compares it
/// against its own configuration to notice that depth or filter settings
/// changed in between. The page budget and concurrency are left out so a
/// resumed run can raise them without tripping the check.
///
/// # Returns
///
/// Hex-encoded SHA-256 digest
pub fn config_fingerprint(config: &Config, start_url: &str) -> String {
    let input = FingerprintInput {
        start_url,
        max_depth: config.crawler.max_depth,
        follow_external: config.crawler.follow_external,
        include: &config.filters.include,
        exclude: &config.filters.exclude,
        skip_extensions: &config.filters.skip_extensions,
        allowed_domains: &config.filters.allowed_domains,
    };

    // Serializing a borrowed struct of strings and scalars cannot fail.
    let encoded = serde_json::to_vec(&input).unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(&encoded);
    hex::encode(hasher.finalize())
}
