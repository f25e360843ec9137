//! Yoink: a resumable breadth-first web crawler
//!
//! This crate implements a crawl coordination core: a deduplicating frontier,
//! an admission filter, a bounded worker pool and a checkpoint subsystem that
//! lets an interrupted crawl resume exactly where it stopped.

pub mod checkpoint;
pub mod config;
pub mod crawler;
pub mod filter;
pub mod frontier;
pub mod output;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Yoink operations
#[derive(Debug, Error)]
pub enum YoinkError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("URL error: {0}")]
    Url(#[from] UrlError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Checkpoint error: {0}")]
    Checkpoint(#[from] checkpoint::CheckpointError),

    #[error("Output error: {0}")]
    Output(#[from] output::OutputError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Crawl worker failed: {0}")]
    Worker(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid URL pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Yoink operations
pub type Result<T> = std::result::Result<T, YoinkError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use checkpoint::CheckpointManager;
pub use config::Config;
pub use crawler::{Coordinator, CrawlReport, Page, StopReason};
pub use filter::{Admission, FilterEngine};
pub use frontier::{CrawlState, EnqueueOutcome, Frontier, FrontierEntry};
pub use crate::url::{canonicalize, extract_domain, normalize_url};
