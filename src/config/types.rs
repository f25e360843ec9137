use crate::output::OutputFormat;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// User agent sent when the config does not name one
pub const DEFAULT_USER_AGENT: &str = concat!(
    "yoink/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/ErikkJs/yoink)"
);

/// Top-level crawl configuration
///
/// Every section is optional in the TOML file; missing keys fall back to
/// the defaults documented on each field.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub filters: FilterConfig,
    pub checkpoint: CheckpointConfig,
    pub output: OutputConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlerConfig {
    /// Maximum link distance from the start URL (start URL is depth 0)
    pub max_depth: u32,

    /// Total page budget across all resumed runs
    pub max_pages: u64,

    /// Number of concurrent workers (1..=100)
    pub max_concurrency: usize,

    /// User-Agent header for every request
    pub user_agent: String,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,

    /// Attempts per URL before the fetch counts as failed
    pub max_retries: u32,

    /// Follow links that leave the start URL's host
    pub follow_external: bool,

    /// Extract visible text from pages
    pub extract_text: bool,

    /// Keep raw HTML on emitted pages
    pub save_html: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 1,
            max_pages: 100,
            max_concurrency: 10,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            max_retries: 3,
            follow_external: false,
            extract_text: true,
            save_html: false,
        }
    }
}

/// URL admission rules
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FilterConfig {
    /// When non-empty, a URL must match at least one of these
    pub include: Vec<String>,

    /// A URL matching any of these is rejected
    pub exclude: Vec<String>,

    /// File extensions to reject, with or without the leading dot
    pub skip_extensions: Vec<String>,

    /// When non-empty, only hosts under these domains are admitted
    pub allowed_domains: Vec<String>,
}

/// Checkpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CheckpointConfig {
    /// Local path or `s3://bucket/key`; checkpointing is off when unset
    pub location: Option<String>,

    /// Save every N successfully crawled pages
    pub interval: u64,

    /// Restore from `location` before crawling
    pub resume: bool,
}

impl Default for CheckpointConfig {
    fn default() -> Self {
        Self {
            location: None,
            interval: 10,
            resume: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Where crawled pages are written; stdout summary only when unset
    pub path: Option<PathBuf>,

    /// Serialization format for the output file
    pub format: OutputFormat,
}
