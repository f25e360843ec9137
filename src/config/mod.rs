//! Configuration module for Yoink
//!
//! This module handles loading, parsing, and validating TOML configuration
//! files, and computes the fingerprint stored alongside checkpoints.
//!
//! # Example
//!
//! ```no_run
//! use yoink::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("yoink.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

pub use types::{
    CheckpointConfig, Config, CrawlerConfig, FilterConfig, OutputConfig, DEFAULT_USER_AGENT,
};

pub use parser::{config_fingerprint, load_config, parse_config};
pub use validation::{validate, validate_start_url};
