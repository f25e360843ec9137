//! Output module for crawled pages and statistics
//!
//! This module handles:
//! - Writing pages as JSON, JSON Lines, Parquet or plain text
//! - Reading page files back for analysis
//! - Computing and formatting crawl statistics

mod stats;
mod writer;

pub use stats::{format_bytes, CrawlStats, DomainCount, StatsSummary};
pub use writer::{read_pages, write_pages};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Unsupported page file format: {0}")]
    UnsupportedFormat(String),

    #[error("Malformed record on line {line}: {message}")]
    MalformedLine { line: usize, message: String },
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Page file format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// A single JSON array
    Json,
    /// One JSON object per line
    #[default]
    Jsonl,
    /// Columnar file with one row per page
    Parquet,
    /// Human-readable text dump
    Text,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Text => "txt",
        }
    }

    /// Infers a readable format from a file extension
    pub fn from_path(path: &Path) -> OutputResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        match ext.as_str() {
            "json" => Ok(OutputFormat::Json),
            "jsonl" | "ndjson" => Ok(OutputFormat::Jsonl),
            other => Err(OutputError::UnsupportedFormat(format!(".{}", other))),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OutputFormat::Json => "json",
            OutputFormat::Jsonl => "jsonl",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Text => "text",
        })
    }
}
