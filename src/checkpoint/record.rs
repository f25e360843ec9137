use crate::checkpoint::CheckpointError;
use crate::frontier::{Counters, CrawlState, FrontierEntry};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Current on-disk record version
pub const RECORD_VERSION: u32 = 1;

/// Persisted checkpoint
///
/// ```json
/// {
///   "version": 1,
///   "saved_at": "2025-01-01T00:00:00Z",
///   "visited": ["https://example.com/"],
///   "pending": [{"url": "https://example.com/a", "depth": 1, "discovered_from": "https://example.com/"}],
///   "filtered_out": {"https://example.com/a.pdf": "denied extension: .pdf"},
///   "counters": {"crawled": 1, "failed": 0},
///   "config_fingerprint": "9f86d0...",
///   "page_segments": ["crawl.json.pages.000000.jsonl"]
/// }
/// ```
///
/// `page_segments` names the JSONL objects holding every page counted in
/// `counters.crawled`. They are written before the record that lists them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckpointRecord {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub visited: BTreeSet<String>,
    pub pending: Vec<FrontierEntry>,
    pub filtered_out: BTreeMap<String, String>,
    pub counters: Counters,
    pub config_fingerprint: String,
    #[serde(default)]
    pub page_segments: Vec<String>,
}

impl CheckpointRecord {
    pub fn new(state: CrawlState, config_fingerprint: impl Into<String>) -> Self {
        Self {
            version: RECORD_VERSION,
            saved_at: Utc::now(),
            visited: state.visited,
            pending: state.pending,
            filtered_out: state.filtered_out,
            counters: state.counters,
            config_fingerprint: config_fingerprint.into(),
            page_segments: Vec::new(),
        }
    }

    pub fn with_page_segments(mut self, segments: Vec<String>) -> Self {
        self.page_segments = segments;
        self
    }

    pub fn into_state(self) -> CrawlState {
        CrawlState {
            visited: self.visited,
            pending: self.pending,
            filtered_out: self.filtered_out,
            counters: self.counters,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, CheckpointError> {
        serde_json::to_vec(self).map_err(CheckpointError::Encode)
    }

    /// Parses and sanity-checks a stored record
    ///
    /// Anything that does not parse, carries an unknown version, or lists a
    /// URL as both visited and pending is reported as corrupt.
    pub fn decode(key: &str, bytes: &[u8]) -> Result<Self, CheckpointError> {
        let record: CheckpointRecord =
            serde_json::from_slice(bytes).map_err(|e| CheckpointError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })?;

        if record.version != RECORD_VERSION {
            return Err(CheckpointError::Corrupt {
                key: key.to_string(),
                reason: format!(
                    "unsupported record version {} (expected {})",
                    record.version, RECORD_VERSION
                ),
            });
        }

        if let Some(entry) = record
            .pending
            .iter()
            .find(|entry| record.visited.contains(&entry.url))
        {
            return Err(CheckpointError::Corrupt {
                key: key.to_string(),
                reason: format!("'{}' is both visited and pending", entry.url),
            });
        }

        Ok(record)
    }
}
