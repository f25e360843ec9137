use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// A URL waiting to be crawled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    /// Canonical URL
    pub url: String,

    /// Link distance from the start URL
    pub depth: u32,

    /// Page the link was found on; `None` for the start URL
    #[serde(default)]
    pub discovered_from: Option<String>,
}

impl FrontierEntry {
    pub fn seed(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            depth: 0,
            discovered_from: None,
        }
    }
}

/// Running totals carried across resumes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Counters {
    pub crawled: u64,
    pub failed: u64,
}

/// Serializable snapshot of a frontier
///
/// Sets and maps are ordered so two snapshots of the same frontier compare
/// and serialize identically. `pending` keeps dequeue order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlState {
    pub visited: BTreeSet<String>,
    pub pending: Vec<FrontierEntry>,
    pub filtered_out: BTreeMap<String, String>,
    pub counters: Counters,
}

impl CrawlState {
    pub fn is_empty(&self) -> bool {
        self.visited.is_empty() && self.pending.is_empty() && self.filtered_out.is_empty()
    }
}
