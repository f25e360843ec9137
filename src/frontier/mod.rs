//! Crawl frontier
//!
//! The [`Frontier`] owns every piece of crawl state that workers share: the
//! visited set, the pending queue, the filtered-out map and the counters.
//! It is a plain synchronous structure; the coordinator wraps it in a single
//! `tokio::sync::Mutex` so that each operation runs as one critical section.
//!
//! Invariants kept by every operation:
//!
//! - a canonical URL is in at most one of `visited` and `pending`
//! - no pending entry is deeper than `max_depth`
//! - pending entries are dequeued lowest depth first, FIFO within a depth
//! - `crawled + in_flight` never exceeds the page budget

mod state;

pub use state::{Counters, CrawlState, FrontierEntry};

use crate::filter::FilterEngine;
use crate::url::canonicalize;
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Outcome of [`Frontier::try_enqueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Added to the pending queue
    Enqueued,
    /// Already visited, in flight or pending
    Duplicate,
    /// Deeper than the configured maximum
    DepthExceeded { depth: u32, max_depth: u32 },
    /// Rejected by the filter engine, now or on an earlier attempt
    Filtered(String),
    /// Could not be canonicalized
    Invalid(String),
}

impl EnqueueOutcome {
    pub fn is_enqueued(&self) -> bool {
        matches!(self, EnqueueOutcome::Enqueued)
    }
}

impl fmt::Display for EnqueueOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnqueueOutcome::Enqueued => write!(f, "enqueued"),
            EnqueueOutcome::Duplicate => write!(f, "duplicate"),
            EnqueueOutcome::DepthExceeded { depth, max_depth } => {
                write!(f, "depth {} exceeds max depth {}", depth, max_depth)
            }
            EnqueueOutcome::Filtered(reason) => write!(f, "filtered: {}", reason),
            EnqueueOutcome::Invalid(reason) => write!(f, "invalid url: {}", reason),
        }
    }
}

/// Pending-URL queue with deduplication and strict breadth-first order
#[derive(Debug)]
pub struct Frontier {
    filter: Arc<FilterEngine>,
    max_depth: u32,
    max_pages: u64,

    visited: HashSet<String>,
    queued: HashSet<String>,
    pending: BTreeMap<u32, VecDeque<FrontierEntry>>,
    in_flight: HashMap<String, FrontierEntry>,
    filtered_out: HashMap<String, String>,

    crawled: u64,
    failed: u64,
}

impl Frontier {
    pub fn new(filter: Arc<FilterEngine>, max_depth: u32, max_pages: u64) -> Self {
        Self {
            filter,
            max_depth,
            max_pages,
            visited: HashSet::new(),
            queued: HashSet::new(),
            pending: BTreeMap::new(),
            in_flight: HashMap::new(),
            filtered_out: HashMap::new(),
            crawled: 0,
            failed: 0,
        }
    }

    /// Offers a URL to the frontier
    ///
    /// The URL is canonicalized first, so `/y` and `/y#frag` are the same
    /// entry. A URL the filter rejected once is never re-evaluated.
    pub fn try_enqueue(
        &mut self,
        url: &str,
        depth: u32,
        discovered_from: Option<&str>,
    ) -> EnqueueOutcome {
        let canonical = match canonicalize(url) {
            Ok(canonical) => canonical,
            Err(e) => return EnqueueOutcome::Invalid(e.to_string()),
        };

        if depth > self.max_depth {
            return EnqueueOutcome::DepthExceeded {
                depth,
                max_depth: self.max_depth,
            };
        }

        if self.visited.contains(&canonical) || self.queued.contains(&canonical) {
            return EnqueueOutcome::Duplicate;
        }

        if let Some(reason) = self.filtered_out.get(&canonical) {
            return EnqueueOutcome::Filtered(reason.clone());
        }

        let admission = self.filter.admit_str(&canonical);
        if !admission.accept {
            self.filtered_out
                .insert(canonical, admission.reason.clone());
            return EnqueueOutcome::Filtered(admission.reason);
        }

        self.queued.insert(canonical.clone());
        self.pending
            .entry(depth)
            .or_default()
            .push_back(FrontierEntry {
                url: canonical,
                depth,
                discovered_from: discovered_from.map(str::to_string),
            });

        EnqueueOutcome::Enqueued
    }

    /// Takes the next entry in breadth-first order
    ///
    /// The URL is marked visited immediately so a sibling worker cannot
    /// enqueue it again while the fetch is running. Returns `None` when
    /// the queue is empty or the page budget is fully claimed.
    pub fn dequeue(&mut self) -> Option<FrontierEntry> {
        if self.crawled + self.in_flight.len() as u64 >= self.max_pages {
            return None;
        }

        let (&depth, queue) = self.pending.iter_mut().next()?;
        let entry = queue.pop_front();
        if queue.is_empty() {
            self.pending.remove(&depth);
        }
        let entry = entry?;

        self.queued.remove(&entry.url);
        self.visited.insert(entry.url.clone());
        self.in_flight.insert(entry.url.clone(), entry.clone());

        Some(entry)
    }

    /// Marks an in-flight URL as successfully crawled and returns the new
    /// crawled count
    pub fn record_success(&mut self, url: &str) -> u64 {
        if self.in_flight.remove(url).is_some() {
            self.crawled += 1;
        }
        self.crawled
    }

    /// Marks an in-flight URL as failed and returns the new failed count
    pub fn record_failure(&mut self, url: &str) -> u64 {
        if self.in_flight.remove(url).is_some() {
            self.failed += 1;
        }
        self.failed
    }

    /// Takes a consistent snapshot of the frontier
    ///
    /// In-flight URLs have not produced a page or a failure yet, so they are
    /// reported as pending rather than visited and will be retried after a
    /// resume.
    pub fn snapshot(&self) -> CrawlState {
        let mut in_flight: Vec<FrontierEntry> = self.in_flight.values().cloned().collect();
        in_flight.sort_by(|a, b| a.depth.cmp(&b.depth).then_with(|| a.url.cmp(&b.url)));

        let visited = self
            .visited
            .iter()
            .filter(|url| !self.in_flight.contains_key(*url))
            .cloned()
            .collect();

        let pending = in_flight
            .into_iter()
            .chain(self.pending.values().flat_map(|q| q.iter().cloned()))
            .collect();

        CrawlState {
            visited,
            pending,
            filtered_out: self
                .filtered_out
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            counters: Counters {
                crawled: self.crawled,
                failed: self.failed,
            },
        }
    }

    /// Replaces all frontier state with a snapshot
    ///
    /// Pending entries that are already visited, repeated, or deeper than
    /// the current `max_depth` are dropped so the restored frontier keeps
    /// the same invariants as a live one. Returns the number of entries
    /// dropped.
    pub fn restore(&mut self, state: CrawlState) -> usize {
        self.visited = state.visited.into_iter().collect();
        self.filtered_out = state.filtered_out.into_iter().collect();
        self.crawled = state.counters.crawled;
        self.failed = state.counters.failed;
        self.queued.clear();
        self.pending.clear();
        self.in_flight.clear();

        let mut dropped = 0;
        for entry in state.pending {
            if entry.depth > self.max_depth
                || self.visited.contains(&entry.url)
                || !self.queued.insert(entry.url.clone())
            {
                dropped += 1;
                continue;
            }
            self.pending.entry(entry.depth).or_default().push_back(entry);
        }

        dropped
    }

    /// Page budget minus pages crawled so far
    pub fn remaining_budget(&self) -> u64 {
        self.max_pages.saturating_sub(self.crawled)
    }

    pub fn budget_exhausted(&self) -> bool {
        self.crawled >= self.max_pages
    }

    pub fn max_depth(&self) -> u32 {
        self.max_depth
    }

    pub fn crawled(&self) -> u64 {
        self.crawled
    }

    pub fn failed(&self) -> u64 {
        self.failed
    }

    pub fn pending_len(&self) -> usize {
        self.queued.len()
    }

    pub fn visited_len(&self) -> usize {
        self.visited.len()
    }

    pub fn in_flight_len(&self) -> usize {
        self.in_flight.len()
    }

    pub fn filtered_len(&self) -> usize {
        self.filtered_out.len()
    }
}
