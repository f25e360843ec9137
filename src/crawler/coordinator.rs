//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the worker pool that drains the frontier:
//! - Seeding the frontier or restoring it from a checkpoint
//! - Running `max_concurrency` workers against the shared frontier
//! - Coordinating fetching, extraction, and link discovery
//! - Periodic and final checkpoints
//! - Cancellation

use crate::checkpoint::CheckpointManager;
use crate::config::{config_fingerprint, validate, validate_start_url, Config};
use crate::crawler::extractor::{Extracted, Extractor, HtmlExtractor};
use crate::crawler::fetcher::{FetchResponse, Fetcher, HttpFetcher};
use crate::crawler::page::Page;
use crate::filter::FilterEngine;
use crate::frontier::{CrawlState, EnqueueOutcome, Frontier, FrontierEntry};
use crate::url::{extract_domain, normalize_url};
use crate::YoinkError;
use chrono::Utc;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Log a progress line every this many crawled pages
const PROGRESS_EVERY: u64 = 10;

/// Why a crawl stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// `max_pages` pages were crawled
    BudgetReached,
    /// Nothing left to crawl
    FrontierExhausted,
    /// Stopped by an external signal
    Cancelled,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::BudgetReached => write!(f, "page budget reached"),
            StopReason::FrontierExhausted => write!(f, "frontier exhausted"),
            StopReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Outcome of a finished crawl
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every page of the crawl in completion order, starting with the
    /// pages restored from the checkpoint
    pub pages: Vec<Page>,
    /// How many of `pages` came from the checkpoint
    pub restored_pages: usize,
    /// Total successful crawls, including earlier resumed runs
    pub crawled: u64,
    /// Total failed fetches, including earlier resumed runs
    pub failed: u64,
    pub visited: usize,
    pub pending: usize,
    pub filtered: usize,
    pub stop_reason: StopReason,
    /// Frontier was restored from a checkpoint
    pub resumed: bool,
    /// The restored checkpoint was written with different crawl settings
    pub fingerprint_mismatch: bool,
    /// The final checkpoint write succeeded (false when checkpointing is off)
    pub checkpoint_saved: bool,
    /// Frontier state at the end of the run
    pub final_state: CrawlState,
    pub elapsed: Duration,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    start_url: Url,
    fingerprint: String,
    frontier: Arc<Mutex<Frontier>>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    checkpoint: Option<CheckpointManager>,
    cancel: CancellationToken,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Validates the configuration and start URL, compiles the filter
    /// rules and builds the default HTTP fetcher and HTML extractor.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawl configuration
    /// * `start_url` - Absolute http(s) URL crawled at depth 0
    pub fn new(config: Config, start_url: &str) -> Result<Self, YoinkError> {
        validate(&config)?;
        let start_url = normalize_url(validate_start_url(start_url)?.as_str())?;

        let mut filter = FilterEngine::new(&config.filters)?;
        if !config.crawler.follow_external {
            if let Some(host) = extract_domain(&start_url) {
                filter = filter.with_scope_host(host);
            }
        }

        let frontier = Frontier::new(
            Arc::new(filter),
            config.crawler.max_depth,
            config.crawler.max_pages,
        );
        let fetcher = HttpFetcher::new(&config.crawler)?;
        let extractor = HtmlExtractor::new(config.crawler.extract_text);
        let fingerprint = config_fingerprint(&config, start_url.as_str());

        Ok(Self {
            config: Arc::new(config),
            start_url,
            fingerprint,
            frontier: Arc::new(Mutex::new(frontier)),
            fetcher: Arc::new(fetcher),
            extractor: Arc::new(extractor),
            checkpoint: None,
            cancel: CancellationToken::new(),
        })
    }

    /// Replaces the page fetcher
    pub fn with_fetcher(mut self, fetcher: Arc<dyn Fetcher>) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replaces the page extractor
    pub fn with_extractor(mut self, extractor: Arc<dyn Extractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Uses this checkpoint manager instead of opening `checkpoint.location`
    ///
    /// The manager's interval and fingerprint are overwritten from the
    /// coordinator's config when the crawl starts.
    pub fn with_checkpoint(mut self, manager: CheckpointManager) -> Self {
        self.checkpoint = Some(manager);
        self
    }

    /// Uses an existing cancellation token
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Token that stops the crawl when cancelled
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn start_url(&self) -> &Url {
        &self.start_url
    }

    /// Runs the crawl to completion, budget exhaustion or cancellation
    ///
    /// # Algorithm
    ///
    /// 1. Restore the frontier from the checkpoint when resuming, else seed
    ///    it with the start URL at depth 0
    /// 2. Spawn `max_concurrency` workers; each dequeues, fetches, extracts,
    ///    enqueues discovered links at depth + 1 and records the outcome
    /// 3. Every `checkpoint.interval` crawled pages, save a snapshot in the
    ///    background
    /// 4. When every worker has stopped, write a final checkpoint
    ///
    /// # Errors
    ///
    /// A corrupt checkpoint aborts the run before any crawling. Checkpoint
    /// write failures are logged and never abort the run.
    pub async fn run(mut self) -> Result<CrawlReport, YoinkError> {
        let started = Instant::now();
        let checkpoint = self.open_checkpoint().await?;
        let Prepared {
            resumed,
            fingerprint_mismatch,
            restored_pages,
        } = self.prepare(checkpoint.as_deref()).await?;
        let restored_count = restored_pages.len();

        {
            let frontier = self.frontier.lock().await;
            tracing::info!(
                "Starting crawl of {} (max depth {}, budget {}, {} workers, {} pending)",
                self.start_url,
                self.config.crawler.max_depth,
                self.config.crawler.max_pages,
                self.config.crawler.max_concurrency,
                frontier.pending_len()
            );
        }

        let pool_cancel = self.cancel.child_token();
        let ctx = Arc::new(WorkerContext {
            frontier: Arc::clone(&self.frontier),
            fetcher: Arc::clone(&self.fetcher),
            extractor: Arc::clone(&self.extractor),
            checkpoint: checkpoint.clone(),
            cancel: pool_cancel.clone(),
            work_available: Notify::new(),
            pages: Mutex::new(PageLog::restored(restored_pages)),
            save_html: self.config.crawler.save_html,
            started,
        });

        let mut workers = JoinSet::new();
        for worker_id in 0..self.config.crawler.max_concurrency {
            workers.spawn(worker_loop(Arc::clone(&ctx), worker_id));
        }

        let mut worker_failure = None;
        while let Some(result) = workers.join_next().await {
            if let Err(e) = result {
                tracing::error!("Crawl worker failed: {}", e);
                pool_cancel.cancel();
                worker_failure.get_or_insert_with(|| e.to_string());
            }
        }

        let (final_state, budget_exhausted) = {
            let frontier = self.frontier.lock().await;
            (frontier.snapshot(), frontier.budget_exhausted())
        };

        let unsaved = ctx.pages.lock().await.take_unsaved();
        let checkpoint_saved = match &checkpoint {
            Some(manager) => match manager.save(final_state.clone(), unsaved).await {
                Ok(()) => {
                    tracing::info!(
                        "Final checkpoint saved to {} ({} crawled, {} pending)",
                        manager.location(),
                        final_state.counters.crawled,
                        final_state.pending.len()
                    );
                    true
                }
                Err(e) => {
                    tracing::warn!("Final checkpoint write failed: {}", e);
                    false
                }
            },
            None => false,
        };

        if let Some(message) = worker_failure {
            return Err(YoinkError::Worker(message));
        }

        let stop_reason = if budget_exhausted {
            StopReason::BudgetReached
        } else if self.cancel.is_cancelled() {
            StopReason::Cancelled
        } else {
            StopReason::FrontierExhausted
        };

        let pages = std::mem::take(&mut ctx.pages.lock().await.pages);
        let elapsed = started.elapsed();

        tracing::info!(
            "Crawl finished ({}): {} pages crawled, {} failed, {} pending in {:?}",
            stop_reason,
            final_state.counters.crawled,
            final_state.counters.failed,
            final_state.pending.len(),
            elapsed
        );

        Ok(CrawlReport {
            pages,
            restored_pages: restored_count,
            crawled: final_state.counters.crawled,
            failed: final_state.counters.failed,
            visited: final_state.visited.len(),
            pending: final_state.pending.len(),
            filtered: final_state.filtered_out.len(),
            stop_reason,
            resumed,
            fingerprint_mismatch,
            checkpoint_saved,
            final_state,
            elapsed,
        })
    }

    async fn open_checkpoint(&mut self) -> Result<Option<Arc<CheckpointManager>>, YoinkError> {
        let manager = match self.checkpoint.take() {
            Some(manager) => manager,
            None => match &self.config.checkpoint.location {
                Some(location) => CheckpointManager::open(location).await?,
                None => return Ok(None),
            },
        };

        Ok(Some(Arc::new(
            manager
                .with_interval(self.config.checkpoint.interval)
                .with_fingerprint(self.fingerprint.clone()),
        )))
    }

    /// Restores or seeds the frontier
    async fn prepare(&self, checkpoint: Option<&CheckpointManager>) -> Result<Prepared, YoinkError> {
        if self.config.checkpoint.resume {
            match checkpoint {
                Some(manager) => {
                    if let Some(loaded) = manager.load().await? {
                        let mut frontier = self.frontier.lock().await;
                        let dropped = frontier.restore(loaded.state);
                        tracing::info!(
                            "Resumed from checkpoint saved at {}: {} crawled, {} visited, {} pending, {} pages restored",
                            loaded.saved_at.to_rfc3339(),
                            frontier.crawled(),
                            frontier.visited_len(),
                            frontier.pending_len(),
                            loaded.pages.len()
                        );
                        if dropped > 0 {
                            tracing::warn!(
                                "Dropped {} pending entries that no longer fit the frontier",
                                dropped
                            );
                        }
                        return Ok(Prepared {
                            resumed: true,
                            fingerprint_mismatch: !loaded.fingerprint_matches,
                            restored_pages: loaded.pages,
                        });
                    }
                    tracing::warn!(
                        "No checkpoint found at {}, starting a fresh crawl",
                        manager.location()
                    );
                }
                None => {
                    tracing::warn!("Resume requested without a checkpoint location, starting fresh")
                }
            }
        }

        let mut frontier = self.frontier.lock().await;
        let outcome = frontier.try_enqueue(self.start_url.as_str(), 0, None);
        if !outcome.is_enqueued() {
            tracing::warn!("Start URL {} was not enqueued: {}", self.start_url, outcome);
        }

        Ok(Prepared::default())
    }
}

#[derive(Default)]
struct Prepared {
    resumed: bool,
    fingerprint_mismatch: bool,
    restored_pages: Vec<Page>,
}

/// Pages of the crawl, split at what checkpoints have already taken
struct PageLog {
    pages: Vec<Page>,
    handed_off: usize,
}

impl PageLog {
    fn restored(pages: Vec<Page>) -> Self {
        let handed_off = pages.len();
        Self { pages, handed_off }
    }

    /// Pages no checkpoint save has taken yet
    fn take_unsaved(&mut self) -> Vec<Page> {
        let unsaved = self.pages[self.handed_off..].to_vec();
        self.handed_off = self.pages.len();
        unsaved
    }
}

/// State shared by every worker in the pool
struct WorkerContext {
    frontier: Arc<Mutex<Frontier>>,
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    checkpoint: Option<Arc<CheckpointManager>>,
    cancel: CancellationToken,
    work_available: Notify,
    pages: Mutex<PageLog>,
    save_html: bool,
    started: Instant,
}

enum Next {
    Work(FrontierEntry),
    Wait,
    Done,
}

async fn worker_loop(ctx: Arc<WorkerContext>, worker_id: usize) {
    loop {
        // Registered before the frontier check so a wakeup between the
        // check and the wait is not lost.
        let notified = ctx.work_available.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if ctx.cancel.is_cancelled() {
            break;
        }

        let next = {
            let mut frontier = ctx.frontier.lock().await;
            if frontier.remaining_budget() == 0 {
                Next::Done
            } else {
                match frontier.dequeue() {
                    Some(entry) => Next::Work(entry),
                    None if frontier.in_flight_len() == 0 => Next::Done,
                    None => Next::Wait,
                }
            }
        };

        match next {
            Next::Work(entry) => {
                ctx.process(entry, worker_id).await;
                ctx.work_available.notify_waiters();
            }
            Next::Wait => {
                tokio::select! {
                    _ = &mut notified => {}
                    _ = ctx.cancel.cancelled() => break,
                }
            }
            Next::Done => {
                ctx.work_available.notify_waiters();
                break;
            }
        }
    }

    tracing::trace!("Worker {} stopped", worker_id);
}

impl WorkerContext {
    async fn process(&self, entry: FrontierEntry, worker_id: usize) {
        tracing::debug!(
            "Worker {} fetching {} (depth {})",
            worker_id,
            entry.url,
            entry.depth
        );

        let response = match self.fetcher.fetch(&entry.url).await {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!("Failed to fetch {}: {}", entry.url, e);
                self.frontier.lock().await.record_failure(&entry.url);
                return;
            }
        };

        let extracted = self.extract(&entry, &response);
        let page = Page {
            url: entry.url.clone(),
            title: extracted.title,
            text: extracted.text,
            html: self.save_html.then(|| response.body.clone()),
            links: extracted.links,
            metadata: extracted.metadata,
            crawled_at: Utc::now(),
            status_code: response.status_code,
            depth: entry.depth,
        };

        let url = page.url.clone();
        let link_count = page.links.len();

        // The page joins the log in the same critical section that counts
        // it, so any snapshot that counts a page also hands it to storage.
        let (crawled, pending, save) = {
            let mut frontier = self.frontier.lock().await;

            let next_depth = entry.depth + 1;
            if next_depth <= frontier.max_depth() {
                for link in &page.links {
                    match frontier.try_enqueue(link, next_depth, Some(&entry.url)) {
                        EnqueueOutcome::Enqueued => {
                            tracing::trace!("Enqueued {} at depth {}", link, next_depth)
                        }
                        EnqueueOutcome::Filtered(reason) => {
                            tracing::trace!("Filtered {}: {}", link, reason)
                        }
                        _ => {}
                    }
                }
            }

            let crawled = frontier.record_success(&entry.url);
            let mut log = self.pages.lock().await;
            log.pages.push(page);

            let save = match &self.checkpoint {
                Some(manager) if manager.is_due(crawled) => match manager.try_reserve() {
                    Some(slot) => Some((slot, frontier.snapshot(), log.take_unsaved())),
                    None => {
                        tracing::debug!(
                            "Checkpoint write already in progress, skipping save at {} pages",
                            crawled
                        );
                        None
                    }
                },
                _ => None,
            };
            (crawled, frontier.pending_len(), save)
        };

        tracing::info!("[{}] {} ({} links)", crawled, url, link_count);

        if let Some((slot, state, pages)) = save {
            slot.save_in_background(state, pages);
        }

        if crawled % PROGRESS_EVERY == 0 {
            let elapsed = self.started.elapsed();
            let rate = crawled as f64 / elapsed.as_secs_f64().max(f64::EPSILON);
            tracing::info!(
                "Progress: {} pages crawled, {} pending, {:.2} pages/sec",
                crawled,
                pending,
                rate
            );
        }
    }

    /// Runs the extractor; failures yield an empty extraction so the page
    /// is still recorded
    fn extract(&self, entry: &FrontierEntry, response: &FetchResponse) -> Extracted {
        let base = Url::parse(&response.final_url).or_else(|_| Url::parse(&entry.url));
        let result = match base {
            Ok(base) => self.extractor.extract(response, &base).map_err(|e| e.to_string()),
            Err(e) => Err(e.to_string()),
        };

        result.unwrap_or_else(|e| {
            tracing::warn!("Extraction failed for {}: {}", entry.url, e);
            Extracted::default()
        })
    }
}

/// Runs a crawl with the default HTTP fetcher and HTML extractor
///
/// # Example
///
/// ```no_run
/// use yoink::config::Config;
/// use yoink::crawler::run_crawl;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(Config::default(), "https://example.com/").await?;
/// println!("crawled {} pages", report.crawled);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config, start_url: &str) -> Result<CrawlReport, YoinkError> {
    Coordinator::new(config, start_url)?.run().await
}
