use crate::checkpoint::record::CheckpointRecord;
use crate::checkpoint::CheckpointError;
use crate::crawler::Page;
use crate::frontier::CrawlState;
use crate::storage::{open_location, StorageBackend, StorageError};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::task::JoinHandle;

/// A checkpoint read back from storage
#[derive(Debug, Clone)]
pub struct LoadedCheckpoint {
    pub state: CrawlState,
    /// Pages produced by the runs that led to this checkpoint
    pub pages: Vec<Page>,
    pub saved_at: DateTime<Utc>,
    pub stored_fingerprint: String,
    pub fingerprint_matches: bool,
}

/// What has been made durable so far
///
/// Guarded by the write slot, so only the current writer touches it.
#[derive(Debug, Default)]
struct Journal {
    /// Page segments listed by the last stored record
    segments: Vec<String>,
    /// Pages handed to a save whose segment was not stored yet
    unwritten: Vec<Page>,
    /// `counters.crawled` of the last stored record
    last_crawled: Option<u64>,
}

/// Saves and restores crawl state through a storage backend
///
/// At most one write is in flight at a time. Periodic saves that arrive
/// while a write is running are dropped; the next interval picks up the
/// newer state. Pages are stored in numbered JSONL segments next to the
/// record, and a segment is always stored before the record naming it.
pub struct CheckpointManager {
    backend: Arc<dyn StorageBackend>,
    key: String,
    fingerprint: String,
    interval: u64,
    write_slot: Arc<Mutex<Journal>>,
}

/// Exclusive right to write the next checkpoint
///
/// Reserve it before taking the snapshot it will store, so snapshots reach
/// storage in the order they were taken.
pub struct CheckpointSlot {
    manager: Arc<CheckpointManager>,
    journal: OwnedMutexGuard<Journal>,
}

impl std::fmt::Debug for CheckpointManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckpointManager")
            .field("backend", &self.backend.describe())
            .field("key", &self.key)
            .field("interval", &self.interval)
            .finish()
    }
}

impl CheckpointManager {
    pub fn new(backend: Arc<dyn StorageBackend>, key: impl Into<String>) -> Self {
        Self {
            backend,
            key: key.into(),
            fingerprint: String::new(),
            interval: 10,
            write_slot: Arc::new(Mutex::new(Journal::default())),
        }
    }

    /// Opens the backend named by a location string (`s3://...` or a path)
    pub async fn open(location: &str) -> Result<Self, CheckpointError> {
        let (backend, key) = open_location(location).await?;
        Ok(Self::new(backend, key))
    }

    pub fn with_interval(mut self, interval: u64) -> Self {
        self.interval = interval.max(1);
        self
    }

    pub fn with_fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.fingerprint = fingerprint.into();
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn interval(&self) -> u64 {
        self.interval
    }

    pub fn fingerprint(&self) -> &str {
        &self.fingerprint
    }

    pub fn location(&self) -> String {
        format!("{} ({})", self.key, self.backend.describe())
    }

    /// True when `crawled` lands on a checkpoint boundary
    pub fn is_due(&self, crawled: u64) -> bool {
        crawled > 0 && crawled % self.interval == 0
    }

    /// Storage key of the `index`-th page segment
    pub fn segment_key(&self, index: usize) -> String {
        format!("{}.pages.{:06}.jsonl", self.key, index)
    }

    /// Writes a snapshot, waiting for any running write to finish first
    ///
    /// Used for the final save at the end of a run, which must not be
    /// skipped. `pages` are the pages counted in `state` that no earlier
    /// save has taken.
    pub async fn save(&self, state: CrawlState, pages: Vec<Page>) -> Result<(), CheckpointError> {
        let mut journal = self.write_slot.lock().await;
        self.write(&mut journal, state, pages).await
    }

    /// Reserves the write slot unless a write is already running
    pub fn try_reserve(self: &Arc<Self>) -> Option<CheckpointSlot> {
        match self.write_slot.clone().try_lock_owned() {
            Ok(journal) => Some(CheckpointSlot {
                manager: Arc::clone(self),
                journal,
            }),
            Err(_) => None,
        }
    }

    async fn write(
        &self,
        journal: &mut Journal,
        state: CrawlState,
        pages: Vec<Page>,
    ) -> Result<(), CheckpointError> {
        journal.unwritten.extend(pages);

        let crawled = state.counters.crawled;
        if let Some(last) = journal.last_crawled {
            if crawled < last {
                tracing::debug!(
                    "Skipping checkpoint at {} pages, {} already stored",
                    crawled,
                    last
                );
                return Ok(());
            }
        }

        let mut segments = journal.segments.clone();
        if !journal.unwritten.is_empty() {
            let segment = self.segment_key(segments.len());
            let bytes = encode_pages(&journal.unwritten)?;
            self.backend.put(&segment, &bytes).await?;
            segments.push(segment);
        }

        let record = CheckpointRecord::new(state, self.fingerprint.clone())
            .with_page_segments(segments.clone());
        let bytes = record.encode()?;
        self.backend.put(&self.key, &bytes).await?;

        tracing::debug!(
            "Wrote checkpoint to {} ({} bytes, {} visited, {} pending, {} new pages)",
            self.location(),
            bytes.len(),
            record.visited.len(),
            record.pending.len(),
            journal.unwritten.len()
        );

        journal.segments = segments;
        journal.unwritten.clear();
        journal.last_crawled = Some(crawled);
        Ok(())
    }

    /// Reads the stored checkpoint and the pages it lists
    ///
    /// Returns `Ok(None)` when nothing has been saved yet. A record that
    /// exists but cannot be decoded, or that names a missing or unreadable
    /// page segment, is an error; callers must not fall back to a fresh
    /// crawl in that case.
    pub async fn load(&self) -> Result<Option<LoadedCheckpoint>, CheckpointError> {
        let bytes = match self.backend.get(&self.key).await {
            Ok(bytes) => bytes,
            Err(StorageError::NotFound(_)) => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record = CheckpointRecord::decode(&self.key, &bytes)?;
        let fingerprint_matches =
            self.fingerprint.is_empty() || record.config_fingerprint == self.fingerprint;

        if !fingerprint_matches {
            tracing::warn!(
                "Checkpoint {} was written with different crawl settings (stored fingerprint {}, current {})",
                self.location(),
                short(&record.config_fingerprint),
                short(&self.fingerprint)
            );
        }

        let mut pages = Vec::new();
        for segment in &record.page_segments {
            let bytes = self.backend.get(segment).await.map_err(|e| match e {
                StorageError::NotFound(_) => CheckpointError::Corrupt {
                    key: segment.clone(),
                    reason: "page segment is missing".to_string(),
                },
                other => other.into(),
            })?;
            pages.extend(decode_pages(segment, &bytes)?);
        }

        if pages.len() as u64 != record.counters.crawled {
            tracing::warn!(
                "Checkpoint {} counts {} crawled pages but stores {}",
                self.location(),
                record.counters.crawled,
                pages.len()
            );
        }

        {
            let mut journal = self.write_slot.lock().await;
            journal.segments = record.page_segments.clone();
            journal.last_crawled = Some(record.counters.crawled);
        }

        Ok(Some(LoadedCheckpoint {
            saved_at: record.saved_at,
            stored_fingerprint: record.config_fingerprint.clone(),
            fingerprint_matches,
            state: record.into_state(),
            pages,
        }))
    }

    /// Checks whether a checkpoint exists without reading it
    pub async fn exists(&self) -> Result<bool, CheckpointError> {
        Ok(self.backend.exists(&self.key).await?)
    }
}

impl CheckpointSlot {
    /// Writes the snapshot on a background task
    ///
    /// Write failures are logged and never reach the caller. Pages of a
    /// failed write are kept and go out with the next save.
    pub fn save_in_background(self, state: CrawlState, pages: Vec<Page>) -> JoinHandle<()> {
        let CheckpointSlot {
            manager,
            mut journal,
        } = self;

        tokio::spawn(async move {
            let crawled = state.counters.crawled;
            match manager.write(&mut journal, state, pages).await {
                Ok(()) => tracing::info!("Checkpoint saved at {} pages", crawled),
                Err(e) => tracing::warn!("Checkpoint write failed at {} pages: {}", crawled, e),
            }
        })
    }
}

fn encode_pages(pages: &[Page]) -> Result<Vec<u8>, CheckpointError> {
    let mut out = Vec::new();
    for page in pages {
        serde_json::to_writer(&mut out, page).map_err(CheckpointError::Encode)?;
        out.push(b'\n');
    }
    Ok(out)
}

fn decode_pages(key: &str, bytes: &[u8]) -> Result<Vec<Page>, CheckpointError> {
    serde_json::Deserializer::from_slice(bytes)
        .into_iter::<Page>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| CheckpointError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
}

fn short(fingerprint: &str) -> &str {
    fingerprint.get(..12).unwrap_or(fingerprint)
}
