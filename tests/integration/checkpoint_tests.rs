use crate::support::{link_page, test_config, tree_site, ScriptedFetcher};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use yoink::checkpoint::CheckpointManager;
use yoink::config::Config;
use yoink::crawler::{Coordinator, CrawlReport, StopReason};
use yoink::storage::{LocalStorage, MemoryStorage, StorageBackend};
use yoink::YoinkError;

const KEY: &str = "crawl.json";

fn checkpointed(mut config: Config, resume: bool) -> Config {
    config.checkpoint.location = Some(KEY.to_string());
    config.checkpoint.interval = 1;
    config.checkpoint.resume = resume;
    config
}

async fn crawl_with(
    config: Config,
    storage: Arc<MemoryStorage>,
    fetcher: Arc<ScriptedFetcher>,
) -> Result<CrawlReport, YoinkError> {
    Coordinator::new(config, "https://site.test/")?
        .with_fetcher(fetcher)
        .with_checkpoint(CheckpointManager::new(storage, KEY))
        .run()
        .await
}

fn page_urls(report: &CrawlReport) -> BTreeSet<String> {
    report.pages.iter().map(|p| p.url.clone()).collect()
}

#[tokio::test]
async fn test_resumed_crawl_matches_uninterrupted_crawl() {
    let baseline = Coordinator::new(test_config(2, 100, 1), "https://site.test/")
        .unwrap()
        .with_fetcher(Arc::new(ScriptedFetcher::new(&tree_site())))
        .run()
        .await
        .unwrap();

    let storage = Arc::new(MemoryStorage::new());

    let first_fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));
    let first = crawl_with(
        checkpointed(test_config(2, 3, 2), false),
        storage.clone(),
        first_fetcher.clone(),
    )
    .await
    .unwrap();
    assert_eq!(first.crawled, 3);
    assert_eq!(first.stop_reason, StopReason::BudgetReached);
    assert!(first.checkpoint_saved);

    let second_fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));
    let second = crawl_with(
        checkpointed(test_config(2, 100, 2), true),
        storage.clone(),
        second_fetcher.clone(),
    )
    .await
    .unwrap();

    assert!(second.resumed);
    assert!(!second.fingerprint_mismatch);
    assert_eq!(second.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(second.crawled, baseline.crawled);
    assert_eq!(second.final_state.visited, baseline.final_state.visited);
    assert!(second.final_state.pending.is_empty());

    // Restored pages come first and nothing from the first run is fetched again
    assert_eq!(second.restored_pages, 3);
    assert_eq!(second.pages.len(), 8);
    assert_eq!(page_urls(&second), page_urls(&baseline));
    assert_eq!(second.pages[..3], first.pages[..]);
    for url in page_urls(&first) {
        assert_eq!(second_fetcher.fetch_count(&url), 0, "{} refetched", url);
    }
    assert_eq!(second_fetcher.total_fetches(), 5);
}

#[tokio::test]
async fn test_final_checkpoint_records_pending_links() {
    let storage = Arc::new(MemoryStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new(&[(
        "https://site.test/",
        link_page("Root", &["/1", "/2", "/3", "/4", "/5"]),
    )]));

    let report = crawl_with(checkpointed(test_config(1, 1, 3), false), storage.clone(), fetcher)
        .await
        .unwrap();
    assert_eq!(report.pending, 5);

    let loaded = CheckpointManager::new(storage, KEY)
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_eq!(loaded.state.counters.crawled, 1);
    assert_eq!(loaded.state.pending.len(), 5);
    assert!(loaded.state.visited.contains("https://site.test/"));
    assert_eq!(loaded.state, report.final_state);
    assert_eq!(loaded.pages, report.pages);
}

#[tokio::test]
async fn test_corrupt_checkpoint_aborts_resume() {
    let storage = Arc::new(MemoryStorage::new());
    storage.insert_raw(KEY, b"{ this is not a checkpoint").await;
    let fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));

    let result = crawl_with(
        checkpointed(test_config(2, 100, 2), true),
        storage,
        fetcher.clone(),
    )
    .await;

    assert!(matches!(result, Err(YoinkError::Checkpoint(_))));
    assert_eq!(fetcher.total_fetches(), 0);
}

#[tokio::test]
async fn test_resume_without_checkpoint_starts_fresh() {
    let storage = Arc::new(MemoryStorage::new());
    let fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));

    let report = crawl_with(checkpointed(test_config(2, 100, 2), true), storage.clone(), fetcher)
        .await
        .unwrap();

    assert!(!report.resumed);
    assert_eq!(report.crawled, 8);
    assert!(storage.exists(KEY).await.unwrap());
}

#[tokio::test]
async fn test_checkpoint_write_failures_do_not_stop_crawl() {
    let storage = Arc::new(MemoryStorage::new());
    storage.set_fail_writes(true);
    let fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));

    let report = crawl_with(checkpointed(test_config(2, 100, 3), false), storage.clone(), fetcher)
        .await
        .unwrap();

    assert_eq!(report.crawled, 8);
    assert!(!report.checkpoint_saved);
    assert_eq!(storage.write_count(), 0);
}

#[tokio::test]
async fn test_changed_config_is_flagged_on_resume() {
    let storage = Arc::new(MemoryStorage::new());

    crawl_with(
        checkpointed(test_config(2, 2, 1), false),
        storage.clone(),
        Arc::new(ScriptedFetcher::new(&tree_site())),
    )
    .await
    .unwrap();

    let mut changed = checkpointed(test_config(2, 100, 1), true);
    changed.filters.exclude.push("*/c/*".to_string());
    let report = crawl_with(changed, storage, Arc::new(ScriptedFetcher::new(&tree_site())))
        .await
        .unwrap();

    assert!(report.resumed);
    assert!(report.fingerprint_mismatch);
}

#[tokio::test]
async fn test_local_checkpoint_file_round_trip() {
    let dir = tempfile::TempDir::new().unwrap();
    let location = dir.path().join("state").join("crawl.ckpt");
    let location = location.to_str().unwrap().to_string();

    let mut config = test_config(2, 4, 2);
    config.checkpoint.location = Some(location.clone());
    let first = Coordinator::new(config.clone(), "https://site.test/")
        .unwrap()
        .with_fetcher(Arc::new(ScriptedFetcher::new(&tree_site())))
        .run()
        .await
        .unwrap();
    assert!(first.checkpoint_saved);

    let root = LocalStorage::new(dir.path().join("state"));
    assert!(root.exists("crawl.ckpt").await.unwrap());

    config.crawler.max_pages = 100;
    config.checkpoint.resume = true;
    let second = Coordinator::new(config, "https://site.test/")
        .unwrap()
        .with_fetcher(Arc::new(ScriptedFetcher::new(&tree_site())))
        .run()
        .await
        .unwrap();

    assert!(second.resumed);
    assert_eq!(second.crawled, 8);
    assert_eq!(second.restored_pages, first.pages.len());
    assert_eq!(second.pages.len(), 8);
    assert!(root.exists("crawl.ckpt.pages.000000.jsonl").await.unwrap());
}

/// Every page a stored checkpoint counts as crawled must load back with it.
fn assert_checkpoint_complete(loaded: &yoink::checkpoint::LoadedCheckpoint) {
    assert_eq!(loaded.pages.len() as u64, loaded.state.counters.crawled);
    for page in &loaded.pages {
        assert!(loaded.state.visited.contains(&page.url), "{} not visited", page.url);
    }
}

#[tokio::test]
async fn test_resume_after_killed_run_loses_no_pages() {
    let baseline = Coordinator::new(test_config(2, 100, 1), "https://site.test/")
        .unwrap()
        .with_fetcher(Arc::new(ScriptedFetcher::new(&tree_site())))
        .run()
        .await
        .unwrap();

    let storage = Arc::new(MemoryStorage::new());
    let first_fetcher = Arc::new(
        ScriptedFetcher::new(&tree_site()).with_delay(Duration::from_millis(50)),
    );
    let run = tokio::spawn(crawl_with(
        checkpointed(test_config(2, 100, 1), false),
        storage.clone(),
        first_fetcher.clone(),
    ));

    // Kill the run while a fetch is in flight; no final checkpoint is written
    tokio::time::sleep(Duration::from_millis(180)).await;
    run.abort();
    assert!(run.await.unwrap_err().is_cancelled());
    // let detached background saves finish
    tokio::time::sleep(Duration::from_millis(50)).await;

    let loaded = CheckpointManager::new(storage.clone(), KEY)
        .load()
        .await
        .unwrap()
        .unwrap();
    assert!(loaded.state.counters.crawled >= 1);
    assert!(loaded.state.counters.crawled < 8);
    assert_checkpoint_complete(&loaded);
    let saved: BTreeSet<String> = loaded.pages.iter().map(|p| p.url.clone()).collect();

    let second_fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));
    let second = crawl_with(
        checkpointed(test_config(2, 100, 1), true),
        storage.clone(),
        second_fetcher.clone(),
    )
    .await
    .unwrap();

    assert!(second.resumed);
    assert_eq!(second.restored_pages, saved.len());
    assert_eq!(second.crawled, 8);
    assert_eq!(second.pages.len(), 8);
    assert_eq!(page_urls(&second), page_urls(&baseline));
    assert_eq!(second.final_state.visited, baseline.final_state.visited);

    // Pages missing from the checkpoint, including the one in flight at the
    // kill, are fetched exactly once more. Saved pages are never refetched.
    for url in first_fetcher.fetch_counts().keys() {
        let expected = if saved.contains(url) { 0 } else { 1 };
        assert_eq!(second_fetcher.fetch_count(url), expected, "{}", url);
    }

    let finished = CheckpointManager::new(storage, KEY)
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_checkpoint_complete(&finished);
    assert_eq!(finished.pages.len(), 8);
}

#[tokio::test]
async fn test_resume_after_cancel_with_fetches_in_flight() {
    let baseline = Coordinator::new(test_config(2, 100, 1), "https://site.test/")
        .unwrap()
        .with_fetcher(Arc::new(ScriptedFetcher::new(&tree_site())))
        .run()
        .await
        .unwrap();

    let storage = Arc::new(MemoryStorage::new());
    let first_fetcher = Arc::new(
        ScriptedFetcher::new(&tree_site()).with_delay(Duration::from_millis(60)),
    );
    let coordinator = Coordinator::new(checkpointed(test_config(2, 100, 3), false), "https://site.test/")
        .unwrap()
        .with_fetcher(first_fetcher.clone())
        .with_checkpoint(CheckpointManager::new(storage.clone(), KEY));
    let cancel = coordinator.cancellation_token();
    let run = tokio::spawn(coordinator.run());

    // Root finishes at ~60ms, then three children are in flight
    tokio::time::sleep(Duration::from_millis(90)).await;
    cancel.cancel();
    let first = run.await.unwrap().unwrap();
    assert_eq!(first.stop_reason, StopReason::Cancelled);
    assert!(first.crawled < 8);
    assert_eq!(first.pages.len() as u64, first.crawled);

    let loaded = CheckpointManager::new(storage.clone(), KEY)
        .load()
        .await
        .unwrap()
        .unwrap();
    assert_checkpoint_complete(&loaded);
    assert_eq!(loaded.state, first.final_state);

    let second_fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));
    let second = crawl_with(
        checkpointed(test_config(2, 100, 3), true),
        storage,
        second_fetcher.clone(),
    )
    .await
    .unwrap();

    assert_eq!(second.restored_pages as u64, first.crawled);
    assert_eq!(second.pages.len() as u64, second.crawled);
    assert_eq!(page_urls(&second), page_urls(&baseline));
    assert_eq!(second.final_state.visited, baseline.final_state.visited);
    for url in page_urls(&first) {
        assert_eq!(second_fetcher.fetch_count(&url), 0, "{} refetched", url);
    }
    assert_eq!(
        second_fetcher.total_fetches() as u64 + first.crawled,
        8
    );
}
