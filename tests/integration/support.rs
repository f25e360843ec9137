use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use yoink::config::Config;
use yoink::crawler::{FetchError, FetchResponse, Fetcher};

/// Serves a fixed set of pages and counts every fetch
#[derive(Debug, Default)]
pub struct ScriptedFetcher {
    pages: HashMap<String, String>,
    fetches: Mutex<HashMap<String, usize>>,
    delay: Duration,
}

impl ScriptedFetcher {
    pub fn new(pages: &[(&str, String)]) -> Self {
        Self {
            pages: pages
                .iter()
                .map(|(url, body)| (url.to_string(), body.clone()))
                .collect(),
            ..Self::default()
        }
    }

    /// Sleeps this long inside every fetch
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().unwrap().get(url).copied().unwrap_or(0)
    }

    pub fn total_fetches(&self) -> usize {
        self.fetches.lock().unwrap().values().sum()
    }

    pub fn fetch_counts(&self) -> HashMap<String, usize> {
        self.fetches.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchResponse, FetchError> {
        *self
            .fetches
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_insert(0) += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match self.pages.get(url) {
            Some(body) => Ok(FetchResponse {
                final_url: url.to_string(),
                status_code: 200,
                content_type: Some("text/html; charset=utf-8".to_string()),
                body: body.clone(),
            }),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status_code: 404,
            }),
        }
    }
}

/// HTML page with a title and one anchor per link
pub fn link_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!("<a href=\"{}\">{}</a>\n", href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{} body</p>\n{}</body></html>",
        title, title, anchors
    )
}

/// Config with the given depth, budget and worker count
pub fn test_config(max_depth: u32, max_pages: u64, workers: usize) -> Config {
    let mut config = Config::default();
    config.crawler.max_depth = max_depth;
    config.crawler.max_pages = max_pages;
    config.crawler.max_concurrency = workers;
    config
}

/// A two-level site rooted at https://site.test/
///
/// ```text
/// /        -> /a /b /c
/// /a       -> /a/1 /a/2 /b
/// /b       -> /b/1 /
/// /c       -> /c/1 /a/1
/// ```
pub fn tree_site() -> Vec<(&'static str, String)> {
    vec![
        ("https://site.test/", link_page("Root", &["/a", "/b", "/c"])),
        ("https://site.test/a", link_page("A", &["/a/1", "/a/2", "/b"])),
        ("https://site.test/b", link_page("B", &["/b/1", "/"])),
        ("https://site.test/c", link_page("C", &["/c/1", "/a/1"])),
        ("https://site.test/a/1", link_page("A1", &[])),
        ("https://site.test/a/2", link_page("A2", &[])),
        ("https://site.test/b/1", link_page("B1", &[])),
        ("https://site.test/c/1", link_page("C1", &[])),
    ]
}
