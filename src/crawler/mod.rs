//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry logic
//! - HTML extraction of text, links and metadata
//! - The worker pool that coordinates a crawl

mod coordinator;
mod extractor;
mod fetcher;
mod page;

pub use coordinator::{run_crawl, Coordinator, CrawlReport, StopReason};
pub use extractor::{parse_html, ExtractError, Extracted, Extractor, HtmlExtractor};
pub use fetcher::{build_http_client, FetchError, FetchResponse, Fetcher, HttpFetcher};
pub use page::Page;
