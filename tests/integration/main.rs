//! Integration tests for the crawler
//!
//! Crawls run against scripted in-process sites or wiremock servers so the
//! full coordinator, frontier and checkpoint cycle is exercised end-to-end.

mod support;

mod checkpoint_tests;
mod crawl_tests;
mod fetcher_tests;
mod filter_tests;
