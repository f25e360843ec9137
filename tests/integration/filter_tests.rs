use crate::support::{link_page, test_config, ScriptedFetcher};
use std::sync::Arc;
use yoink::config::FilterConfig;
use yoink::crawler::Coordinator;
use yoink::FilterEngine;

fn engine(include: &[&str], exclude: &[&str], extensions: &[&str]) -> FilterEngine {
    let config = FilterConfig {
        include: include.iter().map(|s| s.to_string()).collect(),
        exclude: exclude.iter().map(|s| s.to_string()).collect(),
        skip_extensions: extensions.iter().map(|s| s.to_string()).collect(),
        allowed_domains: Vec::new(),
    };
    FilterEngine::new(&config).unwrap()
}

#[test]
fn test_exclude_wins_over_include() {
    let filter = engine(&["*/docs/*"], &["*/docs/internal/*"], &[]);

    assert!(filter.admit_str("https://example.com/docs/guide").accept);
    assert!(!filter.admit_str("https://example.com/docs/internal/keys").accept);
    assert!(!filter.admit_str("https://example.com/blog/post").accept);
}

#[test]
fn test_extension_checked_before_patterns() {
    let filter = engine(&["*/docs/*"], &["*/never/*"], &["pdf"]);

    let verdict = filter.admit_str("https://example.com/docs/manual.PDF");
    assert!(!verdict.accept);
    assert_eq!(verdict.reason, "denied extension: .pdf");
}

#[test]
fn test_scope_host_checked_first() {
    let filter = engine(&[], &["*"], &[]).with_scope_host("example.com");

    let verdict = filter.admit_str("https://other.org/page");
    assert_eq!(verdict.reason, "external domain: other.org");
}

#[tokio::test]
async fn test_crawl_records_filtered_links() {
    let fetcher = Arc::new(ScriptedFetcher::new(&[
        (
            "https://site.test/",
            link_page(
                "Root",
                &[
                    "/blog/post",
                    "/blog/drafts/wip",
                    "/files/report.pdf",
                    "https://elsewhere.test/page",
                ],
            ),
        ),
        ("https://site.test/blog/post", link_page("Post", &[])),
    ]));

    let mut config = test_config(1, 100, 2);
    config.filters.exclude.push("*/drafts/*".to_string());
    config.filters.skip_extensions.push(".pdf".to_string());

    let report = Coordinator::new(config, "https://site.test/")
        .unwrap()
        .with_fetcher(fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawled, 2);
    assert_eq!(report.filtered, 3);
    let filtered = &report.final_state.filtered_out;
    assert_eq!(
        filtered.get("https://site.test/blog/drafts/wip").map(String::as_str),
        Some("matched exclude pattern: */drafts/*")
    );
    assert_eq!(
        filtered.get("https://site.test/files/report.pdf").map(String::as_str),
        Some("denied extension: .pdf")
    );
    assert_eq!(
        filtered.get("https://elsewhere.test/page").map(String::as_str),
        Some("external domain: elsewhere.test")
    );
    assert_eq!(fetcher.fetch_count("https://site.test/files/report.pdf"), 0);
}
