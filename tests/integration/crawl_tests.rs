use crate::support::{link_page, test_config, tree_site, ScriptedFetcher};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use yoink::crawler::{Coordinator, StopReason};

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html")
}

#[tokio::test]
async fn test_full_crawl_against_http_server() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(link_page("Home", &["/x", "/y", "/y#frag"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x"))
        .respond_with(html(link_page("X", &["/z"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/y"))
        .respond_with(html(link_page("Y", &["/"])))
        .expect(1)
        .mount(&mock_server)
        .await;
    // Depth 2 is beyond max_depth
    Mock::given(method("GET"))
        .and(path("/z"))
        .respond_with(html(link_page("Z", &[])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let start = format!("{}/", mock_server.uri());
    let report = Coordinator::new(test_config(1, 10, 4), &start)
        .unwrap()
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawled, 3);
    assert_eq!(report.failed, 0);
    assert_eq!(report.pending, 0);
    assert_eq!(report.stop_reason, StopReason::FrontierExhausted);

    let titles: BTreeSet<_> = report
        .pages
        .iter()
        .filter_map(|p| p.title.clone())
        .collect();
    assert_eq!(
        titles,
        ["Home", "X", "Y"].iter().map(|t| t.to_string()).collect()
    );

    let home = report.pages.iter().find(|p| p.depth == 0).unwrap();
    assert_eq!(home.status_code, 200);
    assert_eq!(home.links.len(), 2);
}

#[tokio::test]
async fn test_budget_of_one_leaves_links_pending() {
    let fetcher = Arc::new(ScriptedFetcher::new(&[(
        "https://site.test/",
        link_page("Root", &["/1", "/2", "/3", "/4", "/5"]),
    )]));

    let report = Coordinator::new(test_config(2, 1, 4), "https://site.test/")
        .unwrap()
        .with_fetcher(fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawled, 1);
    assert_eq!(report.pending, 5);
    assert_eq!(report.stop_reason, StopReason::BudgetReached);
    assert_eq!(fetcher.total_fetches(), 1);
    assert!(report
        .final_state
        .pending
        .iter()
        .all(|entry| entry.depth == 1
            && entry.discovered_from.as_deref() == Some("https://site.test/")));
}

#[tokio::test]
async fn test_no_url_fetched_twice_under_concurrency() {
    let fetcher = Arc::new(
        ScriptedFetcher::new(&tree_site()).with_delay(Duration::from_millis(15)),
    );

    let report = Coordinator::new(test_config(2, 100, 8), "https://site.test/")
        .unwrap()
        .with_fetcher(fetcher.clone())
        .run()
        .await
        .unwrap();

    assert_eq!(report.crawled, 8);
    assert_eq!(fetcher.total_fetches(), 8);
    for (url, count) in fetcher.fetch_counts() {
        assert_eq!(count, 1, "{} fetched {} times", url, count);
    }

    let urls: BTreeSet<_> = report.pages.iter().map(|p| p.url.clone()).collect();
    assert_eq!(urls.len(), report.pages.len());
}

#[tokio::test]
async fn test_single_worker_crawls_level_by_level() {
    let fetcher = Arc::new(ScriptedFetcher::new(&tree_site()));

    let report = Coordinator::new(test_config(2, 100, 1), "https://site.test/")
        .unwrap()
        .with_fetcher(fetcher)
        .run()
        .await
        .unwrap();

    let order: Vec<&str> = report.pages.iter().map(|p| p.url.as_str()).collect();
    assert_eq!(
        order,
        vec![
            "https://site.test/",
            "https://site.test/a",
            "https://site.test/b",
            "https://site.test/c",
            "https://site.test/a/1",
            "https://site.test/a/2",
            "https://site.test/b/1",
            "https://site.test/c/1",
        ]
    );
    assert!(report.pages.windows(2).all(|w| w[0].depth <= w[1].depth));
}

#[tokio::test]
async fn test_fetch_failures_are_counted_not_retried_by_coordinator() {
    let mut site = tree_site();
    site.retain(|(url, _)| *url != "https://site.test/b");
    let fetcher = Arc::new(ScriptedFetcher::new(&site));

    let report = Coordinator::new(test_config(2, 100, 3), "https://site.test/")
        .unwrap()
        .with_fetcher(fetcher.clone())
        .run()
        .await
        .unwrap();

    // /b/1 is only reachable through /b
    assert_eq!(report.crawled, 6);
    assert_eq!(report.failed, 1);
    assert_eq!(fetcher.fetch_count("https://site.test/b"), 1);
    assert_eq!(fetcher.fetch_count("https://site.test/b/1"), 0);
    assert!(report.final_state.visited.contains("https://site.test/b"));
}

#[tokio::test]
async fn test_cancellation_stops_crawl() {
    let fetcher = Arc::new(
        ScriptedFetcher::new(&tree_site()).with_delay(Duration::from_millis(200)),
    );

    let coordinator = Coordinator::new(test_config(2, 100, 1), "https://site.test/")
        .unwrap()
        .with_fetcher(fetcher);
    let cancel = coordinator.cancellation_token();

    let handle = tokio::spawn(coordinator.run());
    tokio::time::sleep(Duration::from_millis(300)).await;
    cancel.cancel();

    let report = handle.await.unwrap().unwrap();
    assert_eq!(report.stop_reason, StopReason::Cancelled);
    assert!(report.crawled < 8);
    assert!(report.pending > 0);
}
