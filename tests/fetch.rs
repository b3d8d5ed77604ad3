use pretty_assertions::assert_eq;
use reqwest::Client;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use rbi_parser::fetcher::Fetcher;
use rbi_parser::models::FetchOutcome;
use rbi_parser::parsers::scan_links;
use rbi_parser::pipeline::run_fetch;
use rbi_parser::resolver::{Resolver, Vocabulary};
use rbi_parser::storage::{CacheStore, FreshnessCache, JsonCacheStore};
use rbi_parser::Config;

fn numbered_banks(count: usize) -> Vocabulary {
    Vocabulary::from_pairs((1..=count).map(|i| (format!("Bank {:02}", i), format!("BANK {:02}", i))))
        .unwrap()
}

fn numbered_page(count: usize) -> String {
    let mut html = String::from("<html><body><table>");
    for i in 1..=count {
        html.push_str(&format!(
            "<tr><td>Bank {:02}</td><td><a href=\"/files/bank{:02}.xlsx\">Download</a></td></tr>",
            i, i
        ));
    }
    html.push_str("</table></body></html>");
    html
}

fn sheet_response(body: &str, etag: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_bytes(body.as_bytes().to_vec())
        .insert_header("ETag", etag)
}

fn fetcher(dir: &Path, vocabulary: Vocabulary, concurrency: usize) -> Fetcher {
    Fetcher::new(
        Client::new(),
        Arc::new(Resolver::new(vocabulary)),
        dir,
        ".xlsx",
        concurrency,
    )
}

#[tokio::test]
async fn test_second_run_downloads_nothing() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    let page = r#"
        <ul>
          <li>Axis Bank <a href="/files/axis.xlsx">xlsx</a></li>
          <li>Canara Bank <a href="/files/canara.xlsx">xlsx</a></li>
        </ul>
    "#;
    Mock::given(method("GET"))
        .and(path("/directory"))
        .respond_with(ResponseTemplate::new(200).set_body_string(page))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/axis.xlsx"))
        .respond_with(sheet_response("axis", "\"a1\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/canara.xlsx"))
        .respond_with(sheet_response("canara", "\"c1\""))
        .expect(1)
        .mount(&server)
        .await;

    let vocabulary_path = dir.path().join("banks.json");
    fs::write(
        &vocabulary_path,
        r#"{"axis bank": "AXIS BANK", "canara": "CANARA BANK"}"#,
    )
    .unwrap();

    let config = Config {
        directory_url: format!("{}/directory", server.uri()),
        vocabulary_path,
        cache_path: dir.path().join("etags.json"),
        download_dir: dir.path().join("xlsx"),
        ..Config::default()
    };

    let first = run_fetch(&config).await.unwrap();
    assert_eq!(first.downloaded(), 2);
    assert_eq!(
        fs::read_to_string(dir.path().join("xlsx").join("AXIS BANK.xlsx")).unwrap(),
        "axis"
    );
    assert_eq!(
        fs::read_to_string(dir.path().join("xlsx").join("CANARA BANK.xlsx")).unwrap(),
        "canara"
    );

    let second = run_fetch(&config).await.unwrap();
    assert_eq!(second.downloaded(), 0);
    assert_eq!(second.fresh(), 2);

    let cache = JsonCacheStore::new(&config.cache_path).load().await.unwrap();
    assert_eq!(
        cache.token(&format!("{}/files/axis.xlsx", server.uri())),
        Some("\"a1\"")
    );
}

#[tokio::test]
async fn test_pre_cached_links_are_not_requested() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path_regex(r"^/files/bank\d+\.xlsx$"))
        .respond_with(sheet_response("sheet", "\"v2\""))
        .expect(40)
        .mount(&server)
        .await;

    let base = format!("{}/directory", server.uri());
    let links = scan_links(numbered_page(50).as_bytes(), &base, ".xlsx").unwrap();
    assert_eq!(links.len(), 50);

    let cache: FreshnessCache = links
        .iter()
        .take(10)
        .map(|link| (link.locator.clone(), "\"v1\"".to_string()))
        .collect();

    let (report, cache) = fetcher(dir.path(), numbered_banks(50), 8)
        .fetch_all(links.clone(), cache)
        .await;

    assert_eq!(report.fresh(), 10);
    assert_eq!(report.downloaded(), 40);
    assert_eq!(report.failed(), 0);
    assert_eq!(cache.len(), 50);
    assert_eq!(cache.token(&links[0].locator), Some("\"v1\""));
    assert_eq!(cache.token(&links[49].locator), Some("\"v2\""));
    assert!(dir.path().join("BANK 50.xlsx").exists());
    assert!(!dir.path().join("BANK 01.xlsx").exists());

    let order: Vec<_> = report.links.iter().map(|r| r.index).collect();
    assert_eq!(order, (0..50).collect::<Vec<_>>());
}

#[tokio::test]
async fn test_one_failure_does_not_stop_the_others() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/bank03.xlsx"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/files/bank0[1245]\.xlsx$"))
        .respond_with(sheet_response("sheet", "\"ok\""))
        .mount(&server)
        .await;

    let base = format!("{}/directory", server.uri());
    let links = scan_links(numbered_page(5).as_bytes(), &base, ".xlsx").unwrap();

    let (report, cache) = fetcher(dir.path(), numbered_banks(5), 2)
        .fetch_all(links.clone(), FreshnessCache::new())
        .await;

    assert_eq!(report.downloaded(), 4);
    assert_eq!(report.failed(), 1);
    assert!(matches!(
        report.outcome_for(&links[2].locator),
        Some(FetchOutcome::Failed { .. })
    ));
    assert_eq!(cache.len(), 4);
    assert_eq!(cache.token(&links[2].locator), None);
    assert!(!dir.path().join("BANK 03.xlsx").exists());
    assert!(!dir.path().join("BANK 03.xlsx.part").exists());
}

#[tokio::test]
async fn test_unresolved_and_duplicate_links_are_reported() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/bank01.xlsx"))
        .respond_with(sheet_response("one", "\"1\""))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/mystery.xlsx"))
        .respond_with(sheet_response("never", "\"x\""))
        .expect(0)
        .mount(&server)
        .await;

    let page = r#"
        <div><p>Bank 01 <a href="/files/bank01.xlsx">a</a></p></div>
        <div><p>Unknown society <a href="/files/mystery.xlsx">b</a></p></div>
        <div><p>Bank 01 again <a href="/files/bank01.xlsx">c</a></p></div>
    "#;
    let base = format!("{}/directory", server.uri());
    let links = scan_links(page.as_bytes(), &base, ".xlsx").unwrap();

    let (report, cache) = fetcher(dir.path(), numbered_banks(3), 4)
        .fetch_all(links, FreshnessCache::new())
        .await;

    let outcomes: Vec<_> = report.links.iter().map(|r| r.outcome.clone()).collect();
    assert!(matches!(outcomes[0], FetchOutcome::Downloaded { .. }));
    assert!(matches!(outcomes[1], FetchOutcome::Unresolved { .. }));
    assert_eq!(outcomes[2], FetchOutcome::Duplicate);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn test_same_bank_keeps_last_link_in_page_order() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/old.xlsx"))
        .respond_with(sheet_response("old", "\"o\""))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/new.xlsx"))
        .respond_with(sheet_response("new", "\"n\""))
        .mount(&server)
        .await;

    let page = r#"
        <p>Bank 02 (previous list) <a href="/files/old.xlsx">x</a></p>
        <p>Bank 02 <a href="/files/new.xlsx">x</a></p>
    "#;
    let base = format!("{}/directory", server.uri());
    let links = scan_links(page.as_bytes(), &base, ".xlsx").unwrap();

    for _ in 0..5 {
        let (report, _) = fetcher(dir.path(), numbered_banks(2), 8)
            .fetch_all(links.clone(), FreshnessCache::new())
            .await;
        assert_eq!(report.downloaded(), 2);
        assert_eq!(
            fs::read_to_string(dir.path().join("BANK 02.xlsx")).unwrap(),
            "new"
        );
    }
}

#[tokio::test]
async fn test_same_bank_stays_on_last_link_across_runs() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/old.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("old"))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/files/new.xlsx"))
        .respond_with(sheet_response("new", "\"n\""))
        .expect(2)
        .mount(&server)
        .await;

    let page = r#"
        <p>Bank 02 (previous list) <a href="/files/old.xlsx">x</a></p>
        <p>Bank 02 <a href="/files/new.xlsx">x</a></p>
    "#;
    let base = format!("{}/directory", server.uri());
    let links = scan_links(page.as_bytes(), &base, ".xlsx").unwrap();
    let fetcher = fetcher(dir.path(), numbered_banks(2), 8);

    let (first, cache) = fetcher.fetch_all(links.clone(), FreshnessCache::new()).await;
    assert_eq!(first.downloaded(), 2);
    assert_eq!(cache.token(&links[1].locator), Some("\"n\""));

    let (second, _) = fetcher.fetch_all(links.clone(), cache).await;
    assert_eq!(second.downloaded(), 2);
    assert_eq!(second.fresh(), 0);
    assert_eq!(
        fs::read_to_string(dir.path().join("BANK 02.xlsx")).unwrap(),
        "new"
    );
}

#[tokio::test]
async fn test_missing_etag_is_fetched_again() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().unwrap();

    Mock::given(method("GET"))
        .and(path("/files/bank01.xlsx"))
        .respond_with(ResponseTemplate::new(200).set_body_string("no validator"))
        .expect(2)
        .mount(&server)
        .await;

    let base = format!("{}/directory", server.uri());
    let links = scan_links(numbered_page(1).as_bytes(), &base, ".xlsx").unwrap();
    let fetcher = fetcher(dir.path(), numbered_banks(1), 1);

    let (first, cache) = fetcher.fetch_all(links.clone(), FreshnessCache::new()).await;
    assert_eq!(first.downloaded(), 1);
    assert_eq!(cache.token(&links[0].locator), Some(""));

    let (second, _) = fetcher.fetch_all(links, cache).await;
    assert_eq!(second.downloaded(), 1);
    assert_eq!(second.fresh(), 0);
}
