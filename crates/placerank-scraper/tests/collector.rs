//! Collector and snapshot engine driven by an in-memory scripted fetcher.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use placerank_core::{AbortFlag, Credentials};
use placerank_scraper::{
    Collector, CollectorSettings, PageFetcher, ScraperError, Session, SnapshotEngine,
    SnapshotSettings, StopReason,
};

/// Serves canned bodies keyed by `url` plus `?k=v` query. Each key holds a
/// queue of responses; the last one repeats.
#[derive(Default)]
struct ScriptedFetcher {
    responses: Mutex<HashMap<String, Vec<Result<String, u16>>>>,
    calls: Mutex<Vec<String>>,
    logins: Mutex<usize>,
}

impl ScriptedFetcher {
    fn page(self, key: &str, body: String) -> Self {
        self.script(key, Ok(body))
    }

    fn script(self, key: &str, response: Result<String, u16>) -> Self {
        self.responses
            .lock()
            .unwrap()
            .entry(key.to_owned())
            .or_default()
            .push(response);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl PageFetcher for ScriptedFetcher {
    async fn authenticate(&self, _credentials: &Credentials) -> Result<Session, ScraperError> {
        let mut logins = self.logins.lock().unwrap();
        *logins += 1;
        let mut session = Session::new();
        session.set_cookie("PHPSESSID", &format!("login-{logins}"));
        Ok(session)
    }

    async fn fetch(
        &self,
        _session: &Session,
        url: &str,
        query: &[(String, String)],
    ) -> Result<String, ScraperError> {
        let key = query
            .iter()
            .fold(url.to_owned(), |acc, (k, v)| format!("{acc}?{k}={v}"));
        self.calls.lock().unwrap().push(key.clone());

        let mut responses = self.responses.lock().unwrap();
        let queue = responses.get_mut(&key).ok_or(ScraperError::UnexpectedStatus {
            status: 404,
            url: key.clone(),
        })?;
        let response = if queue.len() > 1 {
            queue.remove(0)
        } else {
            queue[0].clone()
        };
        match response {
            Ok(body) => Ok(body),
            Err(401) => Err(ScraperError::SessionExpired { url: key }),
            Err(status) => Err(ScraperError::UnexpectedStatus { status, url: key }),
        }
    }
}

fn credentials() -> Credentials {
    Credentials {
        username: "tracker".to_owned(),
        password: "hunter2".to_owned(),
    }
}

/// A listing page with rows for ids `range`, linking to page `next` if given.
fn listing_page(ids: std::ops::RangeInclusive<u32>, next: Option<usize>) -> String {
    let mut html = String::from("<table><tr><th>#</th><th>업체</th></tr>");
    for id in ids {
        html.push_str(&format!(
            r#"<tr><td>{id}</td><td><a href="https://m.place.naver.com/restaurant/{id}">가게 {id}</a></td><td>치킨</td></tr>"#
        ));
    }
    html.push_str("</table>");
    if let Some(next) = next {
        html.push_str(&format!(r#"<div class="paging"><a href="?page={next}">{next}</a></div>"#));
    }
    html
}

fn settings(target_count: usize, max_pages: usize) -> CollectorSettings {
    CollectorSettings {
        listing_url: "/list.php".to_owned(),
        target_count,
        max_pages,
        page_delay_ms: 0,
    }
}

#[tokio::test]
async fn stops_at_exactly_the_target_on_the_crossing_page() {
    // 25 rows over three pages; target 10 is crossed midway through page 2.
    let fetcher = ScriptedFetcher::default()
        .page("/list.php", listing_page(1..=8, Some(2)))
        .page("/list.php?page=2", listing_page(9..=16, Some(3)))
        .page("/list.php?page=3", listing_page(17..=25, None));
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(10, 10), AbortFlag::new());

    let outcome = collector.collect(&mut Session::new()).await.unwrap();

    assert_eq!(outcome.entities.len(), 10);
    assert_eq!(outcome.stop_reason, StopReason::TargetReached);
    assert_eq!(outcome.pages_fetched, 2);
    assert_eq!(outcome.entities.last().unwrap().entity_id, "10");
    assert_eq!(fetcher.calls(), vec!["/list.php", "/list.php?page=2"]);
}

#[tokio::test]
async fn duplicates_across_pages_are_not_counted() {
    let fetcher = ScriptedFetcher::default()
        .page("/list.php", listing_page(1..=5, Some(2)))
        .page("/list.php?page=2", listing_page(3..=7, None));
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(100, 10), AbortFlag::new());

    let outcome = collector.collect(&mut Session::new()).await.unwrap();

    let ids: Vec<&str> = outcome.entities.iter().map(|e| e.entity_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "2", "3", "4", "5", "6", "7"]);
    assert_eq!(outcome.stop_reason, StopReason::NoNextPage);
}

#[tokio::test]
async fn page_limit_bounds_collection() {
    let fetcher = ScriptedFetcher::default()
        .page("/list.php", listing_page(1..=3, Some(2)))
        .page("/list.php?page=2", listing_page(4..=6, Some(3)));
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(100, 2), AbortFlag::new());

    let outcome = collector.collect(&mut Session::new()).await.unwrap();

    assert_eq!(outcome.entities.len(), 6);
    assert_eq!(outcome.stop_reason, StopReason::PageLimit);
}

#[tokio::test]
async fn failed_page_advance_returns_partial_harvest() {
    let fetcher = ScriptedFetcher::default()
        .page("/list.php", listing_page(1..=4, Some(2)))
        .script("/list.php?page=2", Err(503));
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(100, 10), AbortFlag::new());

    let outcome = collector.collect(&mut Session::new()).await.unwrap();

    assert_eq!(outcome.entities.len(), 4);
    assert_eq!(outcome.stop_reason, StopReason::PageAdvanceFailed);
}

#[tokio::test]
async fn first_page_failure_is_an_error() {
    let fetcher = ScriptedFetcher::default().script("/list.php", Err(500));
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(10, 10), AbortFlag::new());

    let result = collector.collect(&mut Session::new()).await;
    assert!(matches!(
        result,
        Err(ScraperError::UnexpectedStatus { status: 500, .. })
    ));
}

#[tokio::test]
async fn raised_abort_stops_before_fetching() {
    let fetcher = ScriptedFetcher::default().page("/list.php", listing_page(1..=3, None));
    let creds = credentials();
    let abort = AbortFlag::new();
    abort.raise();
    let collector = Collector::new(&fetcher, &creds, settings(10, 10), abort);

    let outcome = collector.collect(&mut Session::new()).await.unwrap();

    assert!(outcome.entities.is_empty());
    assert_eq!(outcome.stop_reason, StopReason::Aborted);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test]
async fn short_harvest_is_supplemented_from_select_options() {
    let mut page = listing_page(1..=2, None);
    page.push_str(
        r#"<select name="shop">
             <option value="https://m.place.naver.com/restaurant/2">가게 2</option>
             <option value="https://m.place.naver.com/restaurant/90">옵션 가게</option>
           </select>"#,
    );
    let fetcher = ScriptedFetcher::default().page("/list.php", page);
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(10, 10), AbortFlag::new());

    let outcome = collector.collect(&mut Session::new()).await.unwrap();

    assert_eq!(outcome.entities.len(), 3);
    assert_eq!(outcome.from_options, 1);
    assert_eq!(outcome.entities[2].name, "옵션 가게");
}

#[tokio::test]
async fn expired_session_is_renewed_mid_collection() {
    let fetcher = ScriptedFetcher::default()
        .page("/list.php", listing_page(1..=2, Some(2)))
        .script("/list.php?page=2", Err(401))
        .page("/list.php?page=2", listing_page(3..=4, None));
    let creds = credentials();
    let collector = Collector::new(&fetcher, &creds, settings(10, 10), AbortFlag::new());
    let mut session = Session::new();

    let outcome = collector.collect(&mut session).await.unwrap();

    assert_eq!(outcome.entities.len(), 4);
    assert_eq!(session.cookie_header().as_deref(), Some("PHPSESSID=login-1"));
}

#[tokio::test]
async fn snapshot_queries_keyword_and_ranks_rows() {
    let mut page = String::from(r#"<table class="ranking">"#);
    for (i, name) in ["첫째", "둘째", "셋째"].iter().enumerate() {
        page.push_str(&format!(
            r#"<tr><td>{}</td><td><a href="https://m.place.naver.com/restaurant/{}">{name}</a></td></tr>"#,
            i + 1,
            500 + i
        ));
    }
    page.push_str("</table>");
    let fetcher = ScriptedFetcher::default().page("/rank.php?keyword=강남 치킨", page);
    let creds = credentials();
    let engine = SnapshotEngine::new(
        &fetcher,
        &creds,
        SnapshotSettings {
            rank_check_url: "/rank.php".to_owned(),
            cap: 20,
        },
    );

    let entries = engine
        .snapshot(&mut Session::new(), "강남 치킨")
        .await
        .unwrap();

    let ranks: Vec<i32> = entries.iter().map(|e| e.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3]);
    assert_eq!(entries[1].entity_id.as_deref(), Some("501"));
    assert_eq!(entries[2].name, "셋째");
}

#[tokio::test]
async fn snapshot_second_expiry_fails_the_keyword() {
    let fetcher = ScriptedFetcher::default().script("/rank.php?keyword=서초 맛집", Err(401));
    let creds = credentials();
    let engine = SnapshotEngine::new(
        &fetcher,
        &creds,
        SnapshotSettings {
            rank_check_url: "/rank.php".to_owned(),
            cap: 20,
        },
    );

    let result = engine.snapshot(&mut Session::new(), "서초 맛집").await;

    assert!(result.unwrap_err().is_auth_failure());
    assert_eq!(fetcher.calls().len(), 2);
}
