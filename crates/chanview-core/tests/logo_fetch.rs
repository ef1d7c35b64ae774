mod common;

use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use chanview_core::cache::AssetCache;
use chanview_core::config::FetchConfig;
use chanview_core::fetch::{fetch_queue, FetchTask, LogoFetcher};
use chanview_core::{ChannelId, FetchSkip, UiEvent};
use tokio::sync::mpsc;

const PNG: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR";

// ── Local logo host ──────────────────────────────────────────────────────────

#[derive(Clone, Default)]
struct Hits {
    logo: Arc<AtomicUsize>,
    total: Arc<AtomicUsize>,
    user_agents: Arc<Mutex<Vec<String>>>,
}

async fn logo(State(hits): State<Hits>, headers: HeaderMap) -> impl IntoResponse {
    hits.total.fetch_add(1, Ordering::SeqCst);
    if let Some(ua) = headers.get(header::USER_AGENT).and_then(|v| v.to_str().ok()) {
        hits.user_agents.lock().unwrap().push(ua.to_string());
    }
    hits.logo.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "image/png")], PNG.to_vec())
}

async fn missing(State(hits): State<Hits>) -> impl IntoResponse {
    hits.total.fetch_add(1, Ordering::SeqCst);
    (StatusCode::NOT_FOUND, "not here")
}

async fn html(State(hits): State<Hits>) -> impl IntoResponse {
    hits.total.fetch_add(1, Ordering::SeqCst);
    ([(header::CONTENT_TYPE, "text/html")], "<html>blocked</html>")
}

async fn slow(State(hits): State<Hits>) -> impl IntoResponse {
    hits.total.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    ([(header::CONTENT_TYPE, "image/png")], PNG.to_vec())
}

async fn spawn_logo_host() -> (SocketAddr, Hits) {
    let hits = Hits::default();
    let app = Router::new()
        .route("/logo.png", get(logo))
        .route("/missing.png", get(missing))
        .route("/page.png", get(html))
        .route("/slow.png", get(slow))
        .with_state(hits.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hits)
}

fn fetcher(cache_dir: &std::path::Path) -> LogoFetcher {
    fetcher_with_timeout(cache_dir, 2)
}

fn fetcher_with_timeout(cache_dir: &std::path::Path, timeout_secs: u64) -> LogoFetcher {
    let config = FetchConfig {
        cache_dir: cache_dir.to_path_buf(),
        timeout_secs,
        ..FetchConfig::default()
    };
    LogoFetcher::new(&config, AssetCache::new(cache_dir)).unwrap()
}

fn task(id: usize, url: String, name: &str) -> FetchTask {
    FetchTask {
        channel_id: ChannelId(id),
        logo_url: url,
        channel_name: name.to_string(),
    }
}

async fn next_logo(rx: &mut mpsc::Receiver<UiEvent>) -> (ChannelId, std::path::PathBuf) {
    match tokio::time::timeout(Duration::from_secs(5), rx.recv()).await {
        Ok(Some(UiEvent::LogoReady { id, path })) => (id, path),
        other => panic!("expected a logo delivery, got {:?}", other),
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn second_request_for_same_name_hits_cache() {
    let (addr, hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let f = fetcher(tmp.path());

    let t = task(0, format!("http://{addr}/logo.png"), "ES | La 1");
    let first = f.resolve(&t).await.unwrap();
    let second = f.resolve(&t).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, tmp.path().join("ES  La 1.png"));
    assert_eq!(std::fs::read(&first).unwrap(), PNG);
    assert_eq!(hits.logo.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn non_image_payload_is_not_cached() {
    let (addr, _hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let f = fetcher(tmp.path());

    let result = f.resolve(&task(0, format!("http://{addr}/page.png"), "Blocked")).await;
    assert!(matches!(result, Err(FetchSkip::NotAnImage)));
    assert!(f.cache().lookup("Blocked").await.is_none());
}

#[tokio::test]
async fn not_found_is_skipped_and_worker_continues() {
    let (addr, hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let (queue, mut worker) = fetch_queue(fetcher(tmp.path()), tx);
    worker.ensure_started();

    queue.enqueue(task(0, format!("http://{addr}/missing.png"), "Gone"));
    queue.enqueue(task(1, format!("http://{addr}/logo.png"), "Here"));

    let (id, path) = next_logo(&mut rx).await;
    assert_eq!(id, ChannelId(1));
    assert!(path.ends_with("Here.png"));
    assert_eq!(hits.total.load(Ordering::SeqCst), 2);
    assert!(AssetCache::new(tmp.path()).lookup("Gone").await.is_none());

    worker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn tasks_without_usable_logo_produce_no_delivery() {
    let (addr, hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let (queue, mut worker) = fetch_queue(fetcher(tmp.path()), tx);
    worker.ensure_started();

    queue.enqueue(task(0, String::new(), "No Logo"));
    queue.enqueue(task(1, "ftp://example/logo.png".to_string(), "Ftp"));
    queue.enqueue(task(2, format!("http://{addr}/logo.png"), "|||"));
    queue.enqueue(task(3, format!("http://{addr}/logo.png"), "Last"));

    let (id, _) = next_logo(&mut rx).await;
    assert_eq!(id, ChannelId(3));
    assert_eq!(hits.total.load(Ordering::SeqCst), 1);

    worker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn requests_carry_configured_user_agent() {
    let (addr, hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let f = fetcher(tmp.path());

    f.resolve(&task(0, format!("http://{addr}/logo.png"), "Uno"))
        .await
        .unwrap();

    let seen = hits.user_agents.lock().unwrap().clone();
    assert_eq!(seen, vec![FetchConfig::default().user_agent]);
}

#[tokio::test]
async fn timed_out_fetch_is_skipped_and_worker_continues() {
    let (addr, hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let (queue, mut worker) = fetch_queue(fetcher_with_timeout(tmp.path(), 1), tx);
    worker.ensure_started();

    queue.enqueue(task(0, format!("http://{addr}/slow.png"), "Lento"));
    queue.enqueue(task(1, format!("http://{addr}/logo.png"), "Rapido"));

    let (id, path) = next_logo(&mut rx).await;
    assert_eq!(id, ChannelId(1));
    assert!(path.ends_with("Rapido.png"));
    assert_eq!(hits.logo.load(Ordering::SeqCst), 1);
    assert!(AssetCache::new(tmp.path()).lookup("Lento").await.is_none());
    assert!(rx.try_recv().is_err());

    worker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn deliveries_follow_queue_order() {
    let (addr, _hits) = spawn_logo_host().await;
    let tmp = tempfile::tempdir().unwrap();
    let (tx, mut rx) = mpsc::channel(16);
    let (queue, mut worker) = fetch_queue(fetcher(tmp.path()), tx);

    for (i, name) in ["A", "B", "C"].iter().enumerate() {
        queue.enqueue(task(i, format!("http://{addr}/logo.png"), name));
    }
    worker.ensure_started();

    let mut ids = Vec::new();
    for _ in 0..3 {
        ids.push(next_logo(&mut rx).await.0);
    }
    assert_eq!(ids, vec![ChannelId(0), ChannelId(1), ChannelId(2)]);

    worker.shutdown(Duration::from_secs(1)).await;
}

#[tokio::test]
async fn session_updates_card_when_logo_arrives() {
    let (addr, _hits) = spawn_logo_host().await;
    let mut h = common::harness();
    let playlist = format!(
        "#EXTM3U\n\
         #EXTINF:-1 tvg-logo=\"http://{addr}/logo.png\",Con Logo\nhttp://stream/0\n\
         #EXTINF:-1,Sin Logo\nhttp://stream/1\n"
    );
    let path = common::write_playlist(&h.dir, "logos.m3u", &playlist);

    h.session.load_playlist(&path, &mut h.sink).await.unwrap();
    h.drive_until(|_, sink| !sink.logos.is_empty()).await;

    assert_eq!(h.sink.logos.len(), 1);
    assert_eq!(h.sink.logos[0].0, ChannelId(0));
    let card = h.session.card(ChannelId(0)).unwrap();
    assert_eq!(card.logo_path.as_deref(), Some(h.sink.logos[0].1.as_path()));
    assert!(h.session.card(ChannelId(1)).unwrap().logo_path.is_none());
}
