#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chanview_core::config::Config;
use chanview_core::fetch::FetchWorker;
use chanview_core::{AppState, CardView, ChannelId, ChannelSink, Player, Session, UiEvent};
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

// ── Sink ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct RecordingSink {
    pub cleared: usize,
    pub batches: Vec<Vec<ChannelId>>,
    pub logos: Vec<(ChannelId, PathBuf)>,
    pub statuses: Vec<String>,
}

impl RecordingSink {
    pub fn last_status(&self) -> Option<&str> {
        self.statuses.last().map(String::as_str)
    }
}

impl ChannelSink for RecordingSink {
    fn on_cleared(&mut self) {
        self.cleared += 1;
    }

    fn on_batch_ready(&mut self, cards: &[CardView]) {
        self.batches.push(cards.iter().map(|c| c.id).collect());
    }

    fn on_logo_ready(&mut self, id: ChannelId, path: &Path) {
        self.logos.push((id, path.to_path_buf()));
    }

    fn on_status(&mut self, text: &str) {
        self.statuses.push(text.to_string());
    }
}

// ── Player ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerCall {
    Play(String),
    TogglePause,
    Stop,
}

#[derive(Debug, Clone, Default)]
pub struct FakePlayer {
    pub calls: Arc<Mutex<Vec<PlayerCall>>>,
    pub fail_with: Option<String>,
}

impl FakePlayer {
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<PlayerCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn played(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlayerCall::Play(url) => Some(url),
                _ => None,
            })
            .collect()
    }
}

impl Player for FakePlayer {
    async fn play(&mut self, url: &str) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(PlayerCall::Play(url.to_string()));
        match &self.fail_with {
            Some(message) => Err(anyhow::anyhow!("{}", message)),
            None => Ok(()),
        }
    }

    async fn toggle_pause(&mut self) -> anyhow::Result<()> {
        self.calls.lock().unwrap().push(PlayerCall::TogglePause);
        Ok(())
    }

    async fn stop(&mut self) {
        self.calls.lock().unwrap().push(PlayerCall::Stop);
    }
}

// ── Playlists ────────────────────────────────────────────────────────────────

/// `n` channels named `Channel {i}` with stream URL `http://stream/{i}` and
/// no logo.
pub fn numbered_playlist(n: usize) -> String {
    let mut text = String::from("#EXTM3U\n");
    for i in 0..n {
        text.push_str(&format!("#EXTINF:-1,Channel {i}\nhttp://stream/{i}\n"));
    }
    text
}

/// 40 channels, 5 of which carry "news" in some letter case.
pub fn news_playlist() -> String {
    let mut text = String::from("#EXTM3U\n");
    let news = [3, 11, 17, 28, 36];
    for i in 0..40 {
        let name = if news.contains(&i) {
            match i % 3 {
                0 => format!("NEWS {i}"),
                1 => format!("World News {i}"),
                _ => format!("news{i} HD"),
            }
        } else {
            format!("Channel {i}")
        };
        text.push_str(&format!("#EXTINF:-1 group-title=\"G\",{name}\nhttp://stream/{i}\n"));
    }
    text
}

pub fn write_playlist(dir: &TempDir, file: &str, content: &str) -> PathBuf {
    let path = dir.path().join(file);
    std::fs::write(&path, content).unwrap();
    path
}

// ── Session harness ──────────────────────────────────────────────────────────

pub struct Harness {
    pub dir: TempDir,
    pub session: Session,
    pub rx: mpsc::Receiver<UiEvent>,
    pub sink: RecordingSink,
    pub state: AppState,
}

pub fn test_config(dir: &TempDir) -> Config {
    let mut config = Config::default();
    config.fetch.cache_dir = dir.path().join("logos");
    config.fetch.timeout_secs = 2;
    config.filter.debounce_ms = 50;
    config
}

pub fn build(config: Config) -> (AppState, FetchWorker, mpsc::Receiver<UiEvent>) {
    AppState::build(config).unwrap()
}

pub fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    harness_with(dir, |_| {})
}

pub fn harness_with(dir: TempDir, tweak: impl FnOnce(&mut Config)) -> Harness {
    let mut config = test_config(&dir);
    tweak(&mut config);
    let (state, worker, rx) = build(config);
    let session = Session::new(&state, worker);
    Harness {
        dir,
        session,
        rx,
        sink: RecordingSink::default(),
        state,
    }
}

impl Harness {
    /// Feed events into the session until `done` holds.
    pub async fn drive_until(&mut self, done: impl Fn(&Session, &RecordingSink) -> bool) {
        while !done(&self.session, &self.sink) {
            let event = tokio::time::timeout(STEP_TIMEOUT, self.rx.recv())
                .await
                .expect("timed out waiting for a UI event")
                .expect("UI channel closed");
            self.session.handle_event(event, &mut self.sink);
        }
    }

    /// Wait for the in-flight batch to land.
    pub async fn settle_batch(&mut self) {
        self.drive_until(|s, _| !s.paginator().cursor().loading).await;
    }

    pub fn rendered_ids(&self) -> Vec<usize> {
        self.session.cards().map(|c| c.id.0).collect()
    }
}
