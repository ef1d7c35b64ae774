//! Session — single-owner state for one viewer.
//!
//! Lives on the UI context. Background tasks (batch computation, the
//! debounce timer, the logo worker) never touch it; they post `UiEvent`s on
//! the shared channel, and the UI loop feeds them back through
//! `handle_event` / `pump`.
//!
//! ```text
//!   load_playlist ─▶ filter_channels ─▶ Paginator::reset ─▶ request_next_batch
//!   set_query ─▶ debounce ─▶ FilterDue ─▶ filter_channels ─▶ ...
//!   BatchReady ─▶ registry + sink.on_batch_ready ─▶ FetchQueue
//!   LogoReady  ─▶ registry hit? ─▶ sink.on_logo_ready
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{debug, info, trace, warn};

use crate::cache::AssetCache;
use crate::config::Config;
use crate::error::LoadError;
use crate::fetch::{fetch_queue, FetchQueue, FetchWorker, LogoFetcher};
use crate::filter::{self, FilterEngine};
use crate::pagination::Paginator;
use crate::playlist::{self, ChannelId, Playlist};
use crate::protocol::{CardView, UiEvent};
use crate::scroll::ScrollTrigger;

/// Upper bound on events handled per `pump` call, so one busy tick cannot
/// starve rendering.
pub const MAX_DRAIN: usize = 256;

pub const STATUS_INITIAL: &str = "Seleccione una lista M3U";
pub const STATUS_EMPTY_PLAYLIST: &str = "No se encontraron canales en el archivo";

// ── Collaborator seams ───────────────────────────────────────────────────────

/// Receiver of everything the view layer has to show. Called on the UI
/// context only.
pub trait ChannelSink {
    /// All rendered cards are gone (new playlist or new filter).
    fn on_cleared(&mut self);
    /// Append these cards, in order.
    fn on_batch_ready(&mut self, cards: &[CardView]);
    /// One card got its icon.
    fn on_logo_ready(&mut self, id: ChannelId, path: &Path);
    fn on_status(&mut self, text: &str);
}

/// Native playback engine. The URL is opaque.
pub trait Player {
    fn play(&mut self, url: &str) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn toggle_pause(&mut self) -> impl Future<Output = anyhow::Result<()>> + Send;
    fn stop(&mut self) -> impl Future<Output = ()> + Send;
}

// ── AppState ─────────────────────────────────────────────────────────────────

/// Shared wiring handed to component constructors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub queue: FetchQueue,
    pub events: mpsc::Sender<UiEvent>,
}

impl AppState {
    /// Build the state, the (idle) fetch worker, and the receiving end of the
    /// UI channel.
    pub fn build(config: Config) -> anyhow::Result<(Self, FetchWorker, mpsc::Receiver<UiEvent>)> {
        let (events, rx) = mpsc::channel(config.runtime.channel_capacity.max(1));
        let cache = AssetCache::new(config.fetch.cache_dir.clone());
        let fetcher = LogoFetcher::new(&config.fetch, cache)?;
        let (queue, worker) = fetch_queue(fetcher, events.clone());

        Ok((
            Self {
                config,
                queue,
                events,
            },
            worker,
            rx,
        ))
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

pub struct Session {
    state: AppState,
    playlist: Playlist,
    filter: FilterEngine,
    paginator: Paginator,
    scroll: ScrollTrigger,
    worker: FetchWorker,
    /// Rendered cards by id, plus their render order.
    registry: HashMap<ChannelId, CardView>,
    rendered: Vec<ChannelId>,
    status: String,
    /// Playlist position of the last channel handed to the player.
    current: Option<usize>,
}

impl Session {
    pub fn new(state: &AppState, worker: FetchWorker) -> Self {
        let config = &state.config;
        Self {
            state: state.clone(),
            playlist: Playlist::default(),
            filter: FilterEngine::new(config.filter.debounce(), state.events.clone()),
            paginator: Paginator::new(
                config.paging.batch_size(),
                state.events.clone(),
                state.queue.clone(),
            ),
            scroll: ScrollTrigger::new(&config.scroll),
            worker,
            registry: HashMap::new(),
            rendered: Vec::new(),
            status: STATUS_INITIAL.to_string(),
            current: None,
        }
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn paginator(&self) -> &Paginator {
        &self.paginator
    }

    /// The query the current view was derived from.
    pub fn query(&self) -> &str {
        self.filter.query()
    }

    /// Rendered cards in display order.
    pub fn cards(&self) -> impl Iterator<Item = &CardView> + '_ {
        self.rendered.iter().filter_map(|id| self.registry.get(id))
    }

    pub fn card(&self, id: ChannelId) -> Option<&CardView> {
        self.registry.get(&id)
    }

    pub fn rendered_len(&self) -> usize {
        self.rendered.len()
    }

    pub fn current(&self) -> Option<ChannelId> {
        self.current.map(ChannelId)
    }

    pub fn worker_running(&self) -> bool {
        self.worker.is_running()
    }

    fn set_status(&mut self, text: String, sink: &mut dyn ChannelSink) {
        sink.on_status(&text);
        self.status = text;
    }

    // ── Loading ──────────────────────────────────────────────────────────────

    /// Open a playlist file. On failure the session is left untouched apart
    /// from the status text.
    pub async fn load_playlist(
        &mut self,
        path: &Path,
        sink: &mut dyn ChannelSink,
    ) -> Result<usize, LoadError> {
        let playlist = match playlist::load_playlist(path).await {
            Ok(playlist) => playlist,
            Err(e) => {
                warn!("load: {}", e);
                self.set_status(e.status_text(), sink);
                return Err(e);
            }
        };

        let count = playlist.len();
        info!("load: {} channels from {:?}", count, path);

        self.playlist = playlist;
        self.current = None;

        if count == 0 {
            self.apply_view(sink);
            self.set_status(STATUS_EMPTY_PLAYLIST.to_string(), sink);
            return Ok(0);
        }

        self.set_status(format!("Cargados {} canales", count), sink);
        self.apply_view(sink);
        if self.worker.ensure_started() {
            info!("fetch worker started");
        }
        self.paginator.request_next_batch();
        Ok(count)
    }

    /// Derive the view for the applied query and restart pagination on it.
    fn apply_view(&mut self, sink: &mut dyn ChannelSink) -> usize {
        let view = filter::filter_channels(&self.playlist, self.filter.query());
        let len = view.len();
        self.registry.clear();
        self.rendered.clear();
        self.scroll.reset();
        self.paginator.reset(view);
        sink.on_cleared();
        len
    }

    // ── Filtering / scrolling ────────────────────────────────────────────────

    /// Record a keystroke in the filter box. The view changes only after the
    /// debounce settles.
    pub fn set_query(&mut self, text: impl Into<String>) {
        self.filter.set_query(text);
    }

    fn refilter(&mut self, sink: &mut dyn ChannelSink) {
        let count = self.apply_view(sink);
        let text = filter::status_text(self.filter.query(), count);
        debug!("filter: {:?} -> {} channels", self.filter.query(), count);
        self.set_status(text, sink);
        self.paginator.request_next_batch();
    }

    /// Report the viewport position (1 = top, 0 = bottom).
    pub fn on_scroll(&mut self, fraction: f64) -> bool {
        if self.scroll.observe(fraction, tokio::time::Instant::now()) {
            self.paginator.request_next_batch()
        } else {
            false
        }
    }

    pub fn request_next_batch(&mut self) -> bool {
        self.paginator.request_next_batch()
    }

    // ── Event intake ─────────────────────────────────────────────────────────

    pub fn handle_event(&mut self, event: UiEvent, sink: &mut dyn ChannelSink) {
        match event {
            UiEvent::BatchReady(batch) => {
                if let Some(cards) = self.paginator.on_batch_ready(batch) {
                    for card in &cards {
                        self.rendered.push(card.id);
                        self.registry.insert(card.id, card.clone());
                    }
                    sink.on_batch_ready(&cards);
                }
            }
            UiEvent::BatchAborted { generation } => {
                self.paginator.on_batch_aborted(generation);
            }
            UiEvent::LogoReady { id, path } => match self.registry.get_mut(&id) {
                Some(card) => {
                    card.logo_path = Some(path.clone());
                    sink.on_logo_ready(id, &path);
                }
                None => trace!("logo for {} arrived after its card was cleared", id),
            },
            UiEvent::FilterDue { ticket, query } => {
                if self.filter.accept(ticket, &query) {
                    self.refilter(sink);
                }
            }
        }
    }

    /// Handle whatever is already queued, up to [`MAX_DRAIN`] events.
    pub fn pump(&mut self, rx: &mut mpsc::Receiver<UiEvent>, sink: &mut dyn ChannelSink) -> usize {
        let mut drained = 0;
        while drained < MAX_DRAIN {
            match rx.try_recv() {
                Ok(event) => {
                    self.handle_event(event, sink);
                    drained += 1;
                }
                Err(_) => break,
            }
        }
        drained
    }

    // ── Playback ─────────────────────────────────────────────────────────────

    pub async fn play<P: Player>(
        &mut self,
        player: &mut P,
        id: ChannelId,
        sink: &mut dyn ChannelSink,
    ) -> bool {
        let Some(channel) = self.playlist.by_id(id) else {
            debug!("play: unknown {}", id);
            return false;
        };
        let url = channel.url.clone();

        player.stop().await;
        match player.play(&url).await {
            Ok(()) => {
                info!("play: {} {}", id, url);
                self.current = Some(id.0);
                self.set_status(format!("Reproduciendo: {}", url), sink);
                true
            }
            Err(e) => {
                warn!("play: {} failed: {:#}", url, e);
                self.set_status(format!("Error al reproducir: {}", e), sink);
                false
            }
        }
    }

    pub async fn toggle_pause<P: Player>(&mut self, player: &mut P) {
        if let Err(e) = player.toggle_pause().await {
            warn!("pause: {:#}", e);
        }
    }

    /// Next channel in playlist order; stays put at the last one.
    pub async fn next<P: Player>(&mut self, player: &mut P, sink: &mut dyn ChannelSink) -> bool {
        let target = match self.current {
            Some(pos) if pos + 1 < self.playlist.len() => pos + 1,
            Some(_) => return false,
            None if !self.playlist.is_empty() => 0,
            None => return false,
        };
        self.play(player, ChannelId(target), sink).await
    }

    /// Previous channel in playlist order; stays put at the first one.
    pub async fn prev<P: Player>(&mut self, player: &mut P, sink: &mut dyn ChannelSink) -> bool {
        match self.current {
            Some(pos) if pos > 0 => self.play(player, ChannelId(pos - 1), sink).await,
            _ => false,
        }
    }

    // ── Shutdown ─────────────────────────────────────────────────────────────

    /// Stop playback and join the fetch worker within the configured bound.
    pub async fn shutdown<P: Player>(&mut self, player: &mut P) {
        self.filter.cancel();
        player.stop().await;
        let timeout = self.state.config.runtime.shutdown_timeout();
        self.worker.shutdown(timeout).await;
        info!("session: shut down");
    }
}
