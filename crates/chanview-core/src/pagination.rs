//! Incremental batch loading over the active view.
//!
//! The cursor only moves forward. `request_next_batch` computes the next
//! window on a spawned task and the result comes back to the UI context as
//! `UiEvent::BatchReady`; the paginator then advances the cursor and queues
//! one logo fetch per card. Every batch carries the generation of the view it
//! was cut from, so a batch that lands after a filter reset is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::fetch::{FetchQueue, FetchTask};
use crate::playlist::{ChannelRecord, Playlist};
use crate::protocol::{CardView, ComputedBatch, UiEvent};

/// The sequence pagination walks: the whole playlist, or a filtered
/// selection of positions into it. The unfiltered case shares the playlist
/// storage instead of copying it.
#[derive(Debug, Clone, Default)]
pub struct ActiveView {
    playlist: Playlist,
    selection: Option<Arc<[usize]>>,
}

impl ActiveView {
    pub fn full(playlist: Playlist) -> Self {
        Self {
            playlist,
            selection: None,
        }
    }

    pub fn selection(playlist: Playlist, positions: Vec<usize>) -> Self {
        Self {
            playlist,
            selection: Some(positions.into()),
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn is_full(&self) -> bool {
        self.selection.is_none()
    }

    pub fn len(&self) -> usize {
        match &self.selection {
            Some(positions) => positions.len(),
            None => self.playlist.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn get(&self, idx: usize) -> Option<&ChannelRecord> {
        match &self.selection {
            Some(positions) => positions.get(idx).and_then(|&pos| self.playlist.get(pos)),
            None => self.playlist.get(idx),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChannelRecord> + '_ {
        (0..self.len()).filter_map(move |idx| self.get(idx))
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadCursor {
    pub offset: usize,
    pub loading: bool,
}

pub struct Paginator {
    view: ActiveView,
    cursor: LoadCursor,
    batch_size: usize,
    generation: u64,
    events: mpsc::Sender<UiEvent>,
    queue: FetchQueue,
}

impl Paginator {
    pub fn new(batch_size: usize, events: mpsc::Sender<UiEvent>, queue: FetchQueue) -> Self {
        Self {
            view: ActiveView::default(),
            cursor: LoadCursor::default(),
            batch_size: batch_size.max(1),
            generation: 0,
            events,
            queue,
        }
    }

    pub fn view(&self) -> &ActiveView {
        &self.view
    }

    pub fn cursor(&self) -> LoadCursor {
        self.cursor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_more(&self) -> bool {
        self.cursor.offset < self.view.len()
    }

    /// Swap in a new view. Any batch still in flight for the old one will be
    /// discarded on arrival.
    pub fn reset(&mut self, view: ActiveView) {
        self.generation = self.generation.wrapping_add(1);
        self.view = view;
        self.cursor = LoadCursor::default();
    }

    /// Start computing the next batch. Returns `false` (and does nothing)
    /// while a batch is in flight or when the view is exhausted.
    pub fn request_next_batch(&mut self) -> bool {
        if self.cursor.loading || !self.has_more() {
            return false;
        }
        self.cursor.loading = true;

        let start = self.cursor.offset;
        let end = (start + self.batch_size).min(self.view.len());
        let generation = self.generation;
        let view = self.view.clone();
        let events = self.events.clone();

        debug!("pagination: batch [{}, {}) gen {}", start, end, generation);

        tokio::spawn(async move {
            let mut guard = AbortOnDrop::new(events.clone(), generation);
            tokio::task::yield_now().await;

            let cards: Vec<CardView> = (start..end)
                .filter_map(|idx| view.get(idx))
                .map(CardView::from_record)
                .collect();
            let batch = ComputedBatch {
                generation,
                start,
                end,
                cards,
            };

            if events.send(UiEvent::BatchReady(batch)).await.is_ok() {
                guard.disarm();
            }
        });

        true
    }

    /// Accept a computed batch. Returns the cards to render, or `None` when
    /// the batch belongs to a superseded view.
    pub fn on_batch_ready(&mut self, batch: ComputedBatch) -> Option<Vec<CardView>> {
        if batch.generation != self.generation {
            debug!(
                "pagination: dropping stale batch gen {} (current {})",
                batch.generation, self.generation
            );
            return None;
        }

        self.cursor.loading = false;
        self.cursor.offset = batch.end.max(self.cursor.offset).min(self.view.len());

        for card in &batch.cards {
            self.queue.enqueue(FetchTask {
                channel_id: card.id,
                logo_url: card.logo_url.clone(),
                channel_name: card.name.clone(),
            });
        }

        Some(batch.cards)
    }

    pub fn on_batch_aborted(&mut self, generation: u64) {
        if generation == self.generation && self.cursor.loading {
            warn!("pagination: batch task for gen {} ended without a batch", generation);
            self.cursor.loading = false;
        }
    }
}

/// Reports `BatchAborted` unless disarmed, so a batch task that panics or is
/// cancelled still clears the in-flight flag.
struct AbortOnDrop {
    events: mpsc::Sender<UiEvent>,
    generation: u64,
    armed: bool,
}

impl AbortOnDrop {
    fn new(events: mpsc::Sender<UiEvent>, generation: u64) -> Self {
        Self {
            events,
            generation,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let event = UiEvent::BatchAborted {
            generation: self.generation,
        };
        match self.events.try_send(event) {
            Ok(()) | Err(TrySendError::Closed(_)) => {}
            Err(TrySendError::Full(event)) => {
                if let Ok(handle) = tokio::runtime::Handle::try_current() {
                    let events = self.events.clone();
                    handle.spawn(async move {
                        let _ = events.send(event).await;
                    });
                }
            }
        }
    }
}
