//! Live text filter with a trailing-edge debounce.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::AbortHandle;
use tracing::debug;

use crate::pagination::ActiveView;
use crate::playlist::Playlist;
use crate::protocol::UiEvent;

/// Case-insensitive substring match on channel names, order preserved.
/// An empty query yields the full playlist without copying it.
pub fn filter_channels(playlist: &Playlist, query: &str) -> ActiveView {
    if query.is_empty() {
        return ActiveView::full(playlist.clone());
    }

    let needle = query.to_lowercase();
    let positions = playlist
        .iter()
        .enumerate()
        .filter(|(_, ch)| ch.name.to_lowercase().contains(&needle))
        .map(|(pos, _)| pos)
        .collect();

    ActiveView::selection(playlist.clone(), positions)
}

pub fn status_text(query: &str, count: usize) -> String {
    if query.is_empty() {
        format!("Mostrando {} canales", count)
    } else {
        format!("{} canales encontrados", count)
    }
}

/// Holds the applied query and at most one pending debounce timer.
///
/// Each `set_query` aborts the previous timer and bumps the ticket. A timer
/// that already fired but whose `FilterDue` message is still queued carries
/// an old ticket and is refused by `accept`.
pub struct FilterEngine {
    query: String,
    debounce: Duration,
    ticket: u64,
    pending: Option<AbortHandle>,
    events: mpsc::Sender<UiEvent>,
}

impl FilterEngine {
    pub fn new(debounce: Duration, events: mpsc::Sender<UiEvent>) -> Self {
        Self {
            query: String::new(),
            debounce,
            ticket: 0,
            pending: None,
            events,
        }
    }

    /// The query the active view was last derived from.
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Arm (or re-arm) the debounce for `text`.
    pub fn set_query(&mut self, text: impl Into<String>) {
        if let Some(previous) = self.pending.take() {
            previous.abort();
        }

        self.ticket = self.ticket.wrapping_add(1);
        let ticket = self.ticket;
        let query = text.into();
        let debounce = self.debounce;
        let events = self.events.clone();

        let task = tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if events.send(UiEvent::FilterDue { ticket, query }).await.is_err() {
                debug!("filter: UI channel closed before debounce fired");
            }
        });
        self.pending = Some(task.abort_handle());
    }

    /// Claim a fired debounce. Returns `true` when `ticket` is the latest one,
    /// in which case `query` becomes the applied query.
    pub fn accept(&mut self, ticket: u64, query: &str) -> bool {
        if ticket != self.ticket {
            debug!("filter: ignoring superseded ticket {} (latest {})", ticket, self.ticket);
            return false;
        }
        self.pending = None;
        self.query = query.to_string();
        true
    }

    /// Drop any pending timer without applying it.
    pub fn cancel(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
        self.ticket = self.ticket.wrapping_add(1);
    }
}

impl Drop for FilterEngine {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.abort();
        }
    }
}
