//! Action enum — user intents produced by key handling, dispatched by the App.

use std::path::PathBuf;

use chanview_core::ChannelId;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // ── Playback ─────────────────────────────────────────────────────────────
    Play(ChannelId),
    TogglePause,
    Next,
    Prev,

    // ── Navigation ───────────────────────────────────────────────────────────
    /// The viewport moved; carries the new scroll fraction (1 = top).
    Scrolled(f64),

    // ── Filter / open ────────────────────────────────────────────────────────
    OpenFilter,
    FilterChanged(String),
    OpenPathPrompt,
    LoadPlaylist(PathBuf),

    // ── System ───────────────────────────────────────────────────────────────
    Quit,
}
