//! Messages that cross from background tasks into the UI context, and the
//! view-model records handed to the consumer.

use std::path::PathBuf;

use crate::playlist::{strip_provider_prefix, ChannelId, ChannelRecord};

const SHORT_URL_LEN: usize = 50;

/// Lightweight view-model for one rendered channel card.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub id: ChannelId,
    pub name: String,
    pub url: String,
    pub logo_url: String,
    /// Cached icon, once the fetch worker delivered one.
    pub logo_path: Option<PathBuf>,
}

impl CardView {
    pub fn from_record(record: &ChannelRecord) -> Self {
        Self {
            id: record.id,
            name: record.name.clone(),
            url: record.url.clone(),
            logo_url: record.logo_url.clone().unwrap_or_default(),
            logo_path: None,
        }
    }

    pub fn display_name(&self) -> &str {
        strip_provider_prefix(&self.name)
    }

    /// URL shortened for a subtitle line.
    pub fn short_url(&self) -> String {
        if self.url.chars().count() > SHORT_URL_LEN {
            let head: String = self.url.chars().take(SHORT_URL_LEN).collect();
            format!("{}...", head)
        } else {
            self.url.clone()
        }
    }
}

/// A batch computed off the UI context, tagged with the view generation it
/// was computed for.
#[derive(Debug, Clone)]
pub struct ComputedBatch {
    pub generation: u64,
    pub start: usize,
    pub end: usize,
    pub cards: Vec<CardView>,
}

/// Everything the UI context receives from other tasks.
#[derive(Debug)]
pub enum UiEvent {
    /// A pagination batch finished computing.
    BatchReady(ComputedBatch),
    /// A pagination batch task ended without producing a batch.
    BatchAborted { generation: u64 },
    /// The fetch worker has an icon file for a channel.
    LogoReady { id: ChannelId, path: PathBuf },
    /// The filter debounce elapsed for `ticket`.
    FilterDue { ticket: u64, query: String },
}
