//! Extended-M3U playlist parsing.
//!
//! ```text
//! #EXTINF:-1 tvg-id="X" tvg-name="N" tvg-logo="L" group-title="G",Fallback Name
//! http://example/stream.ts
//! ```
//!
//! Malformed entries are skipped, never reported: a URL line without a
//! preceding `#EXTINF` is dropped, and an `#EXTINF` that is not followed by a
//! URL before the next `#EXTINF` (or end of file) is discarded.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::LoadError;

const EXTINF_PREFIX: &str = "#EXTINF:";
const PLAYLIST_EXTENSIONS: &[&str] = &["m3u", "m3u8"];

static LOGO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"tvg-logo="([^"]+)""#).expect("valid tvg-logo pattern"));
static NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"tvg-name="([^"]+)""#).expect("valid tvg-name pattern"));
static GROUP_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"group-title="([^"]+)""#).expect("valid group-title pattern"));
static ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"tvg-id="([^"]+)""#).expect("valid tvg-id pattern"));
static TITLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",([^,]+)$").expect("valid trailing title pattern"));

/// Stable identifier of a channel: its position in the parsed playlist.
/// Survives filtering, so a late logo delivery always names the right card.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelId(pub usize);

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "channel_{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: ChannelId,
    pub name: String,
    pub url: String,
    pub logo_url: Option<String>,
    pub group_title: Option<String>,
    /// The `tvg-id` attribute, carried as-is.
    pub tvg_id: Option<String>,
}

impl ChannelRecord {
    pub fn display_name(&self) -> &str {
        strip_provider_prefix(&self.name)
    }
}

/// Name without a `"XX |"` style provider prefix.
pub fn strip_provider_prefix(name: &str) -> &str {
    match name.rsplit_once('|') {
        Some((_, tail)) => tail.trim(),
        None => name,
    }
}

/// Ordered, immutable channel sequence. Cloning shares the storage.
#[derive(Debug, Clone, Default)]
pub struct Playlist {
    channels: Arc<[ChannelRecord]>,
}

impl Playlist {
    pub fn new(channels: Vec<ChannelRecord>) -> Self {
        Self {
            channels: channels.into(),
        }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&ChannelRecord> {
        self.channels.get(idx)
    }

    pub fn by_id(&self, id: ChannelId) -> Option<&ChannelRecord> {
        self.channels.get(id.0).filter(|c| c.id == id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ChannelRecord> {
        self.channels.iter()
    }
}

/// Attributes collected from the most recent `#EXTINF` line.
#[derive(Debug, Default)]
struct PendingMeta {
    name: Option<String>,
    logo_url: Option<String>,
    group_title: Option<String>,
    tvg_id: Option<String>,
}

impl PendingMeta {
    fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.logo_url.is_none()
            && self.group_title.is_none()
            && self.tvg_id.is_none()
    }
}

fn capture(re: &Regex, line: &str) -> Option<String> {
    re.captures(line)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn parse_extinf(line: &str) -> PendingMeta {
    let name = capture(&NAME_RE, line).or_else(|| {
        capture(&TITLE_RE, line)
            .map(|title| title.trim().to_string())
            .filter(|title| !title.is_empty())
    });

    PendingMeta {
        name,
        logo_url: capture(&LOGO_RE, line),
        group_title: capture(&GROUP_RE, line),
        tvg_id: capture(&ID_RE, line),
    }
}

pub fn parse_playlist(content: &str) -> Playlist {
    let mut channels = Vec::new();
    let mut pending = PendingMeta::default();

    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if line.starts_with(EXTINF_PREFIX) {
            // Last metadata before a URL wins.
            pending = parse_extinf(line);
            continue;
        }

        if line.starts_with('#') {
            continue;
        }

        if pending.is_empty() {
            continue;
        }

        let meta = std::mem::take(&mut pending);
        let id = ChannelId(channels.len());
        channels.push(ChannelRecord {
            id,
            name: meta
                .name
                .unwrap_or_else(|| format!("Canal {}", id.0 + 1)),
            url: line.to_string(),
            logo_url: meta.logo_url,
            group_title: meta.group_title,
            tvg_id: meta.tvg_id,
        });
    }

    Playlist::new(channels)
}

pub fn has_playlist_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            PLAYLIST_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

/// Validate and read a playlist file. Nothing is parsed unless the path
/// exists and carries a playlist extension.
pub async fn load_playlist(path: &Path) -> Result<Playlist, LoadError> {
    if !path.exists() {
        return Err(LoadError::NotFound(path.to_path_buf()));
    }
    if !has_playlist_extension(path) {
        return Err(LoadError::UnsupportedExtension(path.to_path_buf()));
    }

    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| LoadError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(parse_playlist(&content))
}
