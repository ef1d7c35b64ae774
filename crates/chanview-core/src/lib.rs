//! Core of the chanview IPTV browser: playlist parsing, paged loading,
//! debounced filtering and a background logo cache.

pub mod cache;
pub mod config;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod pagination;
pub mod platform;
pub mod playlist;
pub mod protocol;
pub mod scroll;
pub mod session;

pub use config::Config;
pub use error::{FetchSkip, LoadError};
pub use playlist::{ChannelId, ChannelRecord, Playlist};
pub use protocol::{CardView, UiEvent};
pub use session::{AppState, ChannelSink, Player, Session};
