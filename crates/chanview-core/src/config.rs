use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::platform;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paging: PagingConfig,
    #[serde(default)]
    pub scroll: ScrollConfig,
    #[serde(default)]
    pub filter: FilterConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub player: PlayerConfig,
}

/// Batch sizing. One batch is `visible + preload` entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PagingConfig {
    #[serde(default = "default_visible_batch_size")]
    pub visible_batch_size: usize,
    #[serde(default = "default_preload_batch_size")]
    pub preload_batch_size: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollConfig {
    /// Scroll fraction (1 = top, 0 = bottom) at or below which the next batch loads.
    #[serde(default = "default_scroll_threshold")]
    pub threshold: f64,
    #[serde(default = "default_scroll_cooldown_ms")]
    pub cooldown_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Logo hosts in the wild are frequently self-signed or expired; the
    /// fetcher trusts every certificate unless this is switched off.
    #[serde(default = "default_accept_invalid_certs")]
    pub accept_invalid_certs: bool,
    #[serde(default = "default_logo_cache_dir")]
    pub cache_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
    /// Capacity of the worker → UI delivery channel.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlayerConfig {
    /// Extra arguments appended to the mpv command line.
    #[serde(default)]
    pub mpv_args: Vec<String>,
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            visible_batch_size: default_visible_batch_size(),
            preload_batch_size: default_preload_batch_size(),
        }
    }
}

impl Default for ScrollConfig {
    fn default() -> Self {
        Self {
            threshold: default_scroll_threshold(),
            cooldown_ms: default_scroll_cooldown_ms(),
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            accept_invalid_certs: default_accept_invalid_certs(),
            cache_dir: default_logo_cache_dir(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

fn default_visible_batch_size() -> usize {
    15
}

fn default_preload_batch_size() -> usize {
    10
}

fn default_scroll_threshold() -> f64 {
    0.2
}

fn default_scroll_cooldown_ms() -> u64 {
    1000
}

fn default_debounce_ms() -> u64 {
    500
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) \
     Chrome/91.0.4472.124 Safari/537.36"
        .to_string()
}

fn default_accept_invalid_certs() -> bool {
    true
}

fn default_logo_cache_dir() -> PathBuf {
    platform::cache_dir().join("logos")
}

fn default_shutdown_timeout_ms() -> u64 {
    1000
}

fn default_channel_capacity() -> usize {
    1024
}

impl PagingConfig {
    pub fn batch_size(&self) -> usize {
        (self.visible_batch_size + self.preload_batch_size).max(1)
    }
}

impl ScrollConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_millis(self.cooldown_ms)
    }
}

impl FilterConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl RuntimeConfig {
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}
