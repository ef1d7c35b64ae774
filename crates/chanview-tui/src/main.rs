mod action;
mod app;
mod components;
mod player;
mod theme;
mod widgets;

use std::path::PathBuf;

use chanview_core::platform;
use chanview_core::{AppState, Config, Session};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;

    let log_path = data_dir.join("chanview.log");
    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("chanview log: {}", log_path.display());

    tracing::info!("chanview starting…");

    // ── Load config ──────────────────────────────────────────────────────────
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!("config: {:#}; using defaults", e);
            Config::default()
        }
    };
    tracing::info!("logo cache at {:?}", config.fetch.cache_dir);

    // ── Core wiring ──────────────────────────────────────────────────────────
    let (state, worker, core_rx) = AppState::build(config)?;
    let session = Session::new(&state, worker);
    let player = player::MpvPlayer::new(state.config.player.mpv_args.clone());

    let initial_playlist = std::env::args_os().nth(1).map(PathBuf::from);

    // ── Run TUI ──────────────────────────────────────────────────────────────
    let app = app::App::new(session, player, initial_playlist);
    app.run(core_rx).await?;

    Ok(())
}
