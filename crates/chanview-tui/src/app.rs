//! App — terminal event loop around a core `Session`.
//!
//! Architecture:
//! - A blocking reader task forwards crossterm events over an mpsc channel.
//! - The core's `UiEvent` receiver (batches, logos, debounce) is drained in
//!   the same `select!` loop, so the session is only ever touched here.
//! - Key handling produces `Action`s; `dispatch` applies them to the session.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use ratatui::crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Frame, Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use chanview_core::session::MAX_DRAIN;
use chanview_core::{ChannelSink, Session, UiEvent};

use crate::{
    action::Action,
    components::channel_list::ChannelList,
    player::MpvPlayer,
    widgets::{
        filter_input::{PromptAction, PromptInput},
        status_bar::{self, InputMode},
    },
};

const INPUT_POLL: Duration = Duration::from_millis(100);
const UI_TICK: Duration = Duration::from_millis(100);

pub struct App {
    session: Session,
    player: MpvPlayer,
    list: ChannelList,
    filter: PromptInput,
    open_prompt: PromptInput,
    mode: InputMode,
    initial_playlist: Option<PathBuf>,
    should_quit: bool,
}

impl App {
    pub fn new(session: Session, player: MpvPlayer, initial_playlist: Option<PathBuf>) -> Self {
        let mut list = ChannelList::default();
        list.on_status(session.status());
        Self {
            session,
            player,
            list,
            filter: PromptInput::new("/ ", "filtrar canales..."),
            open_prompt: PromptInput::new("abrir: ", "ruta a un archivo .m3u / .m3u8"),
            mode: InputMode::Normal,
            initial_playlist,
            should_quit: false,
        }
    }

    // ── Main run loop ─────────────────────────────────────────────────────────

    pub async fn run(mut self, mut core_rx: mpsc::Receiver<UiEvent>) -> anyhow::Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        // ── Background task: keyboard events ──────────────────────────────────
        let (term_tx, mut term_rx) = mpsc::channel::<Event>(1024);
        tokio::task::spawn_blocking(move || loop {
            if term_tx.is_closed() {
                break;
            }
            match event::poll(INPUT_POLL) {
                Ok(true) => match event::read() {
                    Ok(ev) => {
                        if term_tx.blocking_send(ev).is_err() {
                            break;
                        }
                    }
                    Err(_) => break,
                },
                Ok(false) => {}
                Err(_) => break,
            }
        });

        if let Some(path) = self.initial_playlist.take() {
            self.dispatch(Action::LoadPlaylist(path)).await;
        }

        let mut ui_tick = tokio::time::interval(UI_TICK);
        ui_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        // ── Main loop ─────────────────────────────────────────────────────────
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal.draw(|f| self.draw(f))?;
            }
            needs_redraw = false;

            if self.should_quit {
                break;
            }

            tokio::select! {
                Some(ev) = term_rx.recv() => {
                    self.handle_terminal_event(ev).await;
                    let mut drained = 0usize;
                    while drained < MAX_DRAIN && !self.should_quit {
                        match term_rx.try_recv() {
                            Ok(ev) => self.handle_terminal_event(ev).await,
                            Err(_) => break,
                        }
                        drained += 1;
                    }
                    needs_redraw = true;
                }

                Some(ev) = core_rx.recv() => {
                    self.session.handle_event(ev, &mut self.list);
                    self.session.pump(&mut core_rx, &mut self.list);
                    self.fill_viewport();
                    needs_redraw = true;
                }

                _ = ui_tick.tick() => {
                    if self.session.pump(&mut core_rx, &mut self.list) > 0 {
                        needs_redraw = true;
                    }
                    self.fill_viewport();
                }
            }
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        drop(term_rx);
        self.session.shutdown(&mut self.player).await;
        self.player.kill().await;

        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;
        info!("chanview exiting");

        Ok(())
    }

    /// Keep loading while every rendered card already fits on screen; the
    /// viewer has no way to scroll towards the next batch otherwise.
    fn fill_viewport(&mut self) {
        if self.list.len() > 0 && self.list.fits_on_screen() {
            self.session.request_next_batch();
        }
    }

    // ── Input ─────────────────────────────────────────────────────────────────

    async fn handle_terminal_event(&mut self, ev: Event) {
        if let Event::Key(key) = ev {
            if key.kind == KeyEventKind::Press {
                self.handle_key(key).await;
            }
        }
    }

    async fn handle_key(&mut self, key: KeyEvent) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.dispatch(Action::Quit).await;
            return;
        }

        let actions = match self.mode {
            InputMode::Filter => match self.filter.handle_key(key) {
                PromptAction::Changed(text) => vec![Action::FilterChanged(text)],
                PromptAction::Confirmed(_) | PromptAction::Cancelled => {
                    self.mode = InputMode::Normal;
                    Vec::new()
                }
                PromptAction::None => Vec::new(),
            },
            InputMode::Open => match self.open_prompt.handle_key(key) {
                PromptAction::Confirmed(text) => {
                    self.mode = InputMode::Normal;
                    self.open_prompt.clear();
                    match text.trim() {
                        "" => Vec::new(),
                        path => vec![Action::LoadPlaylist(expand_home(path))],
                    }
                }
                PromptAction::Cancelled => {
                    self.mode = InputMode::Normal;
                    Vec::new()
                }
                PromptAction::Changed(_) | PromptAction::None => Vec::new(),
            },
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => vec![Action::Quit],
                KeyCode::Char(' ') => vec![Action::TogglePause],
                KeyCode::Char('n') => vec![Action::Next],
                KeyCode::Char('p') => vec![Action::Prev],
                KeyCode::Char('/') => vec![Action::OpenFilter],
                KeyCode::Char('o') => vec![Action::OpenPathPrompt],
                _ => self.list.handle_key(key),
            },
        };

        for action in actions {
            self.dispatch(action).await;
        }
    }

    // ── Dispatch ──────────────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        debug!("dispatch: {:?}", action);
        match action {
            Action::Play(id) => {
                self.session.play(&mut self.player, id, &mut self.list).await;
            }
            Action::TogglePause => self.session.toggle_pause(&mut self.player).await,
            Action::Next => {
                self.session.next(&mut self.player, &mut self.list).await;
            }
            Action::Prev => {
                self.session.prev(&mut self.player, &mut self.list).await;
            }
            Action::Scrolled(fraction) => {
                self.session.on_scroll(fraction);
            }
            Action::OpenFilter => {
                self.mode = InputMode::Filter;
                self.filter.activate();
            }
            Action::FilterChanged(text) => self.session.set_query(text),
            Action::OpenPathPrompt => {
                self.mode = InputMode::Open;
                self.open_prompt.activate();
            }
            Action::LoadPlaylist(path) => {
                if let Err(e) = self.session.load_playlist(&path, &mut self.list).await {
                    debug!("load rejected: {}", e);
                }
            }
            Action::Quit => self.should_quit = true,
        }
    }

    // ── Drawing ───────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(1),
                Constraint::Min(3),
                Constraint::Length(1),
                Constraint::Length(1),
                Constraint::Length(1),
            ])
            .split(frame.area());

        match self.mode {
            InputMode::Open => self.open_prompt.draw(frame, chunks[0]),
            _ => self.filter.draw(frame, chunks[0]),
        }

        let cursor = self.session.paginator().cursor();
        self.list.draw(
            frame,
            chunks[1],
            self.mode == InputMode::Normal,
            self.session.current(),
            self.session.paginator().view().len(),
            cursor.loading,
        );

        status_bar::draw_status_line(
            frame,
            chunks[2],
            self.list.status(),
            self.session.current().is_some(),
        );
        status_bar::draw_separator(frame, chunks[3]);
        status_bar::draw_keys_bar(frame, chunks[4], self.mode);
    }
}

fn expand_home(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/list.m3u"), PathBuf::from("/abs/list.m3u"));
        assert_eq!(expand_home("rel.m3u8"), PathBuf::from("rel.m3u8"));
        assert!(expand_home("~/tv/list.m3u").ends_with("tv/list.m3u"));
    }
}
