//! ChannelList — the card list. Receives cards from the session through
//! `ChannelSink` and keeps its own selection and scroll position.

use std::collections::HashMap;
use std::path::Path;

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{List, ListItem, Paragraph},
    Frame,
};

use chanview_core::{CardView, ChannelId, ChannelSink};

use crate::action::Action;
use crate::theme::{
    style_selected, C_LOADING, C_LOGO, C_MUTED, C_PLAYING, C_PRIMARY, C_SECONDARY, C_TAG,
};
use crate::widgets::pane_chrome::{pane_chrome, Badge};

/// Each card takes a title row and a subtitle row.
const ROWS_PER_CARD: usize = 2;

#[derive(Default)]
pub struct ChannelList {
    cards: Vec<CardView>,
    index: HashMap<ChannelId, usize>,
    selected: usize,
    offset: usize,
    /// Cards that fit in the last drawn area.
    page: usize,
    status: String,
}

impl ChannelSink for ChannelList {
    fn on_cleared(&mut self) {
        self.cards.clear();
        self.index.clear();
        self.selected = 0;
        self.offset = 0;
    }

    fn on_batch_ready(&mut self, cards: &[CardView]) {
        for card in cards {
            self.index.insert(card.id, self.cards.len());
            self.cards.push(card.clone());
        }
    }

    fn on_logo_ready(&mut self, id: ChannelId, path: &Path) {
        if let Some(&pos) = self.index.get(&id) {
            self.cards[pos].logo_path = Some(path.to_path_buf());
        }
    }

    fn on_status(&mut self, text: &str) {
        self.status = text.to_string();
    }
}

impl ChannelList {
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn selected_id(&self) -> Option<ChannelId> {
        self.cards.get(self.selected).map(|c| c.id)
    }

    fn page(&self) -> usize {
        self.page.max(1)
    }

    pub fn select_up(&mut self, n: usize) {
        self.selected = self.selected.saturating_sub(n);
        self.ensure_visible();
    }

    pub fn select_down(&mut self, n: usize) {
        self.selected = (self.selected + n).min(self.cards.len().saturating_sub(1));
        self.ensure_visible();
    }

    pub fn select_first(&mut self) {
        self.selected = 0;
        self.ensure_visible();
    }

    pub fn select_last(&mut self) {
        self.selected = self.cards.len().saturating_sub(1);
        self.ensure_visible();
    }

    fn ensure_visible(&mut self) {
        let page = self.page();
        if self.selected < self.offset {
            self.offset = self.selected;
        } else if self.selected >= self.offset + page {
            self.offset = self.selected + 1 - page;
        }
    }

    /// Every card is on screen, so there is nothing left to scroll to.
    pub fn fits_on_screen(&self) -> bool {
        self.cards.len() <= self.page()
    }

    /// Viewport position: 1.0 at the top, 0.0 once the last card is visible.
    pub fn scroll_fraction(&self) -> f64 {
        let hidden = self.cards.len().saturating_sub(self.page());
        if hidden == 0 {
            return 0.0;
        }
        1.0 - (self.offset.min(hidden) as f64 / hidden as f64)
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        let offset_before = self.offset;
        let mut actions = Vec::new();

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.select_down(1),
            KeyCode::PageUp => self.select_up(self.page()),
            KeyCode::PageDown => self.select_down(self.page()),
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.select_up(self.page() / 2)
            }
            KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.select_down(self.page() / 2)
            }
            KeyCode::Home | KeyCode::Char('g') => self.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.select_last(),
            KeyCode::Enter => {
                if let Some(id) = self.selected_id() {
                    actions.push(Action::Play(id));
                }
            }
            _ => {}
        }

        if self.offset != offset_before {
            actions.push(Action::Scrolled(self.scroll_fraction()));
        }
        actions
    }

    pub fn draw(
        &mut self,
        frame: &mut Frame,
        area: Rect,
        focused: bool,
        playing: Option<ChannelId>,
        total: usize,
        loading: bool,
    ) {
        let counter = format!("{}/{}", self.cards.len(), total);
        let badge = Badge {
            text: &counter,
            color: if loading { C_LOADING } else { C_TAG },
        };
        let block = pane_chrome("canales", focused, Some(badge));
        let inner = block.inner(area);
        frame.render_widget(block, area);

        self.page = (inner.height as usize / ROWS_PER_CARD).max(1);
        self.ensure_visible();

        if self.cards.is_empty() {
            frame.render_widget(
                Paragraph::new(Span::styled(
                    format!("  {}", self.status),
                    Style::default().fg(C_MUTED),
                )),
                inner,
            );
            return;
        }

        let width = inner.width as usize;
        let items: Vec<ListItem> = self
            .cards
            .iter()
            .enumerate()
            .skip(self.offset)
            .take(self.page)
            .map(|(pos, card)| render_card(card, pos == self.selected, playing == Some(card.id), width))
            .collect();

        frame.render_widget(List::new(items), inner);
    }
}

fn render_card(card: &CardView, selected: bool, playing: bool, width: usize) -> ListItem<'static> {
    let marker = if playing {
        Span::styled("▶ ", Style::default().fg(C_PLAYING))
    } else {
        Span::raw("  ")
    };
    let logo = match &card.logo_path {
        Some(_) => Span::styled("■ ", Style::default().fg(C_LOGO)),
        None => Span::styled("□ ", Style::default().fg(C_MUTED)),
    };
    let name_style = if playing {
        Style::default().fg(C_PLAYING).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(C_PRIMARY)
    };
    let name = truncate(card.display_name(), width.saturating_sub(4));
    let subtitle = truncate(&card.short_url(), width.saturating_sub(4));

    let item = ListItem::new(vec![
        Line::from(vec![marker, logo, Span::styled(name, name_style)]),
        Line::from(vec![
            Span::raw("    "),
            Span::styled(subtitle, Style::default().fg(C_SECONDARY)),
        ]),
    ]);
    if selected {
        item.style(style_selected())
    } else {
        item
    }
}

fn truncate(text: &str, max_width: usize) -> String {
    use unicode_width::UnicodeWidthChar;

    let mut out = String::new();
    let mut used = 0;
    for ch in text.chars() {
        let w = ch.width().unwrap_or(0);
        if used + w > max_width {
            out.push('…');
            break;
        }
        used += w;
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(i: usize) -> CardView {
        CardView {
            id: ChannelId(i),
            name: format!("Canal {}", i),
            url: format!("http://stream/{}", i),
            logo_url: String::new(),
            logo_path: None,
        }
    }

    fn list_with(n: usize, page: usize) -> ChannelList {
        let mut list = ChannelList {
            page,
            ..ChannelList::default()
        };
        let cards: Vec<_> = (0..n).map(card).collect();
        list.on_batch_ready(&cards);
        list
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_fraction_runs_from_top_to_bottom() {
        let mut list = list_with(25, 5);
        assert_eq!(list.scroll_fraction(), 1.0);
        list.select_last();
        assert_eq!(list.scroll_fraction(), 0.0);
    }

    #[test]
    fn test_short_list_reads_as_bottom() {
        let list = list_with(3, 10);
        assert_eq!(list.scroll_fraction(), 0.0);
    }

    #[test]
    fn test_moving_reports_scroll_and_enter_plays() {
        let mut list = list_with(25, 5);
        for _ in 0..4 {
            list.handle_key(key(KeyCode::Down));
        }
        let actions = list.handle_key(key(KeyCode::Down));
        assert!(matches!(actions.as_slice(), [Action::Scrolled(f)] if *f < 1.0));

        let actions = list.handle_key(key(KeyCode::Enter));
        assert!(matches!(actions.as_slice(), [Action::Play(ChannelId(5))]));
    }

    #[test]
    fn test_logo_updates_matching_card_only() {
        let mut list = list_with(3, 5);
        list.on_logo_ready(ChannelId(1), Path::new("/c/one.png"));
        list.on_logo_ready(ChannelId(9), Path::new("/c/nine.png"));
        assert!(list.cards[1].logo_path.is_some());
        assert!(list.cards[0].logo_path.is_none());

        list.on_cleared();
        assert_eq!(list.len(), 0);
        assert_eq!(list.selected_id(), None);
    }

    #[test]
    fn test_truncate_respects_width() {
        assert_eq!(truncate("abcdef", 3), "abc…");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
