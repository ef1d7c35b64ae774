//! PromptInput — one-line text prompt on top of tui-input, used for the
//! filter bar and the "open playlist" path prompt.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

#[derive(Debug, PartialEq)]
pub enum PromptAction {
    Changed(String),
    Confirmed(String),
    Cancelled,
    None,
}

pub struct PromptInput {
    input: Input,
    active: bool,
    prefix: &'static str,
    placeholder: String,
}

impl PromptInput {
    pub fn new(prefix: &'static str, placeholder: impl Into<String>) -> Self {
        Self {
            input: Input::default(),
            active: false,
            prefix,
            placeholder: placeholder.into(),
        }
    }

    pub fn activate(&mut self) {
        self.active = true;
    }

    pub fn deactivate(&mut self) {
        self.active = false;
    }

    pub fn clear(&mut self) {
        self.input = Input::default();
    }

    /// Esc on text clears it (`Changed("")`); Esc on an empty prompt closes
    /// it. Enter closes and hands back the text.
    pub fn handle_key(&mut self, key: KeyEvent) -> PromptAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    PromptAction::Changed(String::new())
                } else {
                    self.deactivate();
                    PromptAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                PromptAction::Confirmed(self.input.value().to_string())
            }
            _ => {
                match self.input.handle_event(&Event::Key(key)) {
                    Some(state) if state.value => {
                        PromptAction::Changed(self.input.value().to_string())
                    }
                    _ => PromptAction::None,
                }
            }
        }
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        let prefix_w = self.prefix.chars().count();
        let scroll = self
            .input
            .visual_scroll((area.width as usize).saturating_sub(prefix_w + 2));
        let value = self.input.value();
        let display = if value.is_empty() {
            Span::styled(
                format!("{}{}", self.prefix, self.placeholder),
                Style::default().fg(C_MUTED),
            )
        } else {
            let visible: String = value.chars().skip(scroll).collect();
            Span::styled(
                format!("{}{}", self.prefix, visible),
                Style::default().fg(C_FILTER_FG),
            )
        };

        let paragraph =
            Paragraph::new(Line::from(vec![display])).style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(paragraph, area);

        if self.active && area.width > 0 {
            let cursor_x =
                area.x + (prefix_w + self.input.visual_cursor().saturating_sub(scroll)) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn test_typing_reports_changes() {
        let mut prompt = PromptInput::new("/ ", "filtrar...");
        prompt.activate();
        assert_eq!(
            prompt.handle_key(key(KeyCode::Char('n'))),
            PromptAction::Changed("n".into())
        );
        assert_eq!(
            prompt.handle_key(key(KeyCode::Char('e'))),
            PromptAction::Changed("ne".into())
        );
        assert_eq!(
            prompt.handle_key(key(KeyCode::Backspace)),
            PromptAction::Changed("n".into())
        );
    }

    #[test]
    fn test_esc_clears_then_closes() {
        let mut prompt = PromptInput::new("/ ", "");
        prompt.activate();
        prompt.handle_key(key(KeyCode::Char('x')));
        assert_eq!(
            prompt.handle_key(key(KeyCode::Esc)),
            PromptAction::Changed(String::new())
        );
        assert!(prompt.active);
        assert_eq!(prompt.handle_key(key(KeyCode::Esc)), PromptAction::Cancelled);
        assert!(!prompt.active);
    }

    #[test]
    fn test_enter_confirms_text() {
        let mut prompt = PromptInput::new("> ", "");
        prompt.activate();
        for c in "a.m3u".chars() {
            prompt.handle_key(key(KeyCode::Char(c)));
        }
        assert_eq!(
            prompt.handle_key(key(KeyCode::Enter)),
            PromptAction::Confirmed("a.m3u".into())
        );
        assert!(!prompt.active);
    }
}
