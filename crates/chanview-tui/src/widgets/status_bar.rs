//! Status bar — status line plus the mode/keybindings footer.

use ratatui::{
    layout::Rect,
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};

use crate::theme::{
    C_ACCENT, C_MODE_FILTER, C_MODE_NORMAL, C_MODE_OPEN, C_MUTED, C_PLAYING, C_SECONDARY,
    C_SEPARATOR,
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputMode {
    Normal,
    Filter,
    Open,
}

impl InputMode {
    pub fn label(self) -> &'static str {
        match self {
            Self::Normal => "CANALES",
            Self::Filter => "FILTRO",
            Self::Open => "ABRIR",
        }
    }

    pub fn color(self) -> ratatui::style::Color {
        match self {
            Self::Normal => C_MODE_NORMAL,
            Self::Filter => C_MODE_FILTER,
            Self::Open => C_MODE_OPEN,
        }
    }
}

/// Session status text, with a dot that lights up while something plays.
pub fn draw_status_line(frame: &mut Frame, area: Rect, status: &str, playing: bool) {
    let dot = if playing {
        Span::styled("●", Style::default().fg(C_PLAYING))
    } else {
        Span::styled("○", Style::default().fg(C_ACCENT))
    };
    let line = Line::from(vec![
        dot,
        Span::raw(" "),
        Span::styled(status, Style::default().fg(C_SECONDARY)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_separator(frame: &mut Frame, area: Rect) {
    let line = Line::from(Span::styled(
        "─".repeat(area.width as usize),
        Style::default().fg(C_SEPARATOR),
    ));
    frame.render_widget(Paragraph::new(line), area);
}

pub fn draw_keys_bar(frame: &mut Frame, area: Rect, mode: InputMode) {
    let keys = match mode {
        InputMode::Normal => {
            " ↑↓/jk select  PgUp/PgDn page  Enter play  Space pause  n/p next/prev  / filter  o open  q quit"
        }
        InputMode::Filter => " type to filter  Enter keep  Esc clear+close",
        InputMode::Open => " path to .m3u/.m3u8  Enter load  Esc cancel",
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} ", mode.label()),
            Style::default()
                .fg(mode.color())
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" "),
        Span::styled(keys, Style::default().fg(C_MUTED)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_labels_are_distinct() {
        let labels = [InputMode::Normal, InputMode::Filter, InputMode::Open].map(InputMode::label);
        assert_eq!(labels, ["CANALES", "FILTRO", "ABRIR"]);
        assert_ne!(InputMode::Filter.color(), InputMode::Normal.color());
    }
}
