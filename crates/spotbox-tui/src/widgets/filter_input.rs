//! FilterInput — wraps tui-input for the queue filter bar and the add-URI
//! prompt. The two differ only in prefix glyph and placeholder text.

use ratatui::crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use tui_input::{backend::crossterm::EventHandler, Input};

use crate::theme::{C_FILTER_BG, C_FILTER_FG, C_MUTED};

pub enum FilterAction {
    Changed(String),
    Confirmed,
    Cancelled,
}

pub struct FilterInput {
    input: Input,
    pub active: bool,
    prefix: &'static str,
    placeholder: String,
}

impl FilterInput {
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

    pub fn text(&self) -> &str {
        self.input.value()
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn is_empty(&self) -> bool {
        self.input.value().is_empty()
    }

    /// Handle a key event. Returns what happened.
    ///
    /// Esc behaviour:
    ///   - If the input has text: clear the text, emit `Changed("")` (keeps the bar open but empty)
    ///   - If the input is already empty: deactivate and emit `Cancelled`
    pub fn handle_key(&mut self, key: KeyEvent) -> FilterAction {
        match key.code {
            KeyCode::Esc => {
                if !self.input.value().is_empty() {
                    self.input = Input::default();
                    FilterAction::Changed(String::new())
                } else {
                    self.deactivate();
                    FilterAction::Cancelled
                }
            }
            KeyCode::Enter => {
                self.deactivate();
                FilterAction::Confirmed
            }
            _ => {
                self.input
                    .handle_event(&ratatui::crossterm::event::Event::Key(key));
                FilterAction::Changed(self.input.value().to_string())
            }
        }
    }

    /// Render the input bar into `area`.
    pub fn draw(&self, frame: &mut Frame, area: Rect) {
        if area.width < 3 {
            return;
        }
        let scroll = self
            .input
            .visual_scroll(area.width.saturating_sub(4) as usize);
        let value = self.input.value();

        // Prefix stays pinned; the value paragraph scrolls by columns, which
        // keeps long multibyte text safe (no byte slicing at a width offset).
        let prefix = Paragraph::new(Span::styled(
            format!("{} ", self.prefix),
            Style::default().fg(C_FILTER_FG),
        ))
        .style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(prefix, area);

        let text_area = Rect::new(area.x + 2, area.y, area.width - 2, area.height);
        let text = if value.is_empty() {
            Paragraph::new(Line::from(Span::styled(
                self.placeholder.clone(),
                Style::default().fg(C_MUTED),
            )))
        } else {
            Paragraph::new(Line::from(Span::styled(
                value.to_string(),
                Style::default().fg(C_FILTER_FG),
            )))
            .scroll((0, scroll as u16))
        }
        .style(Style::default().bg(C_FILTER_BG));
        frame.render_widget(text, text_area);

        // Show cursor when active
        if self.active && !value.is_empty() {
            let cursor_x = text_area.x + (self.input.visual_cursor() - scroll) as u16;
            frame.set_cursor_position((cursor_x.min(area.x + area.width - 1), area.y));
        }
    }
}

impl Default for FilterInput {
    fn default() -> Self {
        Self::new("/", "filter...")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::crossterm::event::KeyModifiers;
    use ratatui::{backend::TestBackend, Terminal};

    fn type_str(input: &mut FilterInput, s: &str) {
        for ch in s.chars() {
            input.handle_key(KeyEvent::new(KeyCode::Char(ch), KeyModifiers::NONE));
        }
    }

    #[test]
    fn test_esc_clears_then_cancels() {
        let mut input = FilterInput::default();
        input.activate();
        type_str(&mut input, "abc");
        assert!(matches!(
            input.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            FilterAction::Changed(q) if q.is_empty()
        ));
        assert!(matches!(
            input.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE)),
            FilterAction::Cancelled
        ));
        assert!(!input.is_active());
    }

    #[test]
    fn test_draw_scrolled_multibyte_text() {
        // Wide CJK input longer than the bar; the scrolled render must not
        // split the value at a non-char boundary.
        let mut input = FilterInput::default();
        input.activate();
        type_str(&mut input, &"日本語のフィルタ".repeat(4));

        let backend = TestBackend::new(12, 1);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal
            .draw(|f| input.draw(f, Rect::new(0, 0, 12, 1)))
            .unwrap();
    }
}
