//! QueuePanel component — the list of tracks waiting behind the current one.
//!
//! Rows are pre-rendered strings ("Track - Artist"); tracks with no artist
//! are dropped before they reach the list. Supports filtering and copy.

use ratatui::crossterm::event::{
    KeyCode, KeyEvent, KeyEventKind, MouseButton, MouseEvent, MouseEventKind,
};
use ratatui::{
    layout::Rect,
    style::Style,
    text::{Line, Span},
    widgets::Paragraph,
    Frame,
};
use spotbox_proto::api::Track;
use tracing::debug;
use unicode_width::UnicodeWidthStr;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    theme::{
        style_muted, style_selected_focused, C_BADGE_ERR, C_BADGE_LIVE, C_NUMBER_HINT,
        C_SECONDARY,
    },
    widgets::{
        filter_input::{FilterAction, FilterInput},
        pane_chrome::{pane_chrome, Badge},
        scrollable_list::ScrollableList,
    },
};

/// Render queue tracks into display rows.
///
/// Each row is "{track} - {first artist}". A track without any artist has
/// nothing useful to show, so it is skipped rather than rendered half-empty.
pub fn queue_rows(queue: &[Track]) -> Vec<String> {
    queue
        .iter()
        .filter_map(|track| match track.artists.first() {
            Some(artist) => Some(format!("{} - {}", track.name, artist.name)),
            None => {
                debug!(track = %track.name, "skipping queue row without artist");
                None
            }
        })
        .collect()
}

pub struct QueuePanel {
    list: ScrollableList<String>,
    pub filter: FilterInput,
}

impl QueuePanel {
    pub fn new() -> Self {
        Self {
            list: ScrollableList::new(|row: &String, q: &str| {
                row.to_lowercase().contains(&q.to_lowercase())
            }),
            filter: FilterInput::new("/", "filter queue..."),
        }
    }

    pub fn set_rows(&mut self, rows: Vec<String>) {
        self.list.set_items(rows);
    }

    fn copy_selected(&self) -> Vec<Action> {
        match self.list.selected_item() {
            Some(row) => vec![Action::CopyToClipboard(row.clone())],
            None => vec![],
        }
    }
}

impl Component for QueuePanel {
    fn id(&self) -> ComponentId {
        ComponentId::QueuePanel
    }

    fn handle_key(&mut self, key: KeyEvent, _state: &AppState) -> Vec<Action> {
        if key.kind == KeyEventKind::Release {
            return vec![];
        }

        if self.filter.is_active() {
            return match self.filter.handle_key(key) {
                FilterAction::Changed(q) => {
                    self.list.set_filter(&q);
                    vec![]
                }
                FilterAction::Confirmed => vec![Action::CloseFilter],
                FilterAction::Cancelled => {
                    self.list.set_filter("");
                    vec![Action::CloseFilter]
                }
            };
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.list.select_up(1),
            KeyCode::Down | KeyCode::Char('j') => self.list.select_down(1),
            KeyCode::PageUp => self.list.select_up(10),
            KeyCode::PageDown => self.list.select_down(10),
            KeyCode::Home | KeyCode::Char('g') => self.list.select_first(),
            KeyCode::End | KeyCode::Char('G') => self.list.select_last(),
            KeyCode::Char('y') => return self.copy_selected(),
            KeyCode::Esc if !self.filter.is_empty() => return vec![Action::ClearFilter],
            _ => {}
        }
        vec![]
    }

    fn handle_mouse(&mut self, event: MouseEvent, area: Rect, _state: &AppState) -> Vec<Action> {
        match event.kind {
            MouseEventKind::ScrollUp => self.list.select_up(1),
            MouseEventKind::ScrollDown => self.list.select_down(1),
            MouseEventKind::Down(MouseButton::Left) => {
                // Row 0 of the inner area is one past the top border.
                let row = event.row.saturating_sub(area.y + 1) as usize;
                self.list.handle_click(row);
                return vec![Action::FocusPane(ComponentId::QueuePanel)];
            }
            _ => {}
        }
        vec![]
    }

    fn on_action(&mut self, action: &Action, _state: &AppState) -> Vec<Action> {
        match action {
            Action::OpenFilter => self.filter.activate(),
            Action::CloseFilter => self.filter.deactivate(),
            Action::ClearFilter => {
                self.filter.clear();
                self.filter.deactivate();
                self.list.set_filter("");
            }
            _ => {}
        }
        vec![]
    }

    fn draw(&mut self, frame: &mut Frame, area: Rect, focused: bool, state: &AppState) {
        let badge = if state.connected {
            Some(Badge { text: "LIVE", color: C_BADGE_LIVE })
        } else {
            Some(Badge { text: "OFFLINE", color: C_BADGE_ERR })
        };

        let title = if self.list.filter.is_empty() {
            format!("queue ({})", self.list.total_len())
        } else {
            format!("queue ({}/{})", self.list.len(), self.list.total_len())
        };

        let block = pane_chrome(&title, Some('1'), focused, badge);
        let mut inner = block.inner(area);
        frame.render_widget(block, area);

        // Filter bar takes the bottom row of the pane when open.
        let show_filter = self.filter.is_active() || !self.filter.is_empty();
        if show_filter && inner.height > 1 {
            let filter_area = Rect::new(inner.x, inner.y + inner.height - 1, inner.width, 1);
            inner.height -= 1;
            self.filter.draw(frame, filter_area);
        }

        let height = inner.height as usize;
        self.list.ensure_visible(height);

        if self.list.is_empty() {
            let msg = if self.list.total_len() == 0 {
                "  queue is empty"
            } else {
                "  no matches"
            };
            frame.render_widget(Paragraph::new(Span::styled(msg, style_muted())), inner);
            return;
        }

        let selected_row = self.list.selected_in_view(height);
        let width = inner.width as usize;
        let lines: Vec<Line> = self
            .list
            .visible_items(height)
            .into_iter()
            .enumerate()
            .map(|(view_idx, (orig_idx, row))| {
                let row_style = if focused && view_idx == selected_row {
                    style_selected_focused()
                } else {
                    Style::default().fg(C_SECONDARY)
                };
                Line::from(vec![
                    Span::styled(
                        format!(" {:>2} ", orig_idx + 1),
                        Style::default().fg(C_NUMBER_HINT),
                    ),
                    Span::styled(truncate_to_width(row, width.saturating_sub(5)), row_style),
                ])
            })
            .collect();

        frame.render_widget(Paragraph::new(lines), inner);
    }
}

fn truncate_to_width(s: &str, max: usize) -> String {
    if s.width() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    let mut used = 0;
    for ch in s.chars() {
        let w = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w + 1 > max {
            break;
        }
        used += w;
        out.push(ch);
    }
    out.push('…');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotbox_proto::api::Artist;

    fn track(name: &str, artists: &[&str]) -> Track {
        Track {
            name: name.to_string(),
            artists: artists
                .iter()
                .map(|a| Artist { name: a.to_string() })
                .collect(),
            album: None,
            duration_ms: None,
            uri: None,
        }
    }

    #[test]
    fn test_queue_rows_format() {
        let rows = queue_rows(&[
            track("Song A", &["Artist 1", "Artist 2"]),
            track("Song B", &["Artist 3"]),
        ]);
        assert_eq!(rows, vec!["Song A - Artist 1", "Song B - Artist 3"]);
    }

    #[test]
    fn test_queue_rows_drop_artistless_tracks() {
        let rows = queue_rows(&[
            track("Song A", &["Artist 1"]),
            track("Interlude", &[]),
            track("Song B", &["Artist 2"]),
        ]);
        assert_eq!(rows.len(), 2);
        assert!(!rows.iter().any(|r| r.contains("Interlude")));
    }

    #[test]
    fn test_queue_rows_empty_queue() {
        assert!(queue_rows(&[]).is_empty());
    }

    #[test]
    fn test_truncate_to_width() {
        assert_eq!(truncate_to_width("short", 10), "short");
        assert_eq!(truncate_to_width("a long row here", 7), "a long…");
    }
}
