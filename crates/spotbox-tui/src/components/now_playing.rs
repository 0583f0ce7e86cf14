//! Now-playing header — 2-row top bar.
//!
//! Row 1: playback icon, current track, artist, device.
//! Row 2: volume slider bar plus track position when the player reports one.
//!
//! Not focusable; draws to a 2-row area.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Clear, Paragraph},
    Frame,
};

use crate::{
    app_state::AppState,
    theme::{C_ACCENT, C_ARTIST, C_DEVICE, C_MUTED, C_PLAYING, C_SECONDARY},
};

pub struct NowPlaying;

impl NowPlaying {
    pub fn new() -> Self {
        Self
    }

    pub fn draw(&self, frame: &mut Frame, area: Rect, state: &AppState) {
        if area.height < 2 {
            frame.render_widget(Clear, area);
            frame.render_widget(Paragraph::new(build_row1(state)), area);
            return;
        }

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1)])
            .split(area);

        frame.render_widget(Clear, rows[0]);
        frame.render_widget(Paragraph::new(build_row1(state)), rows[0]);
        draw_row2(frame, rows[1], state);
    }
}

// ── Row 1: icon / track / artist / device ─────────────────────────────────────

fn build_row1(state: &AppState) -> Line<'static> {
    let status = &state.status;

    let (icon, icon_color) = if !state.connected {
        ("○", C_ACCENT)
    } else if status.is_playing {
        ("▶", C_PLAYING)
    } else {
        ("■", C_MUTED)
    };

    let track = status
        .current_track
        .as_ref()
        .or(state.currently_playing.as_ref());

    let Some(track) = track else {
        return Line::from(vec![
            Span::raw(" "),
            Span::styled(icon, Style::default().fg(icon_color)),
            Span::styled("  nothing playing", Style::default().fg(C_MUTED)),
        ]);
    };

    let mut spans: Vec<Span> = vec![
        Span::raw(" "),
        Span::styled(icon, Style::default().fg(icon_color)),
        Span::raw(" "),
        Span::styled(
            track.name.clone(),
            Style::default().fg(C_SECONDARY).add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(artist) = track.artists.first() {
        spans.push(Span::styled(
            format!("  {}", artist.name),
            Style::default().fg(C_ARTIST),
        ));
    }

    if let Some(device) = status.device_id.as_deref() {
        spans.push(Span::styled(
            format!("  ⌂ {}", device),
            Style::default().fg(C_DEVICE),
        ));
    }

    Line::from(spans)
}

// ── Row 2: volume bar | position ──────────────────────────────────────────────

fn draw_row2(frame: &mut Frame, area: Rect, state: &AppState) {
    if area.width < 10 {
        return;
    }

    let label = format!(" vol {:>3}%", state.volume_slider);
    let clock = clock_label(state);
    let bar_w = (area.width as usize)
        .saturating_sub(label.len() + clock.len() + 2)
        .min(40);
    let bar = smooth_bar(state.volume_slider as f64, 100.0, bar_w);

    let line = Line::from(vec![
        Span::raw(" "),
        Span::styled(bar, Style::default().fg(C_PLAYING)),
        Span::styled(label, Style::default().fg(C_MUTED)),
        Span::styled(clock, Style::default().fg(C_SECONDARY)),
    ]);
    frame.render_widget(Paragraph::new(line), area);
}

fn clock_label(state: &AppState) -> String {
    let status = &state.status;
    let Some(pos) = status.progress_ms else {
        return String::new();
    };
    let dur = status
        .current_track
        .as_ref()
        .and_then(|t| t.duration_ms);
    match dur {
        Some(dur) if dur > 0 => format!("  {}/{}", fmt_clock(pos), fmt_clock(dur)),
        _ => format!("  {}", fmt_clock(pos)),
    }
}

/// Build a smooth sub-block progress bar string of `width` cells.
fn smooth_bar(pos: f64, dur: f64, width: usize) -> String {
    const BLOCKS: [char; 9] = [' ', '▏', '▎', '▍', '▌', '▋', '▊', '▉', '█'];
    if width == 0 {
        return String::new();
    }
    let progress = if dur > 0.0 {
        (pos / dur).clamp(0.0, 1.0)
    } else {
        0.0
    };
    let eighths = (progress * width as f64 * 8.0) as usize;
    let full = eighths / 8;
    let partial = eighths % 8;
    let mut bar = String::with_capacity(width + 2);
    for _ in 0..full {
        bar.push('█');
    }
    if full < width {
        bar.push(BLOCKS[partial]);
        for _ in (full + 1)..width {
            bar.push('·');
        }
    }
    bar
}

fn fmt_clock(ms: u64) -> String {
    let total = ms / 1000;
    let h = total / 3600;
    let m = (total % 3600) / 60;
    let s = total % 60;
    if h > 0 {
        format!("{:02}:{:02}:{:02}", h, m, s)
    } else {
        format!("{:02}:{:02}", m, s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_smooth_bar_bounds() {
        assert_eq!(smooth_bar(0.0, 100.0, 4), " ···");
        assert_eq!(smooth_bar(100.0, 100.0, 4), "████");
        assert_eq!(smooth_bar(50.0, 0.0, 4), " ···");
    }

    #[test]
    fn test_fmt_clock() {
        assert_eq!(fmt_clock(0), "00:00");
        assert_eq!(fmt_clock(215_000), "03:35");
        assert_eq!(fmt_clock(3_725_000), "01:02:05");
    }
}
