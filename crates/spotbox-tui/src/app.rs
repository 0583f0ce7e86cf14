//! App — component-based event loop.
//!
//! Architecture:
//! - `App` owns all components and `AppState` (shared read-only data for components).
//! - A `tokio::mpsc` channel carries `AppMessage` events in from background tasks.
//! - The event loop draws each frame, then awaits the next message.
//! - Components return `Vec<Action>`; App dispatches each Action.
//! - Commands to the appliance go out as detached HTTP posts whose results are
//!   discarded; the next status poll reflects whatever actually happened.

use std::io;
use std::time::Duration;

use ratatui::crossterm::{
    event::{
        self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, MouseEvent,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    Terminal,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use spotbox_proto::api::{QueueResponse, StatusResponse, VolumeValue};
use spotbox_proto::client::ApiClient;

use crate::{
    action::{Action, ComponentId},
    app_state::AppState,
    component::Component,
    components::{
        help_overlay::HelpOverlay,
        log_panel::LogPanel,
        now_playing::NowPlaying,
        queue_panel::{queue_rows, QueuePanel},
    },
    focus::FocusRing,
    poller::StatusPoller,
    widgets::{
        filter_input::{FilterAction, FilterInput},
        status_bar::{self, InputMode},
    },
};

// ── Internal event bus ────────────────────────────────────────────────────────

pub(crate) enum AppMessage {
    Event(Event),
    StatusUpdated(StatusResponse),
    QueueUpdated(QueueResponse),
    Log(String),
}

/// Volume keys move the local slider by this many points per press.
const VOLUME_STEP: i8 = 5;

// ── Pane area tracking ────────────────────────────────────────────────────────

/// Stores the last-drawn layout rects for each focusable pane.
/// Used by `handle_mouse` to do hit-testing without recomputing the layout.
#[derive(Default, Clone)]
struct PaneAreas {
    queue_panel: Rect,
    log_panel: Rect,
}

// ── App ───────────────────────────────────────────────────────────────────────

pub struct App {
    // ── Shared state (passed read-only to components) ─────────────────────────
    pub state: AppState,

    // ── Components ────────────────────────────────────────────────────────────
    now_playing: NowPlaying,
    queue_panel: QueuePanel,
    log_panel: LogPanel,
    help_overlay: HelpOverlay,

    // ── Session bookkeeping ───────────────────────────────────────────────────
    client: ApiClient,
    poll_interval: Duration,
    focus: FocusRing,
    /// Add-URI prompt line, opened with `a`.
    prompt: FilterInput,
    show_keys_bar: bool,

    /// Sender handed to background tasks spawned by dispatch.
    msg_tx: Option<mpsc::Sender<AppMessage>>,

    /// Whether to quit on next iteration.
    should_quit: bool,

    /// Last-drawn layout rects — used for mouse hit-testing.
    pane_areas: PaneAreas,
}

impl App {
    pub fn new(client: ApiClient, poll_interval: Duration) -> Self {
        Self {
            state: AppState::new(),
            now_playing: NowPlaying::new(),
            queue_panel: QueuePanel::new(),
            log_panel: LogPanel::new(),
            help_overlay: HelpOverlay::new(),
            client,
            poll_interval,
            focus: FocusRing::new(vec![ComponentId::QueuePanel]),
            prompt: FilterInput::new(">", "spotify:track:..."),
            show_keys_bar: true,
            msg_tx: None,
            should_quit: false,
            pane_areas: PaneAreas::default(),
        }
    }

    pub async fn run(mut self) -> anyhow::Result<()> {
        debug!("run(): enabling raw mode");
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        debug!("run(): terminal created, size={:?}", terminal.size());

        let (tx, mut rx) = mpsc::channel::<AppMessage>(1024);
        self.msg_tx = Some(tx.clone());

        self.push_log(format!("spotbox tui → {}", self.client.base_url()));

        // ── Background task: keyboard/mouse events ────────────────────────────
        let event_tx = tx.clone();
        tokio::task::spawn_blocking(move || loop {
            match event::read() {
                Ok(ev) => {
                    if event_tx.blocking_send(AppMessage::Event(ev)).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            }
        });

        // ── Background task: status poll (once a second) ──────────────────────
        let poller = StatusPoller::start(self.client.clone(), self.poll_interval, tx.clone());

        // One queue fetch at startup; afterwards `r` refreshes on demand.
        self.dispatch(Action::RefreshQueue).await;

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

            let Some(msg) = rx.recv().await else { break };

            const MAX_DRAIN: usize = 256;
            let mut redraw = self.handle_message(msg).await;
            let mut drained = 0usize;
            while drained < MAX_DRAIN {
                let next = match rx.try_recv() {
                    Ok(v) => v,
                    Err(_) => break,
                };
                drained += 1;
                redraw |= self.handle_message(next).await;
            }
            needs_redraw = redraw;
        }

        // ── Teardown ──────────────────────────────────────────────────────────
        poller.stop();
        disable_raw_mode()?;
        execute!(
            terminal.backend_mut(),
            LeaveAlternateScreen,
            DisableMouseCapture
        )?;
        terminal.show_cursor()?;

        Ok(())
    }

    // ── Message handler ───────────────────────────────────────────────────────

    /// Returns `true` if the message requires a redraw.
    async fn handle_message(&mut self, msg: AppMessage) -> bool {
        match msg {
            AppMessage::Event(ev) => match ev {
                Event::Key(key) => {
                    if key.kind == KeyEventKind::Release {
                        return false;
                    }
                    let actions = self.handle_key(key);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Mouse(mouse) => {
                    let actions = self.handle_mouse(mouse);
                    for a in actions {
                        self.dispatch(a).await;
                    }
                }
                Event::Resize(w, h) => {
                    self.dispatch(Action::Resize(w, h)).await;
                }
                _ => {}
            },

            AppMessage::StatusUpdated(status) => {
                if !self.state.connected {
                    self.state.connected = true;
                    self.push_log("connected".to_string());
                }
                // The appliance is authoritative: every poll refreshes the
                // slider, so volume changed elsewhere shows up here too.
                self.state.volume_slider = status.volume;
                self.state.status = status;
            }

            AppMessage::QueueUpdated(queue) => {
                let rows = queue_rows(&queue.queue);
                info!("queue refreshed: {} rows", rows.len());
                self.state.currently_playing = queue.currently_playing;
                self.state.queue_rows = rows.clone();
                self.queue_panel.set_rows(rows);
            }

            AppMessage::Log(msg) => {
                self.push_log(msg);
            }
        }
        true
    }

    // ── Key routing ───────────────────────────────────────────────────────────

    fn handle_key(&mut self, key: KeyEvent) -> Vec<Action> {
        // Ctrl-C quits from any mode.
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return vec![Action::Quit];
        }

        // Help overlay consumes everything while open.
        if self.help_overlay.visible {
            return self.help_overlay.handle_key(key, &self.state);
        }

        // Add-URI prompt.
        if self.prompt.is_active() {
            return match self.prompt.handle_key(key) {
                FilterAction::Changed(_) => vec![],
                FilterAction::Confirmed => {
                    let uri = self.prompt.text().trim().to_string();
                    self.prompt.clear();
                    if uri.is_empty() {
                        vec![Action::ClosePrompt]
                    } else {
                        vec![Action::QueueAdd(uri), Action::ClosePrompt]
                    }
                }
                FilterAction::Cancelled => {
                    self.prompt.clear();
                    vec![Action::ClosePrompt]
                }
            };
        }

        // Queue filter gets raw keys while typing.
        if self.queue_panel.filter.is_active() {
            return self.queue_panel.handle_key(key, &self.state);
        }

        match key.code {
            KeyCode::Char('q') => return vec![Action::Quit],
            KeyCode::Char('?') => return vec![Action::ToggleHelp],
            KeyCode::Char('L') => return vec![Action::ToggleLogs],
            KeyCode::Char('K') => return vec![Action::ToggleKeys],
            KeyCode::Char('r') => return vec![Action::RefreshQueue],
            KeyCode::Char('R') => return vec![Action::Reclaim],
            KeyCode::Char('+') | KeyCode::Char('=') => {
                return vec![Action::VolumeStep(VOLUME_STEP)]
            }
            KeyCode::Char('-') => return vec![Action::VolumeStep(-VOLUME_STEP)],
            KeyCode::Char('a') => return vec![Action::OpenPrompt],
            KeyCode::Char('/') => {
                return vec![
                    Action::FocusPane(ComponentId::QueuePanel),
                    Action::OpenFilter,
                ]
            }
            KeyCode::Tab => return vec![Action::FocusNext],
            KeyCode::BackTab => return vec![Action::FocusPrev],
            KeyCode::Char('1') => return vec![Action::FocusPane(ComponentId::QueuePanel)],
            KeyCode::Char('2') if self.log_panel.expanded => {
                return vec![Action::FocusPane(ComponentId::LogPanel)]
            }
            _ => {}
        }

        // Everything else goes to the focused component.
        match self.focus.current() {
            Some(ComponentId::QueuePanel) => self.queue_panel.handle_key(key, &self.state),
            Some(ComponentId::LogPanel) => self.log_panel.handle_key(key, &self.state),
            _ => vec![],
        }
    }

    fn handle_mouse(&mut self, mouse: MouseEvent) -> Vec<Action> {
        let pos = ratatui::layout::Position::new(mouse.column, mouse.row);
        if self.pane_areas.queue_panel.contains(pos) {
            return self
                .queue_panel
                .handle_mouse(mouse, self.pane_areas.queue_panel, &self.state);
        }
        if self.log_panel.expanded && self.pane_areas.log_panel.contains(pos) {
            return self
                .log_panel
                .handle_mouse(mouse, self.pane_areas.log_panel, &self.state);
        }
        vec![]
    }

    // ── Action dispatch ───────────────────────────────────────────────────────

    async fn dispatch(&mut self, action: Action) {
        match action {
            Action::VolumeStep(delta) => {
                let next = (self.state.volume_slider as i16 + delta as i16).clamp(0, 100) as u8;
                // Move the slider immediately; the next poll confirms it.
                self.state.volume_slider = next;
                self.push_log(format!("volume → {}%", next));
                // Fire-and-forget: the next status poll reflects the outcome.
                let client = self.client.clone();
                tokio::spawn(async move {
                    if let Err(e) = client.set_volume(VolumeValue::new(next)).await {
                        debug!("volume post failed: {:#}", e);
                    }
                });
            }

            Action::Reclaim => {
                self.push_log("reclaim requested".to_string());
                let client = self.client.clone();
                tokio::spawn(async move {
                    if let Err(e) = client.reclaim_playback().await {
                        debug!("reclaim post failed: {:#}", e);
                    }
                });
            }

            Action::RefreshQueue => {
                let Some(tx) = self.msg_tx.clone() else { return };
                let client = self.client.clone();
                tokio::spawn(async move {
                    match client.get_queue().await {
                        Ok(queue) => {
                            let _ = tx.send(AppMessage::QueueUpdated(queue)).await;
                        }
                        Err(e) => debug!("queue fetch failed: {:#}", e),
                    }
                });
            }

            Action::QueueAdd(uri) => {
                self.push_log(format!("queueing {}", uri));
                let client = self.client.clone();
                let tx = self.msg_tx.clone();
                tokio::spawn(async move {
                    match client.queue_add(&uri).await {
                        Ok(ack) if !ack.success => {
                            // The ack carries a reason; surface it.
                            let reason = ack.error.unwrap_or_else(|| "rejected".to_string());
                            if let Some(tx) = tx {
                                let _ = tx
                                    .send(AppMessage::Log(format!("queue add failed: {}", reason)))
                                    .await;
                            }
                        }
                        Ok(_) => {
                            // Refresh so the new item shows up without waiting for `r`.
                            if let (Some(tx), Ok(queue)) = (tx, client.get_queue().await) {
                                let _ = tx.send(AppMessage::QueueUpdated(queue)).await;
                            }
                        }
                        Err(e) => debug!("queue add failed: {:#}", e),
                    }
                });
            }

            Action::FocusNext => {
                self.focus.next();
            }
            Action::FocusPrev => {
                self.focus.prev();
            }
            Action::FocusPane(id) => {
                self.focus.set(id);
            }

            Action::OpenFilter => {
                self.queue_panel.on_action(&Action::OpenFilter, &self.state);
            }
            Action::CloseFilter => {
                self.queue_panel.on_action(&Action::CloseFilter, &self.state);
            }
            Action::ClearFilter => {
                self.queue_panel.on_action(&Action::ClearFilter, &self.state);
            }

            Action::OpenPrompt => {
                self.prompt.activate();
            }
            Action::ClosePrompt => {
                self.prompt.deactivate();
            }

            Action::ToggleLogs => {
                self.log_panel.on_action(&Action::ToggleLogs, &self.state);
                let items = if self.log_panel.expanded {
                    vec![ComponentId::QueuePanel, ComponentId::LogPanel]
                } else {
                    vec![ComponentId::QueuePanel]
                };
                self.focus.set_items(items);
            }
            Action::ToggleHelp => {
                self.help_overlay.on_action(&Action::ToggleHelp, &self.state);
            }
            Action::ToggleKeys => {
                self.show_keys_bar = !self.show_keys_bar;
            }

            Action::CopyToClipboard(text) => match arboard::Clipboard::new() {
                Ok(mut clipboard) => match clipboard.set_text(text) {
                    Ok(()) => self.push_log("copied to clipboard".to_string()),
                    Err(e) => self.push_log(format!("clipboard error: {}", e)),
                },
                Err(e) => self.push_log(format!("clipboard unavailable: {}", e)),
            },

            Action::Quit => {
                self.should_quit = true;
            }
            Action::Resize(_, _) | Action::Noop => {}
        }
        self.sync_input_mode();
    }

    fn sync_input_mode(&mut self) {
        self.state.input_mode = if self.prompt.is_active() {
            InputMode::Prompt
        } else if self.queue_panel.filter.is_active() {
            InputMode::Filter
        } else {
            InputMode::Normal
        };
    }

    // ── Rendering ─────────────────────────────────────────────────────────────

    fn draw(&mut self, frame: &mut ratatui::Frame) {
        let area = frame.area();

        let log_height = if self.log_panel.expanded {
            (area.height / 3).clamp(4, 10)
        } else {
            0
        };
        let prompt_height = u16::from(self.prompt.is_active());

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(2), // now-playing header
                Constraint::Length(1), // separator
                Constraint::Min(3),    // queue
                Constraint::Length(log_height),
                Constraint::Length(prompt_height),
                Constraint::Length(1), // keys bar / log bar
            ])
            .split(area);

        self.now_playing.draw(frame, rows[0], &self.state);
        status_bar::draw_separator(frame, rows[1]);

        let focused = self.focus.current();
        self.queue_panel.draw(
            frame,
            rows[2],
            focused == Some(ComponentId::QueuePanel),
            &self.state,
        );
        self.pane_areas.queue_panel = rows[2];

        if self.log_panel.expanded {
            self.log_panel.draw(
                frame,
                rows[3],
                focused == Some(ComponentId::LogPanel),
                &self.state,
            );
        }
        self.pane_areas.log_panel = rows[3];

        if self.prompt.is_active() {
            self.prompt.draw(frame, rows[4]);
        }

        if self.show_keys_bar {
            status_bar::draw_keys_bar(frame, rows[5], self.state.input_mode);
        } else {
            status_bar::draw_log_bar(
                frame,
                rows[5],
                self.state.logs.last().map(String::as_str),
                self.state.connected,
            );
        }

        self.help_overlay.draw(frame, area, false, &self.state);
    }

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn push_log(&mut self, msg: String) {
        let stamped = format!("{} {}", chrono::Local::now().format("%H:%M:%S"), msg);
        self.state.logs.push(stamped);
        if self.state.logs.len() > 500 {
            self.state.logs.remove(0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn app() -> App {
        App::new(ApiClient::new("http://127.0.0.1:1"), Duration::from_secs(1))
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[tokio::test]
    async fn test_volume_display_tracks_every_poll() {
        let mut a = app();
        let _ = a
            .handle_message(AppMessage::StatusUpdated(StatusResponse {
                volume: 35,
                ..Default::default()
            }))
            .await;
        assert_eq!(a.state.volume_slider, 35);
        assert!(a.state.connected);

        // Volume changed on the appliance side shows up on the next poll.
        let _ = a
            .handle_message(AppMessage::StatusUpdated(StatusResponse {
                volume: 80,
                ..Default::default()
            }))
            .await;
        assert_eq!(a.state.volume_slider, 80);
    }

    #[tokio::test]
    async fn test_volume_step_clamps() {
        let mut a = app();
        a.state.volume_slider = 98;
        a.dispatch(Action::VolumeStep(VOLUME_STEP)).await;
        assert_eq!(a.state.volume_slider, 100);
        a.state.volume_slider = 3;
        a.dispatch(Action::VolumeStep(-VOLUME_STEP)).await;
        assert_eq!(a.state.volume_slider, 0);
    }

    #[tokio::test]
    async fn test_queue_update_drops_artistless_rows() {
        use spotbox_proto::api::{Artist, Track};
        let mut a = app();
        let _ = a
            .handle_message(AppMessage::QueueUpdated(QueueResponse {
                currently_playing: None,
                queue: vec![
                    Track {
                        name: "Song A".into(),
                        artists: vec![Artist { name: "Artist 1".into() }],
                        album: None,
                        duration_ms: None,
                        uri: None,
                    },
                    Track {
                        name: "Interlude".into(),
                        artists: vec![],
                        album: None,
                        duration_ms: None,
                        uri: None,
                    },
                ],
            }))
            .await;
        assert_eq!(a.state.queue_rows, vec!["Song A - Artist 1".to_string()]);
    }

    #[tokio::test]
    async fn test_key_routing_in_normal_mode() {
        let mut a = app();
        assert!(matches!(a.handle_key(key(KeyCode::Char('q')))[0], Action::Quit));
        assert!(matches!(
            a.handle_key(key(KeyCode::Char('R')))[0],
            Action::Reclaim
        ));
        assert!(matches!(
            a.handle_key(key(KeyCode::Char('+')))[0],
            Action::VolumeStep(5)
        ));
        assert!(matches!(
            a.handle_key(key(KeyCode::Char('-')))[0],
            Action::VolumeStep(-5)
        ));
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        assert!(matches!(a.handle_key(ctrl_c)[0], Action::Quit));
    }

    #[tokio::test]
    async fn test_prompt_confirm_emits_queue_add() {
        let mut a = app();
        a.dispatch(Action::OpenPrompt).await;
        assert_eq!(a.state.input_mode, InputMode::Prompt);
        for ch in "spotify:track:x".chars() {
            let _ = a.handle_key(key(KeyCode::Char(ch)));
        }
        let actions = a.handle_key(key(KeyCode::Enter));
        assert!(matches!(&actions[0], Action::QueueAdd(uri) if uri == "spotify:track:x"));
        assert!(matches!(actions[1], Action::ClosePrompt));
    }
}
