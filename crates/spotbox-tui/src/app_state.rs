//! AppState — shared read-only data passed to all components during render/event.
//!
//! Components read this for appliance state, but never mutate it.
//! The App event-loop is the only thing that writes to AppState.

use spotbox_proto::api::{StatusResponse, Track};

use crate::widgets::status_bar::InputMode;

/// The full shared state of the application.
/// Components read this; only the App event-loop writes to it.
pub struct AppState {
    /// Last status snapshot received from the appliance.  Replaced wholesale
    /// on every poll response; whichever response arrives last wins.
    pub status: StatusResponse,
    /// True once at least one poll has answered.
    pub connected: bool,

    /// What the appliance reports as on-air right now (queue endpoint).
    pub currently_playing: Option<Track>,
    /// Rendered queue rows, one per track with at least one artist.
    pub queue_rows: Vec<String>,

    /// Volume slider position, 0..=100.  Refreshed from every status
    /// response; volume keys move it locally between polls.
    pub volume_slider: u8,

    /// In-session log lines shown in the log panel.
    pub logs: Vec<String>,

    pub input_mode: InputMode,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            status: StatusResponse::default(),
            connected: false,
            currently_playing: None,
            queue_rows: Vec::new(),
            volume_slider: 0,
            logs: Vec::new(),
            input_mode: InputMode::Normal,
        }
    }
}
