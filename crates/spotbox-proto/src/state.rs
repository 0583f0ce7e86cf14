use crate::api::Track;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The slice of state that survives restarts: device-login credentials from
/// `/api/setup` plus the last applied mixer volume.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistentState {
    pub spotify_username: Option<String>,
    pub spotify_password: Option<String>,
    pub volume: u8,
}

/// Full in-memory state of the appliance.  `rev` is a monotonically
/// increasing counter incremented on every change; clients comparing
/// snapshots can use it to detect staleness.
#[derive(Debug, Clone, Default)]
pub struct ApplianceState {
    pub rev: u64,
    pub is_playing: bool,
    pub current_track: Option<Track>,
    pub progress_ms: Option<u64>,
    pub volume: u8,
    /// Spotify Connect id of this appliance, once discovered.
    pub device_id: Option<String>,
    /// Id of the device playback is actually running on (may differ from
    /// ours until the monitor reclaims it).
    pub active_device_id: Option<String>,
    pub currently_playing: Option<Track>,
    pub queue: Vec<Track>,
    /// True while the playback refresh loop is succeeding.
    pub spotify_ok: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

impl ApplianceState {
    pub fn has_credentials(&self) -> bool {
        self.username.is_some() && self.password.is_some()
    }
}

pub struct StateManager {
    state: Arc<RwLock<ApplianceState>>,
    state_file: PathBuf,
}

impl StateManager {
    pub fn new(state_file: PathBuf, default_volume: u8) -> Self {
        let persisted = Self::load_persistent(&state_file);

        let state = ApplianceState {
            rev: 1,
            volume: persisted
                .as_ref()
                .map(|p| p.volume)
                .unwrap_or(default_volume),
            username: persisted.as_ref().and_then(|p| p.spotify_username.clone()),
            password: persisted.and_then(|p| p.spotify_password),
            ..ApplianceState::default()
        };

        Self {
            state: Arc::new(RwLock::new(state)),
            state_file,
        }
    }

    pub async fn get_state(&self) -> ApplianceState {
        self.state.read().await.clone()
    }

    /// Refresh the playback snapshot from the upstream player.
    pub async fn set_playback(
        &self,
        is_playing: bool,
        current_track: Option<Track>,
        progress_ms: Option<u64>,
        active_device_id: Option<String>,
    ) {
        let mut state = self.state.write().await;
        state.is_playing = is_playing;
        state.current_track = current_track;
        state.progress_ms = progress_ms;
        state.active_device_id = active_device_id;
        state.rev += 1;
    }

    pub async fn set_device_id(&self, device_id: Option<String>) {
        let mut state = self.state.write().await;
        state.device_id = device_id;
        state.rev += 1;
    }

    pub async fn set_queue(&self, currently_playing: Option<Track>, queue: Vec<Track>) {
        let mut state = self.state.write().await;
        state.currently_playing = currently_playing;
        state.queue = queue;
        state.rev += 1;
    }

    pub async fn set_spotify_ok(&self, ok: bool) {
        let mut state = self.state.write().await;
        if state.spotify_ok != ok {
            state.spotify_ok = ok;
            state.rev += 1;
        }
    }

    pub async fn set_volume(&self, volume: u8) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.volume = volume.min(100);
            state.rev += 1;
        }
        self.save().await
    }

    pub async fn set_credentials(&self, username: String, password: String) -> anyhow::Result<()> {
        {
            let mut state = self.state.write().await;
            state.username = Some(username);
            state.password = Some(password);
            state.rev += 1;
        }
        self.save().await
    }

    async fn save(&self) -> anyhow::Result<()> {
        let state = self.state.read().await;
        let persistent = PersistentState {
            spotify_username: state.username.clone(),
            spotify_password: state.password.clone(),
            volume: state.volume,
        };

        if let Some(parent) = self.state_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(&persistent)?;
        tokio::fs::write(&self.state_file, json).await?;
        Ok(())
    }

    fn load_persistent(state_file: &PathBuf) -> Option<PersistentState> {
        let content = std::fs::read_to_string(state_file).ok()?;
        serde_json::from_str::<PersistentState>(&content).ok()
    }
}
