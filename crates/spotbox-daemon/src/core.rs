//! Daemon core: owns the appliance state and the Spotify session, and is the
//! only place that mutates either. Everything else (HTTP handlers, tickers)
//! funnels events into the core through one mpsc channel.

use crate::audio::AudioService;
use crate::spotify::{SpotifyClient, SpotifyError};
use spotbox_proto::api::VolumeValue;
use spotbox_proto::config::Config;
use spotbox_proto::state::StateManager;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

/// How often the playback session is checked and, if needed, restarted.
const ENSURE_INTERVAL: Duration = Duration::from_secs(1);
/// How long to sit out after a Spotify API error before checking again.
const ERROR_BACKOFF: Duration = Duration::from_secs(5);

/// Commands arriving from HTTP clients.
#[derive(Debug)]
pub enum ClientCommand {
    SetVolume(VolumeValue),
    Reclaim,
    QueueAdd(String),
    CredentialsUpdated,
}

#[derive(Debug)]
pub enum DaemonEvent {
    ClientCommand(ClientCommand),
    EnsureTick,
    DeviceCheckTick,
    Shutdown,
}

pub struct DaemonCore {
    config: Config,
    state_manager: Arc<StateManager>,
    spotify: Arc<SpotifyClient>,
    audio: Arc<AudioService>,
    event_tx: mpsc::Sender<DaemonEvent>,
    backoff_until: Option<Instant>,
}

impl DaemonCore {
    pub fn new(config: Config, event_tx: mpsc::Sender<DaemonEvent>) -> anyhow::Result<Self> {
        let state_manager = Arc::new(StateManager::new(
            config.daemon.state_file.clone(),
            config.audio.default_volume,
        ));
        let audio = Arc::new(AudioService::new(config.audio.mixer_control.clone())?);
        let spotify = Arc::new(SpotifyClient::new(config.spotify.clone()));
        Ok(Self {
            config,
            state_manager,
            spotify,
            audio,
            event_tx,
            backoff_until: None,
        })
    }

    pub fn state_manager(&self) -> Arc<StateManager> {
        self.state_manager.clone()
    }

    pub fn audio_service(&self) -> Arc<AudioService> {
        self.audio.clone()
    }

    /// Runs the event loop until the channel closes or a Shutdown arrives.
    pub async fn run(mut self, mut event_rx: mpsc::Receiver<DaemonEvent>) -> anyhow::Result<()> {
        if self.config.audio.force_mono {
            if let Err(e) = self.audio.setup_mono_output().await {
                warn!("Mono output setup failed: {}", e);
            }
        }
        let boot_volume = self.state_manager.get_state().await.volume;
        if let Err(e) = self.audio.set_volume(boot_volume).await {
            warn!("Could not apply startup volume: {}", e);
        }

        self.initialize_spotify().await;

        let _ensure_ticker = spawn_ensure_ticker(self.event_tx.clone());
        let _device_ticker = spawn_device_ticker(
            self.event_tx.clone(),
            Duration::from_secs(self.config.playback.reclaim_delay_secs.max(1)),
        );

        loop {
            match event_rx.recv().await {
                Some(DaemonEvent::ClientCommand(command)) => {
                    if let Err(e) = self.handle_command(command).await {
                        error!("Command failed: {}", e);
                    }
                }
                Some(DaemonEvent::EnsureTick) => self.handle_ensure_tick().await,
                Some(DaemonEvent::DeviceCheckTick) => self.handle_device_check_tick().await,
                Some(DaemonEvent::Shutdown) | None => break,
            }
        }

        info!("Daemon core stopped");
        Ok(())
    }

    /// Looks up the Connect device this appliance plays through and caches
    /// its id. Called at startup and again whenever credentials change.
    async fn initialize_spotify(&self) {
        if !self.spotify.is_configured() {
            warn!("Spotify Web API credentials not configured; playback control is disabled");
            return;
        }
        let device_name = &self.config.playback.device_name;
        match self.spotify.find_device_id(device_name).await {
            Ok(Some(id)) => {
                info!("Appliance device {:?} registered as {}", device_name, id);
                self.state_manager.set_device_id(Some(id)).await;
            }
            Ok(None) => {
                warn!(
                    "No Spotify Connect device named {:?}; is the playback engine running?",
                    device_name
                );
            }
            Err(e) => error!("Device lookup failed: {}", e),
        }
    }

    async fn handle_command(&mut self, command: ClientCommand) -> anyhow::Result<()> {
        match command {
            ClientCommand::SetVolume(volume) => {
                let percent = volume.percent();
                info!("Setting volume to {}%", percent);
                self.audio.set_volume(percent).await?;
                self.state_manager.set_volume(percent).await?;
            }
            ClientCommand::Reclaim => {
                info!("Reclaiming playback");
                self.reclaim_playback().await?;
            }
            ClientCommand::QueueAdd(uri) => {
                info!("Queueing {}", uri);
                let device_id = self.state_manager.get_state().await.device_id;
                self.spotify.add_to_queue(&uri, device_id.as_deref()).await?;
            }
            ClientCommand::CredentialsUpdated => {
                info!("Device credentials updated");
                self.initialize_spotify().await;
            }
        }
        Ok(())
    }

    async fn reclaim_playback(&self) -> anyhow::Result<()> {
        match self.state_manager.get_state().await.device_id {
            Some(id) => {
                self.spotify.transfer_playback(&id, true).await?;
                Ok(())
            }
            None => {
                warn!("Reclaim requested but the appliance device is not registered");
                Ok(())
            }
        }
    }

    async fn handle_ensure_tick(&mut self) {
        if in_backoff(self.backoff_until, Instant::now()) {
            return;
        }
        self.backoff_until = None;
        if !self.spotify.is_configured() {
            return;
        }
        match self.refresh_playback().await {
            Ok(()) => self.state_manager.set_spotify_ok(true).await,
            Err(e) => {
                warn!("Playback check failed: {}", e);
                self.state_manager.set_spotify_ok(false).await;
                self.backoff_until = Some(Instant::now() + ERROR_BACKOFF);
            }
        }
    }

    /// One ensure pass: mirror the live player state into the snapshot and
    /// restart playback when the session has gone quiet.
    async fn refresh_playback(&self) -> Result<(), SpotifyError> {
        match self.spotify.current_playback().await? {
            Some(playback) => {
                let restart = !playback.is_playing;
                self.state_manager
                    .set_playback(
                        playback.is_playing,
                        playback.track,
                        playback.progress_ms,
                        playback.device_id,
                    )
                    .await;
                if restart {
                    self.ensure_playing().await?;
                }
            }
            None => {
                self.state_manager.set_playback(false, None, None, None).await;
                self.ensure_playing().await?;
            }
        }
        Ok(())
    }

    /// Pushes the session back onto the appliance device. An empty context
    /// resumes whatever the session last played.
    async fn ensure_playing(&self) -> Result<(), SpotifyError> {
        let Some(device_id) = self.state_manager.get_state().await.device_id else {
            return Ok(());
        };
        let context = playback_context(&self.config.playback.default_playlist_uri);
        info!("Playback stopped; restarting on appliance device");
        self.spotify.start_playback(&device_id, context).await
    }

    /// Refreshes the queue snapshot and pulls playback back onto the
    /// appliance when another device has grabbed the session.
    async fn handle_device_check_tick(&mut self) {
        if !self.spotify.is_configured() {
            return;
        }
        match self.spotify.queue().await {
            Ok((currently_playing, queue)) => {
                self.state_manager.set_queue(currently_playing, queue).await;
            }
            Err(e) => debug!("Queue refresh failed: {}", e),
        }
        if !self.config.playback.auto_reclaim {
            return;
        }
        let state = self.state_manager.get_state().await;
        if !should_reclaim(state.device_id.as_deref(), state.active_device_id.as_deref()) {
            return;
        }
        let Some(ours) = state.device_id else { return };
        info!("Playback moved to another device; reclaiming");
        if let Err(e) = self.spotify.transfer_playback(&ours, true).await {
            error!("Reclaim failed: {}", e);
        }
    }
}

/// Reclaim only when another device holds the session. A missing id on
/// either side means there is nothing to compare yet.
fn should_reclaim(ours: Option<&str>, active: Option<&str>) -> bool {
    matches!((ours, active), (Some(ours), Some(active)) if active != ours)
}

/// True while an error backoff window is still running.
fn in_backoff(backoff_until: Option<Instant>, now: Instant) -> bool {
    backoff_until.is_some_and(|until| now < until)
}

fn playback_context(configured: &str) -> Option<&str> {
    if configured.is_empty() {
        None
    } else {
        Some(configured)
    }
}

fn spawn_ensure_ticker(event_tx: mpsc::Sender<DaemonEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(ENSURE_INTERVAL).await;
            if event_tx.send(DaemonEvent::EnsureTick).await.is_err() {
                break;
            }
        }
    })
}

fn spawn_device_ticker(event_tx: mpsc::Sender<DaemonEvent>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(interval).await;
            if event_tx.send(DaemonEvent::DeviceCheckTick).await.is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reclaim_only_on_device_mismatch() {
        assert!(should_reclaim(Some("box"), Some("phone")));
        assert!(!should_reclaim(Some("box"), Some("box")));
        assert!(!should_reclaim(None, Some("phone")));
        assert!(!should_reclaim(Some("box"), None));
        assert!(!should_reclaim(None, None));
    }

    #[test]
    fn test_error_backoff_window() {
        let now = Instant::now();
        assert!(!in_backoff(None, now));
        assert!(in_backoff(Some(now + ERROR_BACKOFF), now));
        // The window closes at the deadline, not after it.
        assert!(!in_backoff(Some(now), now));
        assert!(!in_backoff(Some(now), now + ERROR_BACKOFF));
    }

    #[test]
    fn test_playback_context_empty_means_resume() {
        assert_eq!(playback_context(""), None);
        assert_eq!(
            playback_context("spotify:playlist:abc"),
            Some("spotify:playlist:abc")
        );
    }
}
