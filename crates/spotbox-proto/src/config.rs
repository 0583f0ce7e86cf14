use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::platform;

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub daemon: DaemonConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spotify: SpotifyConfig,
    #[serde(default)]
    pub client: ClientConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default = "default_state_file")]
    pub state_file: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_enabled")]
    pub enabled: bool,
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Spotify Connect device name this appliance registers under.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// Context to start when nothing is playing.  Empty = plain resume.
    #[serde(default)]
    pub default_playlist_uri: String,
    #[serde(default = "default_auto_reclaim")]
    pub auto_reclaim: bool,
    /// Device-monitor cadence: how often to check (and reclaim) playback.
    #[serde(default = "default_reclaim_delay_secs")]
    pub reclaim_delay_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AudioConfig {
    /// ALSA simple mixer control driven by /api/volume.
    #[serde(default = "default_mixer_control")]
    pub mixer_control: String,
    /// Volume applied at boot when no persisted level exists, 0..=100.
    #[serde(default = "default_volume")]
    pub default_volume: u8,
    /// Write an ~/.asoundrc downmixing both channels to mono at boot.
    #[serde(default = "default_force_mono")]
    pub force_mono: bool,
}

/// Spotify Web API credentials.  Operator-provisioned; the `/api/setup`
/// endpoint stores device-login credentials separately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotifyConfig {
    #[serde(default)]
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default)]
    pub refresh_token: String,
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Base URL the TUI talks to.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Status poll cadence in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            state_file: default_state_file(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            enabled: default_http_enabled(),
            bind_address: default_bind_address(),
            port: default_port(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            default_playlist_uri: String::new(),
            auto_reclaim: default_auto_reclaim(),
            reclaim_delay_secs: default_reclaim_delay_secs(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            mixer_control: default_mixer_control(),
            default_volume: default_volume(),
            force_mono: default_force_mono(),
        }
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            refresh_token: String::new(),
            redirect_uri: default_redirect_uri(),
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_state_file() -> PathBuf {
    platform::data_dir().join("state.json")
}

fn default_http_enabled() -> bool {
    true
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_device_name() -> String {
    "Spotbox".to_string()
}

fn default_auto_reclaim() -> bool {
    true
}

fn default_reclaim_delay_secs() -> u64 {
    5
}

fn default_mixer_control() -> String {
    "PCM".to_string()
}

fn default_volume() -> u8 {
    70
}

fn default_force_mono() -> bool {
    true
}

fn default_redirect_uri() -> String {
    "http://localhost:5000/callback".to_string()
}

fn default_server_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let content = std::fs::read_to_string(&config_path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, content)?;
        Ok(())
    }

    pub fn config_path() -> PathBuf {
        platform::config_dir().join("config.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.http.enabled);
        assert_eq!(config.http.port, 5000);
        assert_eq!(config.http.bind_address, "0.0.0.0");
        assert_eq!(config.playback.device_name, "Spotbox");
        assert!(config.playback.auto_reclaim);
        assert_eq!(config.playback.reclaim_delay_secs, 5);
        assert_eq!(config.audio.mixer_control, "PCM");
        assert_eq!(config.audio.default_volume, 70);
        assert!(config.audio.force_mono);
        assert_eq!(config.client.poll_interval_ms, 1000);
        assert!(config.client.server_url.starts_with("http://"));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: Config = toml::from_str(
            r#"
            [http]
            port = 8080

            [spotify]
            client_id = "abc"
            client_secret = "def"
            refresh_token = "ghi"
            "#,
        )
        .unwrap();
        assert_eq!(config.http.port, 8080);
        assert_eq!(config.http.bind_address, "0.0.0.0");
        assert_eq!(config.spotify.client_id, "abc");
        assert_eq!(config.spotify.redirect_uri, "http://localhost:5000/callback");
        assert_eq!(config.audio.default_volume, 70);
    }
}
