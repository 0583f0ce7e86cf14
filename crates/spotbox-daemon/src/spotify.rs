//! Spotify Web API client.
//!
//! Authenticates with a long-lived refresh token and caches the short-lived
//! access token until shortly before it expires. Only the handful of player
//! endpoints the daemon needs are wrapped here.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use spotbox_proto::api::{Artist, Track};
use spotbox_proto::config::SpotifyConfig;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::debug;

const API_BASE: &str = "https://api.spotify.com/v1";
const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Refresh this many seconds before the access token actually expires.
const TOKEN_SLACK_SECS: i64 = 60;

#[derive(Debug, Error)]
pub enum SpotifyError {
    #[error("Spotify Web API credentials not configured")]
    NotConfigured,
    #[error("token refresh failed: {0}")]
    Token(String),
    #[error("Spotify API returned {status}: {body}")]
    Api {
        status: reqwest::StatusCode,
        body: String,
    },
    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

/// What the player is doing right now, reduced to the fields the daemon keeps.
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    pub track: Option<Track>,
    pub progress_ms: Option<u64>,
    pub device_id: Option<String>,
}

struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

pub struct SpotifyClient {
    http: reqwest::Client,
    config: SpotifyConfig,
    token: RwLock<Option<CachedToken>>,
}

impl SpotifyClient {
    pub fn new(config: SpotifyConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
            token: RwLock::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        !self.config.client_id.is_empty()
            && !self.config.client_secret.is_empty()
            && !self.config.refresh_token.is_empty()
    }

    /// Current access token, refreshed through the token endpoint when the
    /// cached one is missing or about to expire.
    async fn bearer_token(&self) -> Result<String, SpotifyError> {
        if !self.is_configured() {
            return Err(SpotifyError::NotConfigured);
        }
        {
            let token = self.token.read().await;
            if let Some(cached) = token.as_ref() {
                if cached.expires_at > Utc::now() {
                    return Ok(cached.access_token.clone());
                }
            }
        }

        debug!("Refreshing Spotify access token");
        let response = self
            .http
            .post(TOKEN_URL)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", self.config.refresh_token.as_str()),
            ])
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SpotifyError::Token(format!(
                "token endpoint returned {}",
                response.status()
            )));
        }
        let granted: TokenResponse = response.json().await?;
        let expires_at =
            Utc::now() + chrono::Duration::seconds(granted.expires_in - TOKEN_SLACK_SECS);
        let access_token = granted.access_token.clone();
        *self.token.write().await = Some(CachedToken {
            access_token: granted.access_token,
            expires_at,
        });
        Ok(access_token)
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, SpotifyError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(SpotifyError::Api { status, body })
        }
    }

    /// `GET /me/player`. `None` when no playback session exists anywhere
    /// (the API answers 204 with an empty body in that case).
    pub async fn current_playback(&self) -> Result<Option<PlaybackSnapshot>, SpotifyError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(format!("{API_BASE}/me/player"))
            .bearer_auth(token)
            .send()
            .await?;
        if response.status() == reqwest::StatusCode::NO_CONTENT {
            return Ok(None);
        }
        let playback: PlaybackResponse = Self::check(response).await?.json().await?;
        Ok(Some(playback.into_snapshot()))
    }

    /// `GET /me/player/queue`: the current track plus the upcoming ones.
    pub async fn queue(&self) -> Result<(Option<Track>, Vec<Track>), SpotifyError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(format!("{API_BASE}/me/player/queue"))
            .bearer_auth(token)
            .send()
            .await?;
        let queue: QueueApiResponse = Self::check(response).await?.json().await?;
        Ok((
            queue.currently_playing.map(TrackItem::into_track),
            queue.queue.into_iter().map(TrackItem::into_track).collect(),
        ))
    }

    /// Looks up the Connect device with the given name and returns its id.
    pub async fn find_device_id(&self, name: &str) -> Result<Option<String>, SpotifyError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .get(format!("{API_BASE}/me/player/devices"))
            .bearer_auth(token)
            .send()
            .await?;
        let devices: DevicesResponse = Self::check(response).await?.json().await?;
        Ok(devices
            .devices
            .into_iter()
            .find(|device| device.name == name)
            .and_then(|device| device.id))
    }

    /// `PUT /me/player`: move the playback session onto `device_id`.
    pub async fn transfer_playback(&self, device_id: &str, play: bool) -> Result<(), SpotifyError> {
        let token = self.bearer_token().await?;
        let response = self
            .http
            .put(format!("{API_BASE}/me/player"))
            .bearer_auth(token)
            .json(&serde_json::json!({ "device_ids": [device_id], "play": play }))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// `PUT /me/player/play` on the given device. Without a context URI this
    /// resumes whatever the session last played.
    pub async fn start_playback(
        &self,
        device_id: &str,
        context_uri: Option<&str>,
    ) -> Result<(), SpotifyError> {
        let token = self.bearer_token().await?;
        let mut body = serde_json::Map::new();
        if let Some(uri) = context_uri {
            body.insert("context_uri".into(), serde_json::Value::String(uri.into()));
        }
        let response = self
            .http
            .put(format!("{API_BASE}/me/player/play"))
            .query(&[("device_id", device_id)])
            .bearer_auth(token)
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    /// `POST /me/player/queue`: append a track to the playback queue.
    pub async fn add_to_queue(
        &self,
        uri: &str,
        device_id: Option<&str>,
    ) -> Result<(), SpotifyError> {
        let token = self.bearer_token().await?;
        let mut query = vec![("uri", uri)];
        if let Some(id) = device_id {
            query.push(("device_id", id));
        }
        let response = self
            .http
            .post(format!("{API_BASE}/me/player/queue"))
            .query(&query)
            .bearer_auth(token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Deserialize)]
struct PlaybackResponse {
    #[serde(default)]
    device: Option<DeviceItem>,
    #[serde(default)]
    is_playing: bool,
    #[serde(default)]
    progress_ms: Option<u64>,
    #[serde(default)]
    item: Option<TrackItem>,
}

impl PlaybackResponse {
    fn into_snapshot(self) -> PlaybackSnapshot {
        PlaybackSnapshot {
            is_playing: self.is_playing,
            track: self.item.map(TrackItem::into_track),
            progress_ms: self.progress_ms,
            device_id: self.device.and_then(|device| device.id),
        }
    }
}

#[derive(Deserialize)]
struct QueueApiResponse {
    #[serde(default)]
    currently_playing: Option<TrackItem>,
    #[serde(default)]
    queue: Vec<TrackItem>,
}

#[derive(Deserialize)]
struct DevicesResponse {
    #[serde(default)]
    devices: Vec<DeviceItem>,
}

#[derive(Deserialize)]
struct DeviceItem {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct TrackItem {
    #[serde(default)]
    name: String,
    #[serde(default)]
    artists: Vec<ArtistItem>,
    #[serde(default)]
    album: Option<AlbumItem>,
    #[serde(default)]
    duration_ms: Option<u64>,
    #[serde(default)]
    uri: Option<String>,
}

impl TrackItem {
    fn into_track(self) -> Track {
        Track {
            name: self.name,
            artists: self
                .artists
                .into_iter()
                .map(|artist| Artist { name: artist.name })
                .collect(),
            album: self.album.map(|album| album.name),
            duration_ms: self.duration_ms,
            uri: self.uri,
        }
    }
}

#[derive(Deserialize)]
struct ArtistItem {
    #[serde(default)]
    name: String,
}

#[derive(Deserialize)]
struct AlbumItem {
    #[serde(default)]
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_playback_response_decodes_to_snapshot() {
        let payload = r#"{
            "device": {"id": "dev123", "is_active": true, "name": "Spotbox", "type": "Computer", "volume_percent": 70},
            "shuffle_state": false,
            "progress_ms": 24500,
            "is_playing": true,
            "item": {
                "name": "Harvest Moon",
                "artists": [{"name": "Neil Young", "href": "x"}],
                "album": {"name": "Harvest Moon", "album_type": "album"},
                "duration_ms": 303000,
                "uri": "spotify:track:5LYJ631w9ps5h9tdvac7yP"
            }
        }"#;
        let playback: PlaybackResponse = serde_json::from_str(payload).unwrap();
        let snapshot = playback.into_snapshot();
        assert!(snapshot.is_playing);
        assert_eq!(snapshot.device_id.as_deref(), Some("dev123"));
        assert_eq!(snapshot.progress_ms, Some(24500));
        let track = snapshot.track.unwrap();
        assert_eq!(track.name, "Harvest Moon");
        assert_eq!(track.artists[0].name, "Neil Young");
        assert_eq!(track.album.as_deref(), Some("Harvest Moon"));
    }

    #[test]
    fn test_playback_response_tolerates_missing_item() {
        let playback: PlaybackResponse =
            serde_json::from_str(r#"{"is_playing": false, "device": {"id": "d"}}"#).unwrap();
        let snapshot = playback.into_snapshot();
        assert!(!snapshot.is_playing);
        assert!(snapshot.track.is_none());
        assert_eq!(snapshot.device_id.as_deref(), Some("d"));
    }

    #[test]
    fn test_queue_response_maps_tracks() {
        let payload = r#"{
            "currently_playing": {"name": "One", "artists": [{"name": "A"}]},
            "queue": [
                {"name": "Two", "artists": [{"name": "B"}, {"name": "C"}]},
                {"name": "Three", "artists": []}
            ]
        }"#;
        let queue: QueueApiResponse = serde_json::from_str(payload).unwrap();
        assert_eq!(queue.currently_playing.as_ref().unwrap().name, "One");
        let tracks: Vec<Track> = queue.queue.into_iter().map(TrackItem::into_track).collect();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].artists.len(), 2);
        assert!(tracks[1].artists.is_empty());
    }

    #[test]
    fn test_device_lookup_by_name() {
        let payload = r#"{"devices": [
            {"id": "aaa", "name": "Kitchen", "type": "Speaker"},
            {"id": "bbb", "name": "Spotbox", "type": "Computer"}
        ]}"#;
        let devices: DevicesResponse = serde_json::from_str(payload).unwrap();
        let found = devices
            .devices
            .into_iter()
            .find(|d| d.name == "Spotbox")
            .and_then(|d| d.id);
        assert_eq!(found.as_deref(), Some("bbb"));
    }

    #[test]
    fn test_unconfigured_client_reports_not_configured() {
        let client = SpotifyClient::new(SpotifyConfig::default());
        assert!(!client.is_configured());
    }
}
