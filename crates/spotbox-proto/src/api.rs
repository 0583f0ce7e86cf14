use serde::{Deserialize, Serialize};

/// A playable item as served by the appliance.  Only `name` and `artists`
/// are guaranteed; everything else is carried when the upstream player
/// provides it and ignored otherwise.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Track {
    pub name: String,
    #[serde(default)]
    pub artists: Vec<Artist>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Artist {
    pub name: String,
}

/// `GET /api/status` response.  Clients poll this once a second; it is a
/// snapshot, never cached server-side beyond the refresh loop.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StatusResponse {
    pub is_playing: bool,
    pub current_track: Option<Track>,
    /// Position inside `current_track`, when the upstream player reports one.
    #[serde(default)]
    pub progress_ms: Option<u64>,
    /// Mixer volume, 0..=100.
    pub volume: u8,
    pub device_id: Option<String>,
}

/// `GET /api/queue` response.  Mirrors the player's queue endpoint:
/// the item currently on air plus everything waiting behind it.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct QueueResponse {
    #[serde(default)]
    pub currently_playing: Option<Track>,
    #[serde(default)]
    pub queue: Vec<Track>,
}

/// The value carried by `POST /api/volume`.
///
/// The appliance's original web client submitted the slider's raw string
/// value, so the wire form is a JSON string (`{"volume":"30"}`).  The daemon
/// accepts a bare number too.  Values clamp to 0..=100.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VolumeValue(u8);

impl VolumeValue {
    pub fn new(percent: u8) -> Self {
        Self(percent.min(100))
    }

    pub fn percent(&self) -> u8 {
        self.0
    }

    fn from_raw(raw: i64) -> Self {
        Self(raw.clamp(0, 100) as u8)
    }
}

impl Serialize for VolumeValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for VolumeValue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct VolumeVisitor;

        impl serde::de::Visitor<'_> for VolumeVisitor {
            type Value = VolumeValue;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                f.write_str("a volume percentage as a string or a number")
            }

            fn visit_str<E: serde::de::Error>(self, v: &str) -> Result<Self::Value, E> {
                let raw: i64 = v
                    .trim()
                    .parse()
                    .map_err(|_| E::custom(format!("invalid volume {:?}", v)))?;
                Ok(VolumeValue::from_raw(raw))
            }

            fn visit_i64<E: serde::de::Error>(self, v: i64) -> Result<Self::Value, E> {
                Ok(VolumeValue::from_raw(v))
            }

            fn visit_u64<E: serde::de::Error>(self, v: u64) -> Result<Self::Value, E> {
                Ok(VolumeValue::from_raw(v.min(i64::MAX as u64) as i64))
            }

            fn visit_f64<E: serde::de::Error>(self, v: f64) -> Result<Self::Value, E> {
                Ok(VolumeValue::from_raw(v as i64))
            }
        }

        deserializer.deserialize_any(VolumeVisitor)
    }
}

/// `POST /api/volume` request body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VolumeRequest {
    pub volume: VolumeValue,
}

/// `POST /api/volume` response: echoes the applied level back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAck {
    pub success: bool,
    pub volume: u8,
}

/// Generic command acknowledgement.  `error` is present only on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ack {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Ack {
    pub fn ok() -> Self {
        Self { success: true, error: None }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self { success: false, error: Some(message.into()) }
    }
}

/// `POST /api/queue/add` request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueAddRequest {
    pub uri: String,
}

/// `POST /api/setup` request body: device-login credentials for the
/// appliance.  Stored, not echoed anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_serializes_as_string() {
        let body = VolumeRequest { volume: VolumeValue::new(30) };
        let json = serde_json::to_string(&body).unwrap();
        assert_eq!(json, r#"{"volume":"30"}"#);
    }

    #[test]
    fn test_volume_accepts_string_and_number() {
        let from_str: VolumeRequest = serde_json::from_str(r#"{"volume":"30"}"#).unwrap();
        let from_num: VolumeRequest = serde_json::from_str(r#"{"volume":30}"#).unwrap();
        assert_eq!(from_str.volume.percent(), 30);
        assert_eq!(from_num.volume.percent(), 30);
    }

    #[test]
    fn test_volume_clamps_out_of_range() {
        let high: VolumeValue = serde_json::from_str("150").unwrap();
        let low: VolumeValue = serde_json::from_str("\"-5\"").unwrap();
        assert_eq!(high.percent(), 100);
        assert_eq!(low.percent(), 0);
        assert_eq!(VolumeValue::new(255).percent(), 100);
    }

    #[test]
    fn test_volume_rejects_non_numeric_string() {
        let result = serde_json::from_str::<VolumeValue>("\"loud\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_status_decode() {
        let json = r#"{
            "is_playing": true,
            "current_track": {
                "name": "Song A",
                "artists": [{"name": "Artist 1"}, {"name": "Artist 2"}],
                "duration_ms": 215000
            },
            "progress_ms": 1000,
            "volume": 50,
            "device_id": "abc123"
        }"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert!(status.is_playing);
        let track = status.current_track.unwrap();
        assert_eq!(track.name, "Song A");
        assert_eq!(track.artists[0].name, "Artist 1");
        assert_eq!(status.volume, 50);
        assert_eq!(status.device_id.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_queue_decode_ignores_unknown_fields() {
        // Upstream payloads carry far more than we consume; extra fields
        // and a missing currently_playing must both pass through.
        let json = r#"{
            "queue": [
                {"name": "Song A", "artists": [{"name": "Artist 1", "id": "xyz"}], "popularity": 55},
                {"name": "Song B", "artists": []}
            ]
        }"#;
        let queue: QueueResponse = serde_json::from_str(json).unwrap();
        assert!(queue.currently_playing.is_none());
        assert_eq!(queue.queue.len(), 2);
        assert_eq!(queue.queue[0].artists[0].name, "Artist 1");
        assert!(queue.queue[1].artists.is_empty());
    }

    #[test]
    fn test_ack_omits_absent_error() {
        assert_eq!(serde_json::to_string(&Ack::ok()).unwrap(), r#"{"success":true}"#);
        let err = serde_json::to_string(&Ack::err("Missing credentials")).unwrap();
        assert_eq!(err, r#"{"success":false,"error":"Missing credentials"}"#);
    }
}
