use crate::core::{ClientCommand, DaemonEvent};
use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use spotbox_proto::api::{
    Ack, QueueAddRequest, QueueResponse, SetupRequest, StatusResponse, VolumeAck, VolumeRequest,
};
use spotbox_proto::state::StateManager;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{error, info};

#[derive(Clone)]
struct HttpState {
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
}

pub fn start_server(
    bind_address: String,
    port: u16,
    state_manager: Arc<StateManager>,
    event_tx: mpsc::Sender<DaemonEvent>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let app = router(HttpState {
            state_manager,
            event_tx,
        });

        let addr = format!("{}:{}", bind_address, port);
        let listener = match TcpListener::bind(&addr).await {
            Ok(l) => l,
            Err(e) => {
                error!("Failed to bind HTTP server to {}: {}", addr, e);
                return;
            }
        };

        info!("HTTP API server listening on http://{}", addr);

        if let Err(e) = axum::serve(listener, app).await {
            error!("HTTP server error: {}", e);
        }
    })
}

fn router(state: HttpState) -> Router {
    Router::new()
        .route("/api/status", get(get_status))
        .route("/api/queue", get(get_queue))
        .route("/api/volume", post(set_volume))
        .route("/api/queue/add", post(queue_add))
        .route("/api/playback/reclaim", post(reclaim_playback))
        .route("/api/setup", post(setup))
        .with_state(state)
}

/// Serves the snapshot the daemon core keeps refreshed; handlers never call
/// the Spotify API themselves.
async fn get_status(State(state): State<HttpState>) -> Json<StatusResponse> {
    let snapshot = state.state_manager.get_state().await;
    Json(StatusResponse {
        is_playing: snapshot.is_playing,
        current_track: snapshot.current_track,
        progress_ms: snapshot.progress_ms,
        volume: snapshot.volume,
        device_id: snapshot.device_id,
    })
}

async fn get_queue(State(state): State<HttpState>) -> Json<QueueResponse> {
    let snapshot = state.state_manager.get_state().await;
    Json(QueueResponse {
        currently_playing: snapshot.currently_playing,
        queue: snapshot.queue,
    })
}

async fn set_volume(
    State(state): State<HttpState>,
    Json(request): Json<VolumeRequest>,
) -> Result<Json<VolumeAck>, StatusCode> {
    let percent = request.volume.percent();
    info!("HTTP API: Set volume to {}%", percent);
    let command = ClientCommand::SetVolume(request.volume);
    if state
        .event_tx
        .send(DaemonEvent::ClientCommand(command))
        .await
        .is_err()
    {
        error!("Failed to send volume command");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(VolumeAck {
        success: true,
        volume: percent,
    }))
}

async fn queue_add(
    State(state): State<HttpState>,
    Json(request): Json<QueueAddRequest>,
) -> Result<Json<Ack>, StatusCode> {
    info!("HTTP API: Queue add {}", request.uri);
    let command = ClientCommand::QueueAdd(request.uri);
    if state
        .event_tx
        .send(DaemonEvent::ClientCommand(command))
        .await
        .is_err()
    {
        error!("Failed to send queue command");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(Ack::ok()))
}

async fn reclaim_playback(State(state): State<HttpState>) -> Result<Json<Ack>, StatusCode> {
    info!("HTTP API: Reclaim playback");
    if state
        .event_tx
        .send(DaemonEvent::ClientCommand(ClientCommand::Reclaim))
        .await
        .is_err()
    {
        error!("Failed to send reclaim command");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(Ack::ok()))
}

/// Stores device login credentials. Missing fields answer 200 with a
/// `success: false` body rather than an HTTP error, matching what the
/// provisioning clients expect.
async fn setup(
    State(state): State<HttpState>,
    Json(request): Json<SetupRequest>,
) -> Result<Json<Ack>, StatusCode> {
    if request.username.is_empty() || request.password.is_empty() {
        return Ok(Json(Ack::err("Missing credentials")));
    }
    info!("HTTP API: Setup credentials for {}", request.username);
    if let Err(e) = state
        .state_manager
        .set_credentials(request.username, request.password)
        .await
    {
        error!("Failed to persist credentials: {}", e);
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    if state
        .event_tx
        .send(DaemonEvent::ClientCommand(ClientCommand::CredentialsUpdated))
        .await
        .is_err()
    {
        error!("Failed to send credentials notification");
        return Err(StatusCode::INTERNAL_SERVER_ERROR);
    }
    Ok(Json(Ack::ok()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use spotbox_proto::api::{Artist, Track};

    fn track(name: &str, artist: &str) -> Track {
        Track {
            name: name.to_string(),
            artists: vec![Artist {
                name: artist.to_string(),
            }],
            album: None,
            duration_ms: Some(180_000),
            uri: None,
        }
    }

    async fn spawn_api() -> (
        String,
        mpsc::Receiver<DaemonEvent>,
        Arc<StateManager>,
        tempfile::TempDir,
    ) {
        let dir = tempfile::tempdir().unwrap();
        let state_manager = Arc::new(StateManager::new(dir.path().join("state.json"), 70));
        let (event_tx, event_rx) = mpsc::channel(16);
        let app = router(HttpState {
            state_manager: Arc::clone(&state_manager),
            event_tx,
        });
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), event_rx, state_manager, dir)
    }

    #[tokio::test]
    async fn test_status_reflects_snapshot() {
        let (base, _rx, state_manager, _dir) = spawn_api().await;
        state_manager
            .set_playback(
                true,
                Some(track("Corduroy", "Pearl Jam")),
                Some(42_000),
                Some("elsewhere".to_string()),
            )
            .await;
        state_manager.set_device_id(Some("our-dev".to_string())).await;
        state_manager.set_volume(55).await.unwrap();

        let status: StatusResponse = reqwest::get(format!("{base}/api/status"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert!(status.is_playing);
        assert_eq!(status.volume, 55);
        assert_eq!(status.device_id.as_deref(), Some("our-dev"));
        assert_eq!(status.current_track.unwrap().name, "Corduroy");
        assert_eq!(status.progress_ms, Some(42_000));
    }

    #[tokio::test]
    async fn test_queue_reflects_snapshot() {
        let (base, _rx, state_manager, _dir) = spawn_api().await;
        state_manager
            .set_queue(
                Some(track("Now", "A")),
                vec![track("Next", "B"), track("Later", "C")],
            )
            .await;

        let queue: QueueResponse = reqwest::get(format!("{base}/api/queue"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        assert_eq!(queue.currently_playing.unwrap().name, "Now");
        assert_eq!(queue.queue.len(), 2);
        assert_eq!(queue.queue[1].name, "Later");
    }

    #[tokio::test]
    async fn test_volume_accepts_string_payload() {
        let (base, mut rx, _state, _dir) = spawn_api().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/volume"))
            .header("content-type", "application/json")
            .body(r#"{"volume":"30"}"#)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let ack: VolumeAck = response.json().await.unwrap();
        assert!(ack.success);
        assert_eq!(ack.volume, 30);

        let event = rx.recv().await.unwrap();
        assert!(matches!(
            event,
            DaemonEvent::ClientCommand(ClientCommand::SetVolume(v)) if v.percent() == 30
        ));
    }

    #[tokio::test]
    async fn test_volume_rejects_malformed_payload() {
        let (base, mut rx, _state, _dir) = spawn_api().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/volume"))
            .header("content-type", "application/json")
            .body(r#"{"volume":"loud"}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::UNPROCESSABLE_ENTITY);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_reclaim_accepts_empty_body() {
        let (base, mut rx, _state, _dir) = spawn_api().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/playback/reclaim"))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let ack: Ack = response.json().await.unwrap();
        assert!(ack.success);
        assert!(matches!(
            rx.recv().await.unwrap(),
            DaemonEvent::ClientCommand(ClientCommand::Reclaim)
        ));
    }

    #[tokio::test]
    async fn test_queue_add_dispatches_uri() {
        let (base, mut rx, _state, _dir) = spawn_api().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/queue/add"))
            .json(&serde_json::json!({"uri": "spotify:track:abc"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        assert!(matches!(
            rx.recv().await.unwrap(),
            DaemonEvent::ClientCommand(ClientCommand::QueueAdd(uri)) if uri == "spotify:track:abc"
        ));
    }

    #[tokio::test]
    async fn test_setup_rejects_missing_credentials() {
        let (base, mut rx, state_manager, _dir) = spawn_api().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/setup"))
            .json(&serde_json::json!({"username": "listener"}))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);
        let ack: Ack = response.json().await.unwrap();
        assert!(!ack.success);
        assert_eq!(ack.error.as_deref(), Some("Missing credentials"));
        assert!(rx.try_recv().is_err());
        assert!(!state_manager.get_state().await.has_credentials());
    }

    #[tokio::test]
    async fn test_setup_persists_credentials() {
        let (base, mut rx, state_manager, _dir) = spawn_api().await;
        let response = reqwest::Client::new()
            .post(format!("{base}/api/setup"))
            .json(&serde_json::json!({"username": "listener", "password": "hunter2"}))
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());
        let ack: Ack = response.json().await.unwrap();
        assert!(ack.success);
        assert!(matches!(
            rx.recv().await.unwrap(),
            DaemonEvent::ClientCommand(ClientCommand::CredentialsUpdated)
        ));
        assert!(state_manager.get_state().await.has_credentials());
    }
}
