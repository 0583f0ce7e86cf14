//! Wire-level tests for `ApiClient` against a loopback stub server.
//!
//! These assert the exact bytes the client puts on the wire (the volume body
//! is a JSON *string*, reclaim has no body at all), not just that the calls
//! succeed.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::response::Json;
use axum::routing::{get, post};
use axum::Router;
use spotbox_proto::api::VolumeValue;
use spotbox_proto::client::ApiClient;

#[derive(Debug, Clone)]
struct RecordedRequest {
    path: &'static str,
    body: String,
}

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl StubState {
    fn record(&self, path: &'static str, body: String) {
        self.requests.lock().unwrap().push(RecordedRequest { path, body });
    }

    fn recorded(&self, path: &str) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }
}

async fn stub_status() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "is_playing": true,
        "current_track": {
            "name": "Song A",
            "artists": [{"name": "Artist 1"}]
        },
        "progress_ms": 1000,
        "volume": 50,
        "device_id": "dev-1"
    }))
}

async fn stub_queue() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "currently_playing": {"name": "Song A", "artists": [{"name": "Artist 1"}]},
        "queue": [
            {"name": "Song B", "artists": [{"name": "Artist 2"}]},
            {"name": "Song C", "artists": [{"name": "Artist 3"}]}
        ]
    }))
}

async fn stub_volume(State(state): State<StubState>, body: String) -> Json<serde_json::Value> {
    state.record("/api/volume", body);
    Json(serde_json::json!({"success": true, "volume": 30}))
}

async fn stub_reclaim(State(state): State<StubState>, body: String) -> Json<serde_json::Value> {
    state.record("/api/playback/reclaim", body);
    Json(serde_json::json!({"success": true}))
}

async fn stub_queue_add(State(state): State<StubState>, body: String) -> Json<serde_json::Value> {
    state.record("/api/queue/add", body);
    Json(serde_json::json!({"success": true}))
}

async fn spawn_stub(state: StubState) -> SocketAddr {
    let app = Router::new()
        .route("/api/status", get(stub_status))
        .route("/api/queue", get(stub_queue))
        .route("/api/volume", post(stub_volume))
        .route("/api/playback/reclaim", post(stub_reclaim))
        .route("/api/queue/add", post(stub_queue_add))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

#[tokio::test]
async fn status_fetch_decodes_payload() {
    let addr = spawn_stub(StubState::default()).await;
    let client = ApiClient::new(format!("http://{}", addr));

    let status = client.get_status().await.unwrap();
    assert!(status.is_playing);
    assert_eq!(status.volume, 50);
    let track = status.current_track.unwrap();
    assert_eq!(track.name, "Song A");
    assert_eq!(track.artists[0].name, "Artist 1");
}

#[tokio::test]
async fn queue_fetch_decodes_payload() {
    let addr = spawn_stub(StubState::default()).await;
    let client = ApiClient::new(format!("http://{}", addr));

    let queue = client.get_queue().await.unwrap();
    assert_eq!(queue.queue.len(), 2);
    assert_eq!(queue.queue[0].name, "Song B");
    assert_eq!(queue.queue[1].artists[0].name, "Artist 3");
}

#[tokio::test]
async fn volume_posts_exact_string_body() {
    let state = StubState::default();
    let addr = spawn_stub(state.clone()).await;
    let client = ApiClient::new(format!("http://{}", addr));

    client.set_volume(VolumeValue::new(30)).await.unwrap();

    let recorded = state.recorded("/api/volume");
    assert_eq!(recorded.len(), 1, "exactly one POST per change");
    assert_eq!(recorded[0].body, r#"{"volume":"30"}"#);
}

#[tokio::test]
async fn reclaim_posts_empty_body() {
    let state = StubState::default();
    let addr = spawn_stub(state.clone()).await;
    let client = ApiClient::new(format!("http://{}", addr));

    client.reclaim_playback().await.unwrap();

    let recorded = state.recorded("/api/playback/reclaim");
    assert_eq!(recorded.len(), 1);
    assert!(recorded[0].body.is_empty(), "reclaim must not carry a body");
}

#[tokio::test]
async fn queue_add_round_trip() {
    let state = StubState::default();
    let addr = spawn_stub(state.clone()).await;
    let client = ApiClient::new(format!("http://{}", addr));

    let ack = client.queue_add("spotify:track:abc").await.unwrap();
    assert!(ack.success);

    let recorded = state.recorded("/api/queue/add");
    assert_eq!(recorded[0].body, r#"{"uri":"spotify:track:abc"}"#);
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    async fn failing() -> (axum::http::StatusCode, &'static str) {
        (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "boom")
    }
    let app = Router::new().route("/api/status", get(failing));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let client = ApiClient::new(format!("http://{}", addr));
    assert!(client.get_status().await.is_err());
}
