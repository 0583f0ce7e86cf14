mod action;
mod app;
mod app_state;
mod component;
mod components;
mod focus;
mod poller;
mod theme;
mod widgets;

use std::time::Duration;

use spotbox_proto::client::ApiClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = spotbox_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("tui.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // Allow RUST_LOG override; default to debug for app code but suppress noisy
    // connection-level DEBUG from HTTP client internals (hyper_util, reqwest).
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "debug,hyper_util=warn,reqwest=warn,hyper=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    // Print log path to stderr so the operator can tail it immediately.
    eprintln!("spotbox log: {}", log_path.display());

    tracing::info!("spotbox tui starting…");

    let config = spotbox_proto::config::Config::load().unwrap_or_default();
    let server_url = std::env::var("SPOTBOX_URL").unwrap_or(config.client.server_url);
    let poll_interval = Duration::from_millis(config.client.poll_interval_ms.max(100));

    let app = app::App::new(ApiClient::new(server_url), poll_interval);
    app.run().await?;

    Ok(())
}
