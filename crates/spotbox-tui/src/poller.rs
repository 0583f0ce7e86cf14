//! StatusPoller — drives the once-a-second status refresh.
//!
//! Each tick fires a detached fetch; ticks are never serialized behind a slow
//! response, so overlapping requests are possible and whichever answer lands
//! last wins. A failed fetch logs at debug and the next tick tries again.

use std::time::Duration;

use spotbox_proto::client::ApiClient;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::app::AppMessage;

pub struct StatusPoller {
    handle: JoinHandle<()>,
}

impl StatusPoller {
    pub fn start(client: ApiClient, interval: Duration, tx: mpsc::Sender<AppMessage>) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                if tx.is_closed() {
                    break;
                }
                let client = client.clone();
                let tx = tx.clone();
                tokio::spawn(async move {
                    match client.get_status().await {
                        Ok(status) => {
                            let _ = tx.send(AppMessage::StatusUpdated(status)).await;
                        }
                        Err(e) => debug!("status poll failed: {:#}", e),
                    }
                });
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for StatusPoller {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
