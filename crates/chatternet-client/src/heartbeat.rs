//! Background presence heartbeat.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chatternet_shared::constants::HEARTBEAT_INTERVAL_SECS;

use crate::api::ApiClient;

/// Periodically reports this surface as online.  The task is aborted when
/// the handle is dropped; a failed beat is logged and retried on the next
/// tick, never sooner.
pub struct HeartbeatTask {
    handle: JoinHandle<()>,
}

impl HeartbeatTask {
    pub fn spawn(api: ApiClient) -> Self {
        Self::spawn_with_interval(api, Duration::from_secs(HEARTBEAT_INTERVAL_SECS))
    }

    pub fn spawn_with_interval(api: ApiClient, interval: Duration) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                ticker.tick().await;
                match api.heartbeat().await {
                    Ok(()) => debug!("heartbeat sent"),
                    Err(e) => warn!(error = %e, "heartbeat failed; next attempt on schedule"),
                }
            }
        });
        Self { handle }
    }

    pub fn stop(self) {
        self.handle.abort();
    }
}

impl Drop for HeartbeatTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use chatternet_shared::types::UserId;

    #[tokio::test]
    async fn stops_when_dropped() {
        let api = ApiClient::new("http://127.0.0.1:1", UserId::from("me")).unwrap();
        let task = HeartbeatTask::spawn_with_interval(api, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(task);
        // Nothing to assert beyond the abort not panicking; the task is gone.
    }
}
