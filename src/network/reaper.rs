use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use tokio::time;

use crate::common::NetworkEvent;

use super::registry::PeerRegistry;

/// Quét danh bạ theo nhịp cố định, gỡ các peer đã im lặng quá hạn
/// và báo cho UI từng peer biến mất.
pub struct PeerReaper {
    registry: Arc<PeerRegistry>,
    event_sender: mpsc::Sender<NetworkEvent>,
    interval: Duration,
}

impl PeerReaper {
    pub fn new(
        registry: Arc<PeerRegistry>,
        event_sender: mpsc::Sender<NetworkEvent>,
        interval_ms: u64,
    ) -> Self {
        Self {
            registry,
            event_sender,
            interval: Duration::from_millis(interval_ms),
        }
    }

    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => self.sweep(Utc::now().timestamp_millis()).await,
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn sweep(&self, now: i64) {
        for peer in self.registry.expire_older_than(now) {
            log::info!("Peer {peer} timed out ({} still online)", self.registry.len());
            let _ = self
                .event_sender
                .send(NetworkEvent::PeerRemoved(peer))
                .await;
        }
    }
}
