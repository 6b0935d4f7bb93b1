use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time;

use crate::common::expiry::ExpiringStore;

/// Kho các dòng đã gỡ khỏi khung chat, giữ tối đa TTL rồi tự huỷ.
///
/// archive / restore_all / purge đều đi qua một lock duy nhất của kho nền,
/// nên không dòng nào có thể vừa được restore trả về vừa bị purge gỡ bỏ.
pub struct ArchiveStore {
    entries: ExpiringStore<String>,
}

impl ArchiveStore {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            entries: ExpiringStore::new(ttl_ms),
        }
    }

    /// Đưa một dòng vào kho.
    pub fn archive(&self, content: String) {
        self.entries.append(content, Utc::now().timestamp_millis());
    }

    /// Đưa cả khung chat vào kho, giữ nguyên thứ tự hiển thị.
    pub fn archive_all<I>(&self, contents: I)
    where
        I: IntoIterator<Item = String>,
    {
        let now = Utc::now().timestamp_millis();
        for content in contents {
            self.entries.append(content, now);
        }
    }

    /// Trả lại toàn bộ theo thứ tự chèn và làm trống kho.
    pub fn restore_all(&self) -> Vec<String> {
        self.entries.drain()
    }

    /// Gỡ bỏ (không trả về) các dòng đã quá hạn.
    pub fn purge_expired(&self, now: i64) {
        let purged = self.entries.take_expired(now);
        if !purged.is_empty() {
            log::debug!("Purged {} expired archive line(s)", purged.len());
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Vòng quét định kỳ của kho lưu trữ, độc lập với archive/restore.
pub async fn run_purge_loop(
    store: Arc<ArchiveStore>,
    interval_ms: u64,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = time::interval(Duration::from_millis(interval_ms));
    loop {
        tokio::select! {
            _ = ticker.tick() => store.purge_expired(Utc::now().timestamp_millis()),
            _ = shutdown.changed() => break,
        }
    }
}
