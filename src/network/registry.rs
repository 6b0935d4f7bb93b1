use std::net::SocketAddr;

use crate::common::expiry::ExpiringStore;

/// Danh bạ các peer đang online, khoá theo `(ip, cổng chat)`.
///
/// Mọi thao tác tự khoá bên trong: vòng lặp discovery ghi và vòng lặp reaper
/// quét chạy song song mà không cần lock ngoài. Một peer được làm mới đúng lúc
/// lượt quét diễn ra thì hoặc thấy mốc cũ (bị gỡ rồi quảng bá lại ở nhịp sau)
/// hoặc mốc mới (sống tiếp) — không bao giờ mất lặng lẽ.
pub struct PeerRegistry {
    peers: ExpiringStore<SocketAddr>,
    local: SocketAddr,
}

impl PeerRegistry {
    pub fn new(local: SocketAddr, liveness_timeout_ms: i64) -> Self {
        Self {
            peers: ExpiringStore::new(liveness_timeout_ms),
            local,
        }
    }

    /// Ghi nhận một peer vừa quảng bá; trả về `true` nếu đây là peer mới.
    /// Quảng bá của chính node này bị loại — node không bao giờ tự thấy mình.
    pub fn upsert(&self, peer: SocketAddr, now: i64) -> bool {
        if peer == self.local {
            return false;
        }
        self.peers.upsert(peer, now)
    }

    /// Gỡ và trả về các peer đã im lặng quá hạn.
    pub fn expire_older_than(&self, now: i64) -> Vec<SocketAddr> {
        self.peers.take_expired(now)
    }

    /// Bản chụp danh sách peer để hiển thị.
    pub fn snapshot(&self) -> Vec<SocketAddr> {
        self.peers.snapshot()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
