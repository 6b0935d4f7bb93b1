use std::time::Duration;

use tokio::net::UdpSocket;
use tokio::sync::watch;
use tokio::time;

use super::protocol;

/// Vòng lặp loan báo hiện diện: mỗi nhịp gửi một gói broadcast
/// `P2PCHAT_HERE:<cổng chat>` tới cổng discovery.
pub struct HeartbeatBroadcaster {
    socket: UdpSocket,
    payload: String,
    discovery_port: u16,
    interval: Duration,
}

impl HeartbeatBroadcaster {
    /// Socket gửi riêng, cổng tuỳ ý, chỉ cần bật quyền broadcast.
    pub async fn bind(
        chat_port: u16,
        discovery_port: u16,
        interval_ms: u64,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.set_broadcast(true)?;
        Ok(Self {
            socket,
            payload: protocol::encode_announce(chat_port),
            discovery_port,
            interval: Duration::from_millis(interval_ms),
        })
    }

    /// Chạy tới khi có tín hiệu dừng. Broadcast là best-effort: gửi lỗi
    /// (mạng chưa sẵn sàng, rút cáp...) thì ghi log rồi chờ nhịp sau,
    /// không retry trong cùng nhịp.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let target = (protocol::BROADCAST_ADDR, self.discovery_port);
        let mut ticker = time::interval(self.interval);
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(err) = self.socket.send_to(self.payload.as_bytes(), target).await {
                        log::warn!("Heartbeat broadcast failed: {err}");
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }
}
