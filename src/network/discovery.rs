use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use chrono::Utc;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use crate::common::{ErrorComponent, NetworkEvent};

use super::protocol;
use super::registry::PeerRegistry;

/// Gói quảng bá hợp lệ chỉ vài chục byte; 1500 phủ trọn một MTU Ethernet.
const ANNOUNCE_BUFFER: usize = 1500;

/// Lắng nghe quảng bá hiện diện trên cổng discovery và cập nhật danh bạ peer.
pub struct DiscoveryListener {
    socket: UdpSocket,
    registry: Arc<PeerRegistry>,
    event_sender: mpsc::Sender<NetworkEvent>,
}

impl DiscoveryListener {
    /// Bind wildcard để nhận broadcast từ mọi interface.
    pub async fn bind(
        discovery_port: u16,
        registry: Arc<PeerRegistry>,
        event_sender: mpsc::Sender<NetworkEvent>,
    ) -> std::io::Result<Self> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, discovery_port)).await?;
        Ok(Self {
            socket,
            registry,
            event_sender,
        })
    }

    /// Nhận gói tới khi socket hỏng. Lỗi socket là fatal cho listener này:
    /// báo một sự kiện lỗi lên UI rồi dừng hẳn, không tự khởi động lại.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut buffer = [0u8; ANNOUNCE_BUFFER];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buffer) => {
                    match received {
                        Ok((len, sender)) => {
                            self.handle_datagram(&buffer[..len], sender).await;
                        }
                        Err(err) => {
                            log::error!("Discovery listener terminated: {err}");
                            let _ = self
                                .event_sender
                                .send(NetworkEvent::Error {
                                    component: ErrorComponent::Responder,
                                    message: format!("discovery listener stopped: {err}"),
                                })
                                .await;
                            break;
                        }
                    }
                }
                _ = shutdown.changed() => break,
            }
        }
    }

    async fn handle_datagram(&self, payload: &[u8], sender: SocketAddr) {
        let Some(chat_port) = protocol::parse_announce(payload) else {
            return;
        };
        // Peer = IP người gửi + cổng chat họ loan báo. Quảng bá của chính
        // mình cũng dội về đây và bị registry loại.
        let peer = SocketAddr::new(sender.ip(), chat_port);
        if self.registry.upsert(peer, Utc::now().timestamp_millis()) {
            log::info!("Discovered peer {peer}");
            log::debug!("Online peers: {:?}", self.registry.snapshot());
            let _ = self.event_sender.send(NetworkEvent::PeerAdded(peer)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn listener_with_local(
        local: &str,
    ) -> (DiscoveryListener, mpsc::Receiver<NetworkEvent>) {
        let registry = Arc::new(PeerRegistry::new(local.parse().unwrap(), 5000));
        let (event_tx, event_rx) = mpsc::channel(16);
        let listener = DiscoveryListener::bind(0, registry, event_tx)
            .await
            .unwrap();
        (listener, event_rx)
    }

    #[tokio::test]
    async fn own_announce_is_suppressed() {
        let (listener, mut events) = listener_with_local("10.0.0.9:7000").await;
        listener
            .handle_datagram(b"P2PCHAT_HERE:7000", "10.0.0.9:54321".parse().unwrap())
            .await;
        assert!(events.try_recv().is_err());
        assert!(listener.registry.is_empty());
    }

    #[tokio::test]
    async fn foreign_announce_adds_peer_once() {
        let (listener, mut events) = listener_with_local("10.0.0.9:7001").await;
        let sender: SocketAddr = "10.0.0.9:54321".parse().unwrap();
        listener.handle_datagram(b"P2PCHAT_HERE:7000", sender).await;
        listener.handle_datagram(b"P2PCHAT_HERE:7000", sender).await;

        let expected: SocketAddr = "10.0.0.9:7000".parse().unwrap();
        match events.try_recv() {
            Ok(NetworkEvent::PeerAdded(peer)) => assert_eq!(peer, expected),
            other => panic!("expected PeerAdded, got {other:?}"),
        }
        // Lần quảng bá thứ hai chỉ làm mới, không thêm sự kiện.
        assert!(events.try_recv().is_err());
        assert_eq!(listener.registry.len(), 1);
    }

    #[tokio::test]
    async fn malformed_payload_is_ignored() {
        let (listener, mut events) = listener_with_local("10.0.0.9:7000").await;
        listener
            .handle_datagram(b"NOT_A_CHAT_PACKET", "10.0.0.2:4444".parse().unwrap())
            .await;
        assert!(events.try_recv().is_err());
        assert!(listener.registry.is_empty());
    }
}
