use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use crate::common::{ChatMessage, ErrorComponent, NetworkEvent};

use super::error::TransportError;

/// Kích thước buffer nhận. Datagram dài hơn bị CẮT đúng tại giới hạn này mà
/// không có cách nào phát hiện — hạn chế đã biết của giao thức, người gửi
/// phải tự giữ tin nhắn ngắn.
pub const MAX_DATAGRAM: usize = 1024;

/// Gửi/nhận tin nhắn unicast trên cùng một socket chat, để cổng nguồn mà
/// peer nhìn thấy trùng với cổng đã loan báo khi discovery.
#[derive(Clone)]
pub struct MessageTransport {
    socket: Arc<UdpSocket>,
    event_sender: mpsc::Sender<NetworkEvent>,
}

impl MessageTransport {
    pub fn new(socket: Arc<UdpSocket>, event_sender: mpsc::Sender<NetworkEvent>) -> Self {
        Self {
            socket,
            event_sender,
        }
    }

    /// Gửi fire-and-forget đúng ngữ nghĩa UDP: không ack, không retry,
    /// không đảm bảo thứ tự. Kiểm tra đích trước, đích sai thì không có
    /// byte nào rời máy.
    pub async fn send(
        &self,
        content: &str,
        remote_ip: &str,
        remote_port: &str,
    ) -> Result<ChatMessage, TransportError> {
        let destination = parse_destination(remote_ip, remote_port)?;
        self.socket.send_to(content.as_bytes(), destination).await?;
        Ok(ChatMessage::outgoing(content.to_string()))
    }

    /// Nhận tin nhắn tới khi socket hỏng; mỗi datagram là trọn một tin nhắn
    /// (không framing). Lỗi socket là fatal: báo UI một lần rồi dừng hẳn.
    pub async fn run_receiver(self, mut shutdown: watch::Receiver<bool>) {
        let mut buffer = [0u8; MAX_DATAGRAM];
        loop {
            tokio::select! {
                received = self.socket.recv_from(&mut buffer) => {
                    match received {
                        Ok((len, source)) => {
                            let content = String::from_utf8_lossy(&buffer[..len]).into_owned();
                            let message = ChatMessage::incoming(content, source);
                            let _ = self
                                .event_sender
                                .send(NetworkEvent::MessageReceived(message))
                                .await;
                        }
                        Err(err) => {
                            log::error!("Message receiver terminated: {err}");
                            let _ = self
                                .event_sender
                                .send(NetworkEvent::Error {
                                    component: ErrorComponent::Receiver,
                                    message: format!("receiver stopped: {err}"),
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
}

fn parse_destination(remote_ip: &str, remote_port: &str) -> Result<SocketAddr, TransportError> {
    let ip_text = remote_ip.trim();
    let port_text = remote_port.trim();
    if ip_text.is_empty() || port_text.is_empty() {
        return Err(TransportError::InvalidDestination(
            "please select a peer or enter a remote address first".into(),
        ));
    }
    let ip: IpAddr = ip_text.parse().map_err(|_| {
        TransportError::InvalidDestination(format!("bad remote address `{ip_text}`"))
    })?;
    let port: u16 = port_text.parse().map_err(|_| {
        TransportError::InvalidDestination(format!("bad remote port `{port_text}`"))
    })?;
    Ok(SocketAddr::new(ip, port))
}

#[cfg(test)]
mod tests {
    use crate::common::Direction;

    use super::*;

    async fn transport_pair() -> (MessageTransport, mpsc::Receiver<NetworkEvent>) {
        let socket = Arc::new(UdpSocket::bind("127.0.0.1:0").await.unwrap());
        let (event_tx, event_rx) = mpsc::channel(16);
        (MessageTransport::new(socket, event_tx), event_rx)
    }

    #[tokio::test]
    async fn empty_destination_fails_without_io() {
        let (transport, _events) = transport_pair().await;
        let result = transport.send("hello", "", "").await;
        assert!(matches!(
            result,
            Err(TransportError::InvalidDestination(_))
        ));
    }

    #[tokio::test]
    async fn bad_port_fails_validation() {
        let (transport, _events) = transport_pair().await;
        for port in ["abc", "70000", "-1"] {
            let result = transport.send("hello", "10.0.0.5", port).await;
            assert!(matches!(
                result,
                Err(TransportError::InvalidDestination(_))
            ));
        }
    }

    #[tokio::test]
    async fn send_produces_one_outgoing_message() {
        let (transport, _events) = transport_pair().await;
        let peer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let peer_addr = peer.local_addr().unwrap();

        let message = transport
            .send("hello", "127.0.0.1", &peer_addr.port().to_string())
            .await
            .unwrap();
        assert_eq!(message.direction, Direction::Outgoing);
        assert_eq!(message.content, "hello");
        assert!(message.source.is_none());

        let mut buffer = [0u8; MAX_DATAGRAM];
        let (len, _) = peer.recv_from(&mut buffer).await.unwrap();
        assert_eq!(&buffer[..len], b"hello");
    }

    #[tokio::test]
    async fn receiver_emits_incoming_event() {
        let (transport, mut events) = transport_pair().await;
        let local_addr = transport.socket.local_addr().unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(transport.clone().run_receiver(stop_rx));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"hi there", local_addr).await.unwrap();

        match events.recv().await {
            Some(NetworkEvent::MessageReceived(message)) => {
                assert_eq!(message.content, "hi there");
                assert_eq!(message.direction, Direction::Incoming);
                assert_eq!(
                    message.source.map(|s| s.port()),
                    Some(sender.local_addr().unwrap().port())
                );
            }
            other => panic!("expected MessageReceived, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn oversized_datagram_is_truncated() {
        let (transport, mut events) = transport_pair().await;
        let local_addr = transport.socket.local_addr().unwrap();
        let (_stop_tx, stop_rx) = watch::channel(false);
        tokio::spawn(transport.clone().run_receiver(stop_rx));

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let oversized = "x".repeat(MAX_DATAGRAM + 200);
        sender.send_to(oversized.as_bytes(), local_addr).await.unwrap();

        match events.recv().await {
            Some(NetworkEvent::MessageReceived(message)) => {
                assert_eq!(message.content.len(), MAX_DATAGRAM);
            }
            other => panic!("expected MessageReceived, got {other:?}"),
        }
    }
}
