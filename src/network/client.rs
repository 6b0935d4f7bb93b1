use std::error::Error;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::{mpsc, watch};

use crate::common::{ErrorComponent, NetworkCommand, NetworkEvent};
use crate::config::AppConfig;

use super::discovery::DiscoveryListener;
use super::heartbeat::HeartbeatBroadcaster;
use super::reaper::PeerReaper;
use super::registry::PeerRegistry;
use super::transport::MessageTransport;

/// Đầu mối tầng mạng: bind socket, dựng danh bạ peer, chạy các vòng lặp nền
/// và dịch lệnh từ UI thành thao tác gửi.
pub struct P2PClient {
    event_sender: mpsc::Sender<NetworkEvent>,
    command_receiver: mpsc::Receiver<NetworkCommand>,
    config: AppConfig,
}

impl P2PClient {
    pub fn new(
        event_sender: mpsc::Sender<NetworkEvent>,
        command_receiver: mpsc::Receiver<NetworkCommand>,
        config: AppConfig,
    ) -> Self {
        Self {
            event_sender,
            command_receiver,
            config,
        }
    }

    pub async fn run(mut self) -> Result<(), Box<dyn Error>> {
        // Socket chat dùng chung cho gửi lẫn nhận; cổng 0 = hệ điều hành
        // tự chọn một cổng trống.
        let chat_socket =
            Arc::new(UdpSocket::bind((Ipv4Addr::UNSPECIFIED, self.config.local_port)).await?);
        let local_port = chat_socket.local_addr()?.port();
        let local = SocketAddr::new(detect_local_ipv4(), local_port);
        log::info!("Local identity: {local}");

        let registry = Arc::new(PeerRegistry::new(local, self.config.liveness_timeout_ms));

        // Tín hiệu dừng chung: client thoát thì mọi vòng lặp nền hạ theo.
        let (stop_sender, stop_receiver) = watch::channel(false);

        let heartbeat = HeartbeatBroadcaster::bind(
            local_port,
            self.config.discovery_port,
            self.config.heartbeat_interval_ms,
        )
        .await?;
        tokio::spawn(heartbeat.run(stop_receiver.clone()));

        match DiscoveryListener::bind(
            self.config.discovery_port,
            Arc::clone(&registry),
            self.event_sender.clone(),
        )
        .await
        {
            Ok(listener) => {
                tokio::spawn(listener.run(stop_receiver.clone()));
            }
            Err(err) => {
                // Cổng discovery bận — thường do một node khác trên cùng máy.
                // Node vẫn gửi nhận tin được, chỉ không tự thấy peer mới.
                log::error!(
                    "Cannot bind discovery port {}: {err}",
                    self.config.discovery_port
                );
                let _ = self
                    .event_sender
                    .send(NetworkEvent::Error {
                        component: ErrorComponent::Responder,
                        message: format!("discovery disabled: {err}"),
                    })
                    .await;
            }
        }

        let reaper = PeerReaper::new(
            Arc::clone(&registry),
            self.event_sender.clone(),
            self.config.sweep_interval_ms,
        );
        tokio::spawn(reaper.run(stop_receiver.clone()));

        let transport = MessageTransport::new(Arc::clone(&chat_socket), self.event_sender.clone());
        tokio::spawn(transport.clone().run_receiver(stop_receiver));

        log::info!("Network loops started (chat port {local_port})");

        while let Some(command) = self.command_receiver.recv().await {
            self.handle_command(command, &transport).await;
        }

        // Kênh lệnh đóng nghĩa là UI đã thoát.
        let _ = stop_sender.send(true);
        Ok(())
    }

    async fn handle_command(&mut self, command: NetworkCommand, transport: &MessageTransport) {
        match command {
            NetworkCommand::SendMessage {
                content,
                remote_ip,
                remote_port,
            } => match transport.send(&content, &remote_ip, &remote_port).await {
                Ok(message) => {
                    log::debug!("Sent message {} to {remote_ip}:{remote_port}", message.id);
                    let _ = self
                        .event_sender
                        .send(NetworkEvent::MessageSent(message))
                        .await;
                }
                Err(err) => {
                    log::warn!("Send failed: {err}");
                    let _ = self
                        .event_sender
                        .send(NetworkEvent::Error {
                            component: ErrorComponent::Sender,
                            message: err.to_string(),
                        })
                        .await;
                }
            },
        }
    }
}

/// Dò IPv4 cục bộ bằng một socket "connect" khống (UDP connect không gửi gói
/// nào đi); máy không nối mạng thì dùng loopback.
fn detect_local_ipv4() -> IpAddr {
    let probe = || -> std::io::Result<IpAddr> {
        let socket = std::net::UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
        socket.connect(("8.8.8.8", 80))?;
        Ok(socket.local_addr()?.ip())
    };
    probe().unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}
