use std::fmt;
use std::net::SocketAddr;

use crate::common::types::ChatMessage;

/// Thành phần phát sinh lỗi, để UI gắn nhãn dòng báo lỗi.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorComponent {
    /// Đường gửi tin nhắn đi.
    Sender,
    /// Vòng lặp nhận tin nhắn unicast.
    Receiver,
    /// Vòng lặp lắng nghe quảng bá discovery.
    Responder,
}

impl fmt::Display for ErrorComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorComponent::Sender => write!(f, "Sender"),
            ErrorComponent::Receiver => write!(f, "Receiver"),
            ErrorComponent::Responder => write!(f, "Responder"),
        }
    }
}

/// Sự kiện từ tầng mạng gửi lên UI.
#[derive(Debug, Clone)]
pub enum NetworkEvent {
    PeerAdded(SocketAddr),
    PeerRemoved(SocketAddr),
    MessageReceived(ChatMessage),
    MessageSent(ChatMessage),
    Error {
        component: ErrorComponent,
        message: String,
    },
}
