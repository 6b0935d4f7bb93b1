use std::net::SocketAddr;

use chrono::Utc;
use uuid::Uuid;

/// Hướng của tin nhắn: mình gửi đi hay nhận từ peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Outgoing,
    Incoming,
}

/// Domain model đại diện một tin nhắn chat.
#[derive(Debug, Clone)]
pub struct ChatMessage {
    pub id: String,
    pub direction: Direction,
    pub content: String,
    /// Unix millis
    pub timestamp: i64,
    /// Địa chỉ nguồn, chỉ có với tin nhắn đến.
    pub source: Option<SocketAddr>,
}

impl ChatMessage {
    pub fn outgoing(content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            direction: Direction::Outgoing,
            content,
            timestamp: Utc::now().timestamp_millis(),
            source: None,
        }
    }

    pub fn incoming(content: String, source: SocketAddr) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            direction: Direction::Incoming,
            content,
            timestamp: Utc::now().timestamp_millis(),
            source: Some(source),
        }
    }
}
