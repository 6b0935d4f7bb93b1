use thiserror::Error;

/// Lỗi đường gửi/nhận tin nhắn, phân loại theo cách UI phải phản ứng.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Địa chỉ đích rỗng hoặc cổng sai — chặn ngay, chưa chạm tới socket.
    #[error("invalid destination: {0}")]
    InvalidDestination(String),

    /// Lỗi socket từ hệ điều hành (mạng không tới được, socket đã đóng...).
    #[error("network error: {0}")]
    Network(#[from] std::io::Error),
}
