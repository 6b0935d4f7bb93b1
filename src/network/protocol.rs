//! Định dạng gói quảng bá discovery trên LAN.
//!
//! Một node loan báo hiện diện bằng datagram text `P2PCHAT_HERE:<cổng chat>`
//! broadcast tới cổng 8888. Không có lớp tin cậy nào phía trên UDP.

/// Tiền tố mọi gói quảng bá hợp lệ phải mang.
pub const ANNOUNCE_PREFIX: &str = "P2PCHAT_HERE:";

/// Cổng discovery cố định — vừa là đích broadcast vừa là cổng lắng nghe.
pub const DISCOVERY_PORT: u16 = 8888;

/// Broadcast toàn mạng con.
pub const BROADCAST_ADDR: &str = "255.255.255.255";

pub fn encode_announce(chat_port: u16) -> String {
    format!("{ANNOUNCE_PREFIX}{chat_port}")
}

/// Đọc cổng chat từ payload quảng bá.
///
/// Cổng discovery nhận đủ loại traffic lạ trên LAN; gói không đúng định dạng
/// trả về `None` và bị bỏ qua im lặng, không báo lỗi lên UI.
pub fn parse_announce(payload: &[u8]) -> Option<u16> {
    let text = std::str::from_utf8(payload).ok()?;
    text.strip_prefix(ANNOUNCE_PREFIX)?.trim().parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn announce_round_trip() {
        assert_eq!(parse_announce(encode_announce(7000).as_bytes()), Some(7000));
    }

    #[test]
    fn foreign_payload_is_rejected() {
        assert_eq!(parse_announce(b"SSDP:DISCOVER"), None);
        assert_eq!(parse_announce(b""), None);
        assert_eq!(parse_announce(&[0xff, 0xfe, 0x00]), None);
    }

    #[test]
    fn bad_port_is_rejected() {
        assert_eq!(parse_announce(b"P2PCHAT_HERE:"), None);
        assert_eq!(parse_announce(b"P2PCHAT_HERE:notaport"), None);
        assert_eq!(parse_announce(b"P2PCHAT_HERE:70000"), None);
    }
}
