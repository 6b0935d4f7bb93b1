use std::sync::{Mutex, MutexGuard};

/// Một phần tử kèm mốc thời gian ghi nhận gần nhất (unix millis).
struct Stamped<T> {
    value: T,
    stamped_at: i64,
}

/// Kho phần tử có hạn dùng, chia sẻ giữa nhiều task.
///
/// Hai chính sách hết hạn của ứng dụng — peer im lặng quá lâu và dòng lưu trữ
/// quá TTL — đều là một phép quét `now - stamp > ttl`, nên dùng chung một kho:
/// registry dùng `upsert` (khoá duy nhất, làm mới mốc thời gian), archive dùng
/// `append` (cho phép trùng, giữ thứ tự chèn).
///
/// Mốc thời gian được truyền vào từ ngoài thay vì đọc đồng hồ tại chỗ,
/// để test không phải ngủ chờ.
pub struct ExpiringStore<T> {
    ttl_ms: i64,
    entries: Mutex<Vec<Stamped<T>>>,
}

impl<T: Clone + PartialEq> ExpiringStore<T> {
    pub fn new(ttl_ms: i64) -> Self {
        Self {
            ttl_ms,
            entries: Mutex::new(Vec::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, Vec<Stamped<T>>> {
        // Không giữ guard qua điểm await nào, và dữ liệu bên trong không thể
        // ở trạng thái dở dang, nên khôi phục thẳng khi lock bị poison.
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Chèn nếu chưa có, có rồi thì chỉ làm mới mốc thời gian.
    /// Trả về `true` khi phần tử là mới.
    pub fn upsert(&self, value: T, now: i64) -> bool {
        let mut entries = self.entries();
        match entries.iter().position(|entry| entry.value == value) {
            Some(index) => {
                entries[index].stamped_at = now;
                false
            }
            None => {
                entries.push(Stamped {
                    value,
                    stamped_at: now,
                });
                true
            }
        }
    }

    /// Chèn vào cuối, không kiểm tra trùng.
    pub fn append(&self, value: T, now: i64) {
        self.entries().push(Stamped {
            value,
            stamped_at: now,
        });
    }

    /// Gỡ và trả về mọi phần tử đã quá hạn, trong một lượt giữ lock duy nhất:
    /// mỗi phần tử chỉ được đọc mốc thời gian đúng một lần cho một lượt quét,
    /// không thể vừa bị gỡ ở đây vừa được trả ở `drain`.
    pub fn take_expired(&self, now: i64) -> Vec<T> {
        let mut entries = self.entries();
        let mut kept = Vec::with_capacity(entries.len());
        let mut expired = Vec::new();
        for entry in entries.drain(..) {
            if now - entry.stamped_at > self.ttl_ms {
                expired.push(entry.value);
            } else {
                kept.push(entry);
            }
        }
        *entries = kept;
        expired
    }

    /// Gỡ và trả về toàn bộ, theo đúng thứ tự chèn.
    pub fn drain(&self) -> Vec<T> {
        self.entries()
            .drain(..)
            .map(|entry| entry.value)
            .collect()
    }

    /// Bản chụp hiện tại để hiển thị; gọi song song với upsert/quét đều an toàn.
    pub fn snapshot(&self) -> Vec<T> {
        self.entries()
            .iter()
            .map(|entry| entry.value.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_refreshes_without_duplicating() {
        let store = ExpiringStore::new(5000);
        assert!(store.upsert("peer", 1000));
        assert!(!store.upsert("peer", 2000));
        assert_eq!(store.len(), 1);

        // Mốc mới 2000 giữ phần tử sống qua lượt quét tại 6500.
        assert!(store.take_expired(6500).is_empty());
        assert_eq!(store.take_expired(7001), vec!["peer"]);
        assert!(store.is_empty());
    }

    #[test]
    fn expiry_is_strictly_greater_than_ttl() {
        let store = ExpiringStore::new(5000);
        store.upsert("peer", 0);
        // Đúng bằng TTL thì chưa hết hạn.
        assert!(store.take_expired(5000).is_empty());
        assert_eq!(store.take_expired(5001), vec!["peer"]);
    }

    #[test]
    fn append_keeps_duplicates_and_order() {
        let store = ExpiringStore::new(1000);
        store.append("a".to_string(), 0);
        store.append("b".to_string(), 10);
        store.append("a".to_string(), 20);
        assert_eq!(store.len(), 3);
        assert_eq!(store.drain(), vec!["a", "b", "a"]);
        assert!(store.is_empty());
    }

    #[test]
    fn take_expired_only_removes_old_entries() {
        let store = ExpiringStore::new(1000);
        store.append("old", 0);
        store.append("fresh", 900);
        assert_eq!(store.take_expired(1500), vec!["old"]);
        assert_eq!(store.snapshot(), vec!["fresh"]);
    }

    #[test]
    fn snapshot_does_not_consume() {
        let store = ExpiringStore::new(1000);
        store.upsert("peer", 0);
        assert_eq!(store.snapshot(), vec!["peer"]);
        assert_eq!(store.len(), 1);
    }
}
