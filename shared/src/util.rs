/// 获取当前 UTC 时间戳（毫秒）
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Minutes to milliseconds, saturating.
pub fn minutes_to_millis(minutes: u64) -> i64 {
    i64::try_from(minutes.saturating_mul(60_000)).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes_to_millis() {
        assert_eq!(minutes_to_millis(0), 0);
        assert_eq!(minutes_to_millis(15), 900_000);
        assert_eq!(minutes_to_millis(u64::MAX), i64::MAX);
    }
}
