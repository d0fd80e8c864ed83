use chrono::{DateTime, FixedOffset, NaiveDate, Offset, Utc};
use std::sync::RwLock;

/// 印度标准时间相对 UTC 的偏移秒数 (+05:30)。
const IST_OFFSET_SECS: i32 = 5 * 3600 + 30 * 60;

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 扫描日期、回溯窗口与报告时间戳都必须通过此接口获取当前时间。
pub trait TimeProvider: Send + Sync {
    /// 获取当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// # Summary
/// 真实时钟，直接返回操作系统当前时间。
pub struct RealTimeProvider;

impl TimeProvider for RealTimeProvider {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// # Summary
/// 测试专用虚拟时钟，允许主动拨快或回退时间。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 提供线程安全的读写。
pub struct FakeClockProvider {
    current_time: RwLock<DateTime<Utc>>,
}

impl FakeClockProvider {
    /// 使用指定的初始时间创建虚拟时钟
    pub fn new(initial_time: DateTime<Utc>) -> Self {
        Self {
            current_time: RwLock::new(initial_time),
        }
    }

    /// 强制修改时钟的当前时间
    pub fn set_time(&self, new_time: DateTime<Utc>) {
        let mut time = self
            .current_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *time = new_time;
    }
}

impl TimeProvider for FakeClockProvider {
    fn now(&self) -> DateTime<Utc> {
        *self
            .current_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// 交易所本地时区 (IST)。
pub fn exchange_offset() -> FixedOffset {
    // 偏移量为常量且在合法范围内，east_opt 不会返回 None
    FixedOffset::east_opt(IST_OFFSET_SECS).unwrap_or_else(|| Utc.fix())
}

/// 将 UTC 时间转换到交易所本地时间。
pub fn to_exchange_time(time: DateTime<Utc>) -> DateTime<FixedOffset> {
    time.with_timezone(&exchange_offset())
}

/// 交易所本地日期，即“今天”的交易日。
pub fn exchange_date(time: DateTime<Utc>) -> NaiveDate {
    to_exchange_time(time).date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_exchange_date_rolls_over_before_utc_midnight() {
        // 19:00 UTC 已经是 IST 次日 00:30
        let t = Utc.with_ymd_and_hms(2026, 3, 9, 19, 0, 0).unwrap();
        assert_eq!(exchange_date(t), NaiveDate::from_ymd_opt(2026, 3, 10).unwrap());
    }

    #[test]
    fn test_fake_clock_can_be_moved() {
        let start = Utc.with_ymd_and_hms(2026, 3, 9, 4, 0, 0).unwrap();
        let clock = FakeClockProvider::new(start);
        assert_eq!(clock.now(), start);

        let later = start + chrono::Duration::days(1);
        clock.set_time(later);
        assert_eq!(clock.now(), later);
    }
}
