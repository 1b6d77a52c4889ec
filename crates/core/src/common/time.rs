use chrono::{DateTime, FixedOffset, Offset, Utc};
use std::sync::RwLock;

/// 默认采集时区偏移：UTC+3:30。
pub const DEFAULT_CAPTURE_OFFSET_SECS: i32 = 3 * 3600 + 30 * 60;

/// 采集时间戳的文本格式，字典序即时间序。
pub const CAPTURE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// # Summary
/// 时间供给器接口，用于隔离物理系统时钟。
/// 归一化阶段的采集时间必须通过此接口获取。
pub trait TimeProvider: Send + Sync {
    /// 获取当前挂载的时间
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
/// 测试专用虚拟时钟，允许主动拨动时间。
///
/// # Invariants
/// - 并发安全：内部利用 `RwLock` 提供读写权限；锁中毒时沿用中毒前的值。
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

/// # Summary
/// 将秒级偏移转换为固定时区。
///
/// # Logic
/// 1. 偏移量超出 ±24h 时退化为 UTC，并记录警告。
///
/// # Arguments
/// * `secs`: 相对 UTC 的东向偏移秒数。
///
/// # Returns
/// 返回 `FixedOffset`。
pub fn capture_offset(secs: i32) -> FixedOffset {
    FixedOffset::east_opt(secs).unwrap_or_else(|| {
        tracing::warn!("Invalid capture offset {}s, falling back to UTC", secs);
        Utc.fix()
    })
}

/// 按采集时区格式化时间戳，例如 `2026-02-01 13:30:00`。
pub fn format_capture_time(ts: &DateTime<FixedOffset>) -> String {
    ts.format(CAPTURE_TIME_FORMAT).to_string()
}
