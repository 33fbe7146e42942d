use std::time::{SystemTime, UNIX_EPOCH};

/// 时间来源，返回 Unix 毫秒
///
/// 生产环境使用 [`SystemClock`]；测试中可替换为
/// [`ManualClock`](crate::testing::ManualClock) 以精确控制消息年龄。
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// 系统时钟
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}
