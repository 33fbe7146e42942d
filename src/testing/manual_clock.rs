use crate::memory::Clock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// 手动推进的时钟，起点由调用方指定（Unix 毫秒）
///
/// 可通过 `Arc<ManualClock>` 在测试代码与记忆实例之间共享。
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(start_millis),
        }
    }

    /// 向前推进指定时长
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set(&self, millis: u64) {
        self.now.store(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}
