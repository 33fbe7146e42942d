//! 测试基础设施
//!
//! 让依赖时间与相似度打分的逻辑可以被确定性地测试。
//!
//! | 类型 | 用途 |
//! |------|------|
//! | [`ManualClock`] | 手动推进的时钟，用于测试年龄衰减与阈值截断 |
//! | [`MockScorer`] | 返回固定分数的相似度打分器，并记录调用情况 |
//! | [`InMemoryCheckpointer`] | 不落盘的 [`Checkpointer`](crate::memory::Checkpointer) |
//!
//! # 使用示例
//!
//! ```rust
//! use echo_memory::memory::{BoundedConversationMemory, Role};
//! use echo_memory::testing::ManualClock;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # fn main() -> echo_memory::error::Result<()> {
//! let clock = Arc::new(ManualClock::new(0));
//! let mut memory = BoundedConversationMemory::builder(5)
//!     .clock(clock.clone())
//!     .build()?;
//!
//! memory.add_message(Role::User, "Ana abre el proyecto");
//! clock.advance(Duration::from_secs(48 * 3600));
//!
//! let hits = memory.search("Ana", None)?;
//! assert!(hits[0].breakdown.recency < 1.0);
//! # Ok(())
//! # }
//! ```

mod manual_clock;
mod memory_checkpointer;
mod mock_scorer;

pub use manual_clock::ManualClock;
pub use memory_checkpointer::InMemoryCheckpointer;
pub use mock_scorer::MockScorer;
