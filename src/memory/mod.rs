//! 记忆系统
//!
//! | 组件 | 实现 | 作用 |
//! |------|------|------|
//! | 有界缓冲区 | [`BoundedConversationMemory`] | 固定容量、FIFO 淘汰、增量索引、相关度检索 |
//! | 并发访问 | [`MemoryHandle`] | 单一 actor 独占记忆，调用方经 channel 串行访问 |
//! | 快照持久化 | [`Checkpointer`] / [`FileCheckpointer`] | 跨进程恢复同一份记忆 |
//!
//! ## 写入与检索
//!
//! ```rust
//! use echo_memory::memory::{BoundedConversationMemory, Role};
//!
//! # fn main() -> echo_memory::error::Result<()> {
//! let mut memory = BoundedConversationMemory::new(50)?;
//! memory.add_message(Role::User, "Our team ships the Orion project on Friday");
//! memory.add_message(Role::Agent, "Noted, Orion release is on Friday");
//!
//! for hit in memory.search("When does Orion ship?", Some(3))? {
//!     println!("{:.3} [{}] {}", hit.score, hit.message.role, hit.message.content);
//! }
//! # Ok(())
//! # }
//! ```

pub mod actor;
pub mod buffer;
pub mod checkpointer;
pub mod clock;
pub mod extract;
pub mod index;
pub mod message;
pub mod scoring;

pub use actor::MemoryHandle;
pub use buffer::{BoundedConversationMemory, MemoryBuilder, MemoryState, MemoryStats, SearchHit};
pub use checkpointer::{Checkpoint, Checkpointer, FileCheckpointer};
pub use clock::{Clock, SystemClock};
pub use extract::{TopicTable, extract_entities, tokenize};
pub use message::{Message, MessageId, NewMessage, Role};
pub use scoring::{
    AGE_FACTOR_FLOOR, QueryFeatures, ScoreBreakdown, ScoringWeights, SimilarityScorer,
    SubstringContainment, age_factor,
};
