pub mod config;
pub mod error;
pub mod memory;
pub mod testing;

pub mod prelude {
    pub use crate::config::MemoryConfig;
    pub use crate::error::Result;
    pub use crate::memory::{
        BoundedConversationMemory, Checkpointer, FileCheckpointer, MemoryHandle, MemoryState,
        Message, NewMessage, Role, SearchHit,
    };
}
