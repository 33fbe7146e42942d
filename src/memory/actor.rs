//! 跨任务共享记忆的 actor 句柄
//!
//! [`BoundedConversationMemory`] 本身是单线程同步结构。需要被多个 task 共享时，
//! 由 [`MemoryHandle::spawn`] 把它移入一个独占的后台 task，调用方通过 channel
//! 发送请求、经 oneshot 接收结果。每个请求在 actor 内完整执行后才处理下一个，
//! 因此任何调用方都不会观察到「淘汰了一半」的中间状态。
//!
//! ```rust
//! use echo_memory::memory::{BoundedConversationMemory, MemoryHandle, Role};
//!
//! # #[tokio::main]
//! # async fn main() -> echo_memory::error::Result<()> {
//! let handle = MemoryHandle::spawn(BoundedConversationMemory::new(10)?);
//! let writer = handle.clone();
//! tokio::spawn(async move {
//!     writer.add_message(Role::User, "Ana joined the team").await
//! })
//! .await
//! .expect("writer task")?;
//!
//! let hits = handle.search("Ana", None).await?;
//! assert_eq!(hits.len(), 1);
//! # Ok(())
//! # }
//! ```

use crate::error::{MemoryError, Result};
use crate::memory::buffer::{BoundedConversationMemory, MemoryState, MemoryStats, SearchHit};
use crate::memory::message::{Message, NewMessage, Role};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

/// 请求队列深度
const REQUEST_BUFFER: usize = 64;

enum Request {
    Add {
        message: NewMessage,
        reply: oneshot::Sender<Message>,
    },
    Search {
        query: String,
        limit: Option<usize>,
        reply: oneshot::Sender<Result<Vec<SearchHit>>>,
    },
    Size {
        reply: oneshot::Sender<usize>,
    },
    Snapshot {
        reply: oneshot::Sender<Vec<Message>>,
    },
    Stats {
        reply: oneshot::Sender<MemoryStats>,
    },
    ExportState {
        reply: oneshot::Sender<MemoryState>,
    },
}

/// 记忆 actor 的可克隆句柄
///
/// 所有句柄被 drop 后，后台 task 自动退出。
#[derive(Clone)]
pub struct MemoryHandle {
    tx: mpsc::Sender<Request>,
}

impl MemoryHandle {
    /// 将记忆移入后台 task；须在 tokio 运行时内调用
    pub fn spawn(memory: BoundedConversationMemory) -> Self {
        let (tx, rx) = mpsc::channel(REQUEST_BUFFER);
        tokio::spawn(run(memory, rx));
        Self { tx }
    }

    pub async fn add_message(&self, role: Role, content: impl Into<String>) -> Result<Message> {
        self.add_message_with(NewMessage::new(role, content)).await
    }

    pub async fn add_message_with(&self, message: NewMessage) -> Result<Message> {
        self.call(|reply| Request::Add { message, reply }).await
    }

    pub async fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let query = query.to_string();
        self.call(|reply| Request::Search {
            query,
            limit,
            reply,
        })
        .await?
    }

    pub async fn size(&self) -> Result<usize> {
        self.call(|reply| Request::Size { reply }).await
    }

    pub async fn snapshot(&self) -> Result<Vec<Message>> {
        self.call(|reply| Request::Snapshot { reply }).await
    }

    pub async fn stats(&self) -> Result<MemoryStats> {
        self.call(|reply| Request::Stats { reply }).await
    }

    /// 导出完整状态，供 checkpoint 持久化
    pub async fn export_state(&self) -> Result<MemoryState> {
        self.call(|reply| Request::ExportState { reply }).await
    }

    async fn call<T>(&self, build: impl FnOnce(oneshot::Sender<T>) -> Request) -> Result<T> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(build(reply))
            .await
            .map_err(|_| MemoryError::Closed)?;
        Ok(rx.await.map_err(|_| MemoryError::Closed)?)
    }
}

async fn run(mut memory: BoundedConversationMemory, mut rx: mpsc::Receiver<Request>) {
    info!(capacity = memory.capacity(), "🚀 记忆 actor 已启动");
    while let Some(request) = rx.recv().await {
        // 调用方可能已放弃等待，回复失败直接忽略
        match request {
            Request::Add { message, reply } => {
                let _ = reply.send(memory.add_message_with(message));
            }
            Request::Search {
                query,
                limit,
                reply,
            } => {
                let _ = reply.send(memory.search(&query, limit));
            }
            Request::Size { reply } => {
                let _ = reply.send(memory.size());
            }
            Request::Snapshot { reply } => {
                let _ = reply.send(memory.snapshot());
            }
            Request::Stats { reply } => {
                let _ = reply.send(memory.stats());
            }
            Request::ExportState { reply } => {
                let _ = reply.send(memory.export_state());
            }
        }
    }
    debug!(size = memory.size(), "记忆 actor 已退出");
}
