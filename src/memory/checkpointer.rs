//! 记忆状态持久化（Checkpointer）
//!
//! 每个 `session_id` 只保留最近一次保存的 [`MemoryState`]：消息本身加上
//! 容量、下一个 ID、累计写入与淘汰计数。另一进程用
//! [`BoundedConversationMemory::restore`] 即可还原同一份记忆，`/stats` 的计数也一并延续。
//!
//! ```rust,no_run
//! use echo_memory::memory::{BoundedConversationMemory, Checkpointer, FileCheckpointer, Role};
//!
//! # async fn example() -> echo_memory::error::Result<()> {
//! let cp = FileCheckpointer::new("~/.echo-memory/checkpoints.json")?;
//! let mut memory = BoundedConversationMemory::new(50)?;
//! memory.add_message(Role::User, "Ana prefiere el tema oscuro");
//! cp.save("alice-session-1", memory.export_state()).await?;
//!
//! if let Some(checkpoint) = cp.load("alice-session-1").await? {
//!     let memory = BoundedConversationMemory::restore(
//!         BoundedConversationMemory::builder(50),
//!         checkpoint.state,
//!     )?;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! [`BoundedConversationMemory::restore`]: crate::memory::BoundedConversationMemory::restore

use crate::error::{MemoryError, Result};
use crate::memory::buffer::MemoryState;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

/// 某个会话最近一次保存的记忆状态
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub session_id: String,
    /// 每次保存生成的新 UUID v4
    pub checkpoint_id: String,
    /// 保存时间（Unix 秒）
    pub saved_at: u64,
    pub state: MemoryState,
}

impl Checkpoint {
    pub fn new(session_id: &str, state: MemoryState) -> Self {
        Self {
            session_id: session_id.to_string(),
            checkpoint_id: uuid::Uuid::new_v4().to_string(),
            saved_at: now_secs(),
            state,
        }
    }
}

/// 记忆状态的持久化接口
#[async_trait]
pub trait Checkpointer: Send + Sync {
    /// 保存会话状态并覆盖旧快照，返回新快照 ID
    async fn save(&self, session_id: &str, state: MemoryState) -> Result<String>;

    /// 读取会话最近一次保存的快照
    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>>;

    /// 删除会话快照，返回此前是否存在
    async fn remove(&self, session_id: &str) -> Result<bool>;
}

/// 文件内容，按会话名排序以便 diff
#[derive(Debug, Default, Serialize, Deserialize)]
struct CheckpointFile {
    sessions: BTreeMap<String, Checkpoint>,
}

/// 基于 JSON 文件的 Checkpointer
///
/// 读操作走内存缓存；每次写操作先写临时文件再原子替换，
/// 进程中途退出不会留下半份 JSON。
///
/// ```json
/// {
///   "sessions": {
///     "alice-session-1": {
///       "session_id": "alice-session-1",
///       "checkpoint_id": "…",
///       "saved_at": 1700000000,
///       "state": { "capacity": 50, "next_id": 2, "total_added": 1, "evicted": 0, "messages": [ … ] }
///     }
///   }
/// }
/// ```
pub struct FileCheckpointer {
    path: PathBuf,
    data: RwLock<CheckpointFile>,
}

impl FileCheckpointer {
    /// 打开或创建 checkpoint 文件，自动创建父目录
    ///
    /// 已有文件无法解析时，先改名为 `<文件名>.corrupt-<unix 秒>` 保留原内容，
    /// 再以空状态启动。
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = expand_tilde(path.as_ref());
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| MemoryError::IoError(format!("创建目录失败: {e}")))?;
        }
        let data = if path.exists() {
            let raw = std::fs::read_to_string(&path)
                .map_err(|e| MemoryError::IoError(format!("读取 checkpoint 文件失败: {e}")))?;
            match serde_json::from_str::<CheckpointFile>(&raw) {
                Ok(file) => file,
                Err(e) => {
                    let backup = quarantine(&path)?;
                    warn!(
                        backup = %backup.display(),
                        "⚠️ Checkpoint 文件解析失败，已备份并从空状态开始: {e}"
                    );
                    CheckpointFile::default()
                }
            }
        } else {
            CheckpointFile::default()
        };
        info!(path = %path.display(), sessions = data.sessions.len(), "🗂️ FileCheckpointer 初始化");
        Ok(Self {
            path,
            data: RwLock::new(data),
        })
    }

    async fn flush(&self, data: &CheckpointFile) -> Result<()> {
        let json = serde_json::to_string_pretty(data)?;
        let tmp = sibling(&self.path, "tmp");
        tokio::fs::write(&tmp, json)
            .await
            .map_err(|e| MemoryError::IoError(format!("写入 checkpoint 文件失败: {e}")))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| MemoryError::IoError(format!("替换 checkpoint 文件失败: {e}")))?;
        debug!(path = %self.path.display(), "💾 Checkpoint 已持久化");
        Ok(())
    }
}

#[async_trait]
impl Checkpointer for FileCheckpointer {
    async fn save(&self, session_id: &str, state: MemoryState) -> Result<String> {
        let checkpoint = Checkpoint::new(session_id, state);
        let checkpoint_id = checkpoint.checkpoint_id.clone();
        info!(
            session_id = %session_id,
            checkpoint_id = %checkpoint_id,
            messages = checkpoint.state.messages.len(),
            "🔖 保存记忆状态"
        );
        // 持有写锁直到落盘，保证文件内容与写入顺序一致
        let mut data = self.data.write().await;
        data.sessions.insert(session_id.to_string(), checkpoint);
        self.flush(&data).await?;
        Ok(checkpoint_id)
    }

    async fn load(&self, session_id: &str) -> Result<Option<Checkpoint>> {
        Ok(self.data.read().await.sessions.get(session_id).cloned())
    }

    async fn remove(&self, session_id: &str) -> Result<bool> {
        let mut data = self.data.write().await;
        if data.sessions.remove(session_id).is_none() {
            return Ok(false);
        }
        self.flush(&data).await?;
        info!(session_id = %session_id, "🗑️ 会话快照已删除");
        Ok(true)
    }
}

// ── 私有工具函数 ──────────────────────────────────────────────────────────────

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// 同目录下、文件名追加 `.{suffix}` 的路径
fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}

/// 把无法解析的文件改名保留，返回备份路径
fn quarantine(path: &Path) -> Result<PathBuf> {
    let backup = sibling(path, &format!("corrupt-{}", now_secs()));
    std::fs::rename(path, &backup)
        .map_err(|e| MemoryError::IoError(format!("备份损坏的 checkpoint 文件失败: {e}")))?;
    Ok(backup)
}

fn expand_tilde(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/")
        && let Some(home) = std::env::var("HOME")
            .ok()
            .or_else(|| std::env::var("USERPROFILE").ok())
    {
        return PathBuf::from(home).join(rest);
    }
    path.to_path_buf()
}
