//! 记忆中的消息记录

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fmt;

/// 消息 ID，插入时按单调递增分配
pub type MessageId = u64;

/// 消息来源标记，仅用于展示，不影响任何行为
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Agent,
    System,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::User => "user",
            Role::Agent => "agent",
            Role::System => "system",
        };
        f.write_str(s)
    }
}

/// 已写入记忆的一条消息
///
/// 除 `importance` 外全部字段在插入时确定，之后不再修改。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub role: Role,
    pub content: String,
    /// 插入时间（Unix 毫秒）
    pub created_at: u64,
    /// 插入时从 `content` 抽取的实体
    pub entities: BTreeSet<String>,
    /// 插入时按关键词表判定的主题
    pub topics: BTreeSet<String>,
    /// 重要度，取值 [0, 1]
    pub importance: f64,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

/// 写入请求：`add_message_with` 的参数
///
/// ```rust
/// use echo_memory::memory::{NewMessage, Role};
///
/// let req = NewMessage::new(Role::User, "Ana prefiere el tema oscuro")
///     .importance(0.8)
///     .metadata(serde_json::json!({ "channel": "web" }));
/// ```
#[derive(Debug, Clone)]
pub struct NewMessage {
    pub(crate) role: Role,
    pub(crate) content: String,
    pub(crate) importance: f64,
    pub(crate) metadata: Value,
}

impl NewMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            importance: 1.0,
            metadata: Value::Null,
        }
    }

    /// 设置重要度，超出 [0, 1] 的值会被截断
    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = clamp_importance(importance);
        self
    }

    pub fn metadata(mut self, metadata: Value) -> Self {
        self.metadata = metadata;
        self
    }
}

/// 把重要度截断到 [0, 1]，NaN 视为 1.0
pub(crate) fn clamp_importance(importance: f64) -> f64 {
    if importance.is_nan() {
        1.0
    } else {
        importance.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Agent).unwrap();
        assert_eq!(json, "\"agent\"");
        let role: Role = serde_json::from_str("\"system\"").unwrap();
        assert_eq!(role, Role::System);
        assert_eq!(Role::User.to_string(), "user");
    }

    #[test]
    fn test_new_message_clamps_importance() {
        assert_eq!(NewMessage::new(Role::User, "x").importance, 1.0);
        assert_eq!(NewMessage::new(Role::User, "x").importance(1.7).importance, 1.0);
        assert_eq!(NewMessage::new(Role::User, "x").importance(-0.2).importance, 0.0);
        assert_eq!(NewMessage::new(Role::User, "x").importance(f64::NAN).importance, 1.0);
    }

    #[test]
    fn test_message_without_metadata_omits_field() {
        let msg = Message {
            id: 1,
            role: Role::User,
            content: "hola".to_string(),
            created_at: 0,
            entities: BTreeSet::new(),
            topics: BTreeSet::new(),
            importance: 1.0,
            metadata: Value::Null,
        };
        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("metadata").is_none());
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, msg);
    }
}
