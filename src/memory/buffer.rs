//! 有界对话记忆
//!
//! 固定容量的 FIFO 缓冲区：超出容量时淘汰最早的一条消息，
//! 同时增量维护实体索引与主题索引，并按多维相关度回答检索。
//!
//! 淘汰顺序只看插入先后，与重要度、年龄和检索历史无关；
//! 后三者只影响检索排序。

use crate::config::MemoryConfig;
use crate::error::{MemoryError, Result};
use crate::memory::clock::{Clock, SystemClock};
use crate::memory::extract::{TopicTable, extract_entities};
use crate::memory::index::InvertedIndex;
use crate::memory::message::{Message, MessageId, NewMessage, Role, clamp_importance};
use crate::memory::scoring::{
    QueryFeatures, ScoreBreakdown, ScoringWeights, SimilarityScorer, SubstringContainment,
    score_message,
};
use serde::{Deserialize, Serialize};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::{debug, info};

/// 检索命中的一条结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub message: Message,
    pub score: f64,
    pub breakdown: ScoreBreakdown,
}

/// 记忆当前状态的统计信息
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryStats {
    pub size: usize,
    pub capacity: usize,
    /// 累计写入条数（含已淘汰）
    pub total_added: u64,
    /// 累计淘汰条数
    pub evicted: u64,
    /// 实体索引中的全部实体（排序后）
    pub entities: Vec<String>,
    /// 主题索引中的全部主题（排序后）
    pub topics: Vec<String>,
}

/// 可持久化的记忆状态，由 [`BoundedConversationMemory::export_state`] 导出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryState {
    pub capacity: usize,
    /// 下一条消息将获得的 ID
    pub next_id: MessageId,
    pub total_added: u64,
    pub evicted: u64,
    /// 插入顺序
    pub messages: Vec<Message>,
}

impl MemoryState {
    /// 检查 ID 顺序与计数是否自洽
    fn validate(&self) -> Result<()> {
        if let Some(pair) = self.messages.windows(2).find(|w| w[0].id >= w[1].id) {
            return Err(MemoryError::InvalidState(format!(
                "message ids must be strictly increasing, found {} before {}",
                pair[0].id, pair[1].id
            ))
            .into());
        }
        if let Some(last) = self.messages.last()
            && last.id >= self.next_id
        {
            return Err(MemoryError::InvalidState(format!(
                "next_id {} is not above the newest message id {}",
                self.next_id, last.id
            ))
            .into());
        }
        if self.evicted.checked_add(self.messages.len() as u64) != Some(self.total_added) {
            return Err(MemoryError::InvalidState(format!(
                "total_added {} does not equal evicted {} plus {} live messages",
                self.total_added,
                self.evicted,
                self.messages.len()
            ))
            .into());
        }
        Ok(())
    }
}

/// 有界对话记忆
///
/// # 典型用法
///
/// ```rust
/// use echo_memory::memory::{BoundedConversationMemory, Role};
///
/// # fn main() -> echo_memory::error::Result<()> {
/// let mut memory = BoundedConversationMemory::new(3)?;
/// memory.add_message(Role::User, "Hola, me llamo Ana");
/// memory.add_message(Role::Agent, "Ana trabaja en marketing");
/// memory.add_message(Role::User, "Cuéntame de marketing");
/// memory.add_message(Role::User, "Nuevo tema: ventas");
///
/// assert_eq!(memory.size(), 3);
/// let hits = memory.search("Ana", Some(5))?;
/// assert_eq!(hits[0].message.content, "Ana trabaja en marketing");
/// # Ok(())
/// # }
/// ```
pub struct BoundedConversationMemory {
    capacity: usize,
    messages: VecDeque<Message>,
    entity_index: InvertedIndex,
    topic_index: InvertedIndex,
    next_id: MessageId,
    total_added: u64,
    evicted: u64,
    default_limit: usize,
    threshold: f64,
    weights: ScoringWeights,
    decay_window_hours: f64,
    topics: TopicTable,
    clock: Arc<dyn Clock>,
    scorer: Box<dyn SimilarityScorer>,
}

impl std::fmt::Debug for BoundedConversationMemory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundedConversationMemory")
            .field("capacity", &self.capacity)
            .field("size", &self.messages.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}

impl BoundedConversationMemory {
    /// 以默认配置创建，`capacity < 1` 时返回 `InvalidCapacity`
    pub fn new(capacity: i64) -> Result<Self> {
        Self::builder(capacity).build()
    }

    pub fn builder(capacity: i64) -> MemoryBuilder {
        MemoryBuilder::new(MemoryConfig::with_capacity(capacity))
    }

    pub fn from_config(config: MemoryConfig) -> MemoryBuilder {
        MemoryBuilder::new(config)
    }

    /// 从持久化状态恢复
    ///
    /// 按已存的实体/主题重建索引；容量变小时只保留最新的 `capacity` 条，
    /// 被丢弃的条数计入 `evicted`。累计计数与下一个 ID 原样沿用。
    /// 状态自相矛盾（ID 非严格递增、计数对不上）时返回 `InvalidState`，
    /// 超出 [0, 1] 的重要度会被截断。
    pub fn restore(builder: MemoryBuilder, state: MemoryState) -> Result<Self> {
        state.validate()?;
        let mut memory = builder.build()?;
        let MemoryState {
            capacity: saved_capacity,
            next_id,
            total_added,
            evicted,
            messages,
        } = state;
        if saved_capacity != memory.capacity {
            info!(
                saved_capacity,
                capacity = memory.capacity,
                "记忆容量与快照不同，按新容量恢复"
            );
        }

        let dropped = messages.len().saturating_sub(memory.capacity);
        for mut message in messages.into_iter().skip(dropped) {
            message.importance = clamp_importance(message.importance);
            memory.entity_index.insert(&message.entities, message.id);
            memory.topic_index.insert(&message.topics, message.id);
            memory.messages.push_back(message);
        }
        memory.next_id = next_id;
        memory.total_added = total_added;
        memory.evicted = evicted + dropped as u64;
        info!(
            restored = memory.messages.len(),
            dropped,
            next_id = memory.next_id,
            "♻️ 记忆已从快照恢复"
        );
        Ok(memory)
    }

    /// 导出可持久化的完整状态
    pub fn export_state(&self) -> MemoryState {
        MemoryState {
            capacity: self.capacity,
            next_id: self.next_id,
            total_added: self.total_added,
            evicted: self.evicted,
            messages: self.snapshot(),
        }
    }

    /// 写入一条消息（重要度 1.0），返回写入后的副本
    pub fn add_message(&mut self, role: Role, content: impl Into<String>) -> Message {
        self.add_message_with(NewMessage::new(role, content))
    }

    /// 写入一条消息；超出容量时先淘汰最早的消息并清理其索引，再索引新消息
    pub fn add_message_with(&mut self, request: NewMessage) -> Message {
        let id = self.next_id;
        self.next_id += 1;

        let message = Message {
            id,
            role: request.role,
            entities: extract_entities(&request.content),
            topics: self.topics.extract_topics(&request.content),
            content: request.content,
            created_at: self.clock.now_millis(),
            importance: request.importance,
            metadata: request.metadata,
        };
        self.messages.push_back(message.clone());
        self.total_added += 1;

        if self.messages.len() > self.capacity
            && let Some(oldest) = self.messages.pop_front()
        {
            self.entity_index.remove(&oldest.entities, oldest.id);
            self.topic_index.remove(&oldest.topics, oldest.id);
            self.evicted += 1;
            debug!(evicted_id = oldest.id, "🧹 超出容量，淘汰最早的消息");
        }

        self.entity_index.insert(&message.entities, id);
        self.topic_index.insert(&message.topics, id);

        debug!(
            id,
            role = %message.role,
            entities = message.entities.len(),
            topics = message.topics.len(),
            size = self.messages.len(),
            "📝 消息已写入记忆"
        );
        message
    }

    /// 按相关度检索，不修改任何状态
    ///
    /// `limit` 为 `None` 时使用配置的默认值，最终被截断到 `[1, size()]`。
    /// 结果按得分降序排列，同分时先插入的消息在前。
    pub fn search(&self, query: &str, limit: Option<usize>) -> Result<Vec<SearchHit>> {
        let query = query.trim();
        if query.is_empty() {
            return Err(MemoryError::InvalidQuery.into());
        }
        if self.messages.is_empty() {
            return Ok(vec![]);
        }
        let limit = limit
            .unwrap_or(self.default_limit)
            .clamp(1, self.messages.len());

        let now = self.clock.now_millis();
        let features = QueryFeatures::new(query, &self.topics);
        let mut hits: Vec<SearchHit> = self
            .messages
            .iter()
            .filter_map(|message| {
                let breakdown = score_message(
                    &features,
                    message,
                    now,
                    &self.weights,
                    self.decay_window_hours,
                    self.scorer.as_ref(),
                );
                (breakdown.total > self.threshold).then(|| SearchHit {
                    message: message.clone(),
                    score: breakdown.total,
                    breakdown,
                })
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.message.id.cmp(&b.message.id))
        });
        let candidates = hits.len();
        hits.truncate(limit);

        debug!(query = %query, candidates, returned = hits.len(), "🔍 记忆检索");
        Ok(hits)
    }

    pub fn size(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// 按插入顺序导出全部消息的独立副本
    pub fn snapshot(&self) -> Vec<Message> {
        self.messages.iter().cloned().collect()
    }

    pub fn stats(&self) -> MemoryStats {
        MemoryStats {
            size: self.messages.len(),
            capacity: self.capacity,
            total_added: self.total_added,
            evicted: self.evicted,
            entities: self.entity_index.keys(),
            topics: self.topic_index.keys(),
        }
    }

    /// 通过实体索引查找提到 `entity` 的消息（插入顺序）
    pub fn messages_with_entity(&self, entity: &str) -> Vec<Message> {
        self.collect_ids(self.entity_index.get(entity))
    }

    /// 通过主题索引查找属于 `topic` 的消息（插入顺序）
    pub fn messages_with_topic(&self, topic: &str) -> Vec<Message> {
        self.collect_ids(self.topic_index.get(topic))
    }

    fn collect_ids(&self, ids: Option<&HashSet<MessageId>>) -> Vec<Message> {
        let Some(ids) = ids else {
            return vec![];
        };
        self.messages
            .iter()
            .filter(|m| ids.contains(&m.id))
            .cloned()
            .collect()
    }
}

/// `BoundedConversationMemory` 的构建器
pub struct MemoryBuilder {
    config: MemoryConfig,
    clock: Arc<dyn Clock>,
    scorer: Box<dyn SimilarityScorer>,
}

impl MemoryBuilder {
    fn new(config: MemoryConfig) -> Self {
        Self {
            config,
            clock: Arc::new(SystemClock),
            scorer: Box::new(SubstringContainment),
        }
    }

    /// 替换时间来源（测试中常用 `ManualClock`）
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// 替换文本相似度分量
    pub fn scorer(mut self, scorer: impl SimilarityScorer + 'static) -> Self {
        self.scorer = Box::new(scorer);
        self
    }

    pub fn weights(mut self, weights: ScoringWeights) -> Self {
        self.config.weights = weights;
        self
    }

    pub fn threshold(mut self, threshold: f64) -> Self {
        self.config.relevance_threshold = threshold;
        self
    }

    pub fn topics(mut self, topics: TopicTable) -> Self {
        self.config.topics = topics;
        self
    }

    pub fn build(self) -> Result<BoundedConversationMemory> {
        self.config.validate()?;
        let MemoryConfig {
            capacity,
            default_limit,
            relevance_threshold,
            weights,
            decay_window_hours,
            topics,
        } = self.config;
        let capacity =
            usize::try_from(capacity).map_err(|_| MemoryError::InvalidCapacity(capacity))?;

        info!(capacity, "🧠 有界对话记忆初始化");
        Ok(BoundedConversationMemory {
            capacity,
            messages: VecDeque::with_capacity(capacity.min(1024) + 1),
            entity_index: InvertedIndex::new(),
            topic_index: InvertedIndex::new(),
            next_id: 1,
            total_added: 0,
            evicted: 0,
            default_limit,
            threshold: relevance_threshold,
            weights,
            decay_window_hours,
            topics,
            clock: self.clock,
            scorer: self.scorer,
        })
    }
}
