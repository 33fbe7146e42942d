//! 相关度评分
//!
//! 综合得分是四项分量的加权和，权重之和固定为 1.0：
//!
//! | 分量 | 含义 | 默认权重 |
//! |------|------|----------|
//! | entity | query 实体与消息实体的重合比例 | 0.30 |
//! | topic | query 主题与消息主题的重合比例 | 0.25 |
//! | text | query 词在消息正文中出现的比例（可替换为语义相似度） | 0.35 |
//! | recency | `(age_factor + importance) / 2` | 0.10 |

use crate::error::ConfigError;
use crate::memory::extract::{TopicTable, extract_entities, tokenize};
use crate::memory::message::Message;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 年龄因子的下限，消息不会仅因年龄而完全失去相关性
pub const AGE_FACTOR_FLOOR: f64 = 0.1;

/// 默认衰减窗口（小时）
pub const DEFAULT_DECAY_WINDOW_HOURS: f64 = 24.0;

const MILLIS_PER_HOUR: f64 = 3_600_000.0;
const WEIGHT_SUM_EPSILON: f64 = 1e-6;

/// 年龄因子：在衰减窗口内线性下降，下限 0.1
pub fn age_factor(created_at: u64, now: u64, window_hours: f64) -> f64 {
    let age_hours = now.saturating_sub(created_at) as f64 / MILLIS_PER_HOUR;
    (1.0 - age_hours / window_hours).max(AGE_FACTOR_FLOOR)
}

/// 四项分量的权重
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringWeights {
    pub entity: f64,
    pub topic: f64,
    pub text: f64,
    pub recency: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            entity: 0.30,
            topic: 0.25,
            text: 0.35,
            recency: 0.10,
        }
    }
}

impl ScoringWeights {
    /// 每项权重须落在 [0, 1]，且总和为 1.0
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let parts = [
            ("weights.entity", self.entity),
            ("weights.topic", self.topic),
            ("weights.text", self.text),
            ("weights.recency", self.recency),
        ];
        for (field, w) in parts {
            if !(0.0..=1.0).contains(&w) {
                return Err(ConfigError::InvalidValue {
                    field: field.to_string(),
                    message: format!("{w} is outside [0, 1]"),
                });
            }
        }
        let sum = self.entity + self.topic + self.text + self.recency;
        if (sum - 1.0).abs() > WEIGHT_SUM_EPSILON {
            return Err(ConfigError::InvalidValue {
                field: "weights".to_string(),
                message: format!("weights sum to {sum}, expected 1.0"),
            });
        }
        Ok(())
    }
}

/// 可替换的文本相似度分量，返回值应落在 [0, 1]
///
/// 接入真实向量模型时实现此 trait 即可，权重预算保持不变。
pub trait SimilarityScorer: Send + Sync {
    fn similarity(&self, query: &str, content: &str) -> f64;

    /// 检索时的入口，可复用 [`QueryFeatures`] 中已抽取的特征；
    /// 默认直接转发给 [`similarity`](Self::similarity)
    fn similarity_with(&self, query: &QueryFeatures<'_>, content: &str) -> f64 {
        self.similarity(query.text, content)
    }
}

/// 默认实现：query 词（忽略大小写）作为子串出现在正文中的比例
#[derive(Debug, Default, Clone, Copy)]
pub struct SubstringContainment;

impl SubstringContainment {
    fn containment(tokens: &BTreeSet<String>, content: &str) -> f64 {
        if tokens.is_empty() {
            return 0.0;
        }
        let content = content.to_lowercase();
        let matched = tokens
            .iter()
            .filter(|t| content.contains(t.as_str()))
            .count();
        matched as f64 / tokens.len() as f64
    }
}

impl SimilarityScorer for SubstringContainment {
    fn similarity(&self, query: &str, content: &str) -> f64 {
        Self::containment(&tokenize(query), content)
    }

    fn similarity_with(&self, query: &QueryFeatures<'_>, content: &str) -> f64 {
        Self::containment(&query.tokens, content)
    }
}

/// 单条消息的得分明细
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub entity: f64,
    pub topic: f64,
    pub text: f64,
    pub recency: f64,
    /// 加权总分
    pub total: f64,
}

/// 预先抽取好的 query 特征，一次检索内复用
#[derive(Debug, Clone)]
pub struct QueryFeatures<'q> {
    pub text: &'q str,
    /// 小写、去重后的 query 词
    pub tokens: BTreeSet<String>,
    pub entities: BTreeSet<String>,
    pub topics: BTreeSet<String>,
}

impl<'q> QueryFeatures<'q> {
    pub fn new(text: &'q str, topics: &TopicTable) -> Self {
        Self {
            text,
            tokens: tokenize(text),
            entities: extract_entities(text),
            topics: topics.extract_topics(text),
        }
    }
}

fn overlap(query: &BTreeSet<String>, message: &BTreeSet<String>) -> f64 {
    query.intersection(message).count() as f64 / query.len().max(1) as f64
}

/// 按权重计算消息的综合得分
pub fn score_message(
    query: &QueryFeatures<'_>,
    message: &Message,
    now: u64,
    weights: &ScoringWeights,
    window_hours: f64,
    scorer: &dyn SimilarityScorer,
) -> ScoreBreakdown {
    let entity = overlap(&query.entities, &message.entities);
    let topic = overlap(&query.topics, &message.topics);
    let text = scorer.similarity_with(query, &message.content).clamp(0.0, 1.0);
    let recency = (age_factor(message.created_at, now, window_hours) + message.importance) / 2.0;
    let total = entity * weights.entity
        + topic * weights.topic
        + text * weights.text
        + recency * weights.recency;
    ScoreBreakdown {
        entity,
        topic,
        text,
        recency,
        total,
    }
}
