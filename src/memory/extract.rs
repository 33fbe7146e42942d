//! 实体与主题抽取
//!
//! 两者都是纯函数：结果只依赖输入文本（以及固定的主题关键词表），
//! 每条消息在插入时计算一次，之后不再重新计算。

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// 按非单词字符切分，返回非空片段（保持原有大小写与顺序）
pub fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(|c: char| !is_word_char(c))
        .filter(|s| !s.is_empty())
}

/// 检索用的 query 分词：小写化并去重
pub fn tokenize(text: &str) -> BTreeSet<String> {
    split_words(text).map(str::to_lowercase).collect()
}

/// 首字母大写且长度大于 2 的词视为实体（区分大小写）
///
/// ```rust
/// use echo_memory::memory::extract_entities;
///
/// let entities = extract_entities("Hola, me llamo Ana");
/// assert!(entities.contains("Hola"));
/// assert!(entities.contains("Ana"));
/// assert!(!entities.contains("me"));
/// ```
pub fn extract_entities(text: &str) -> BTreeSet<String> {
    split_words(text)
        .filter(|word| {
            word.chars().next().is_some_and(char::is_uppercase) && word.chars().count() > 2
        })
        .map(String::from)
        .collect()
}

/// 主题关键词表：主题 → 关键词列表
///
/// 任一关键词以子串形式（忽略大小写）出现在文本中，即判定命中该主题。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TopicTable(BTreeMap<String, Vec<String>>);

impl Default for TopicTable {
    fn default() -> Self {
        Self::from_pairs([
            ("technology", &["develop", "code", "program", "software"][..]),
            ("work", &["project", "team", "company", "office"][..]),
            ("personal", &["family", "home", "hobby", "vacation"][..]),
        ])
    }
}

impl TopicTable {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = (&'a str, &'a [&'a str])>) -> Self {
        Self(
            pairs
                .into_iter()
                .map(|(topic, keywords)| {
                    (
                        topic.to_string(),
                        keywords.iter().map(|k| k.to_string()).collect(),
                    )
                })
                .collect(),
        )
    }

    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// 判定文本命中的主题
    pub fn extract_topics(&self, text: &str) -> BTreeSet<String> {
        let lower = text.to_lowercase();
        self.0
            .iter()
            .filter(|(_, keywords)| {
                keywords
                    .iter()
                    .filter(|k| !k.is_empty())
                    .any(|k| lower.contains(&k.to_lowercase()))
            })
            .map(|(topic, _)| topic.clone())
            .collect()
    }
}
