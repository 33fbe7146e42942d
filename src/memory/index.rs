use crate::memory::message::MessageId;
use std::collections::{HashMap, HashSet};

/// 倒排索引：key → 提到该 key 的消息 ID 集合
///
/// 不变式：不存在映射到空集合的 key。
#[derive(Debug, Default, Clone)]
pub struct InvertedIndex {
    entries: HashMap<String, HashSet<MessageId>>,
}

impl InvertedIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>, id: MessageId) {
        for key in keys {
            self.entries.entry(key.clone()).or_default().insert(id);
        }
    }

    /// 从每个 key 的集合中移除 `id`，集合变空时连同 key 一起删除
    pub fn remove<'a>(&mut self, keys: impl IntoIterator<Item = &'a String>, id: MessageId) {
        for key in keys {
            if let Some(ids) = self.entries.get_mut(key) {
                ids.remove(&id);
                if ids.is_empty() {
                    self.entries.remove(key);
                }
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&HashSet<MessageId>> {
        self.entries.get(key)
    }

    /// 当前所有 key（排序后）
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.keys().cloned().collect();
        keys.sort();
        keys
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 索引中出现过的全部消息 ID
    #[cfg(test)]
    pub(crate) fn ids(&self) -> std::collections::BTreeSet<MessageId> {
        self.entries.values().flatten().copied().collect()
    }

    #[cfg(test)]
    pub(crate) fn has_empty_entries(&self) -> bool {
        self.entries.values().any(HashSet::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn keys(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_insert_and_get() {
        let mut index = InvertedIndex::new();
        index.insert(&keys(&["Ana", "Bob"]), 1);
        index.insert(&keys(&["Ana"]), 2);

        assert_eq!(index.len(), 2);
        assert_eq!(index.get("Ana").map(HashSet::len), Some(2));
        assert_eq!(index.ids(), BTreeSet::from([1, 2]));
    }

    #[test]
    fn test_remove_purges_empty_keys() {
        let mut index = InvertedIndex::new();
        index.insert(&keys(&["Ana", "Bob"]), 1);
        index.insert(&keys(&["Ana"]), 2);

        index.remove(&keys(&["Ana", "Bob"]), 1);
        assert_eq!(index.keys(), keys(&["Ana"]));
        assert!(index.get("Bob").is_none());
        assert!(!index.has_empty_entries());

        index.remove(&keys(&["Ana"]), 2);
        assert!(index.is_empty());
    }

    #[test]
    fn test_remove_unknown_is_noop() {
        let mut index = InvertedIndex::new();
        index.insert(&keys(&["Ana"]), 1);
        index.remove(&keys(&["Zoe"]), 1);
        index.remove(&keys(&["Ana"]), 99);
        assert_eq!(index.get("Ana").map(HashSet::len), Some(1));
    }
}
