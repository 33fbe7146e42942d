//! Mock 相似度打分器，用于验证 [`SimilarityScorer`] 插槽被正确调用。

use crate::memory::SimilarityScorer;
use std::sync::{Arc, Mutex};

/// 始终返回固定分数，并记录每次调用的 `(query, content)`
#[derive(Debug, Clone)]
pub struct MockScorer {
    score: f64,
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl MockScorer {
    pub fn new(score: f64) -> Self {
        Self {
            score,
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// 已发生的调用总次数
    pub fn call_count(&self) -> usize {
        self.calls.lock().map(|c| c.len()).unwrap_or(0)
    }

    /// 所有历史调用（按时序排列）
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl SimilarityScorer for MockScorer {
    fn similarity(&self, query: &str, content: &str) -> f64 {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push((query.to_string(), content.to_string()));
        }
        self.score
    }
}
