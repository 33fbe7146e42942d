//! 记忆配置加载
//!
//! 支持两种来源：
//!
//! - YAML 文件：[`MemoryConfig::load`]，缺省字段取默认值
//! - 环境变量：[`MemoryConfig::from_env`]，会先加载 `.env`
//!
//! ```text
//! ECHO_MEMORY_CAPACITY=50
//! ECHO_MEMORY_DEFAULT_LIMIT=10
//! ECHO_MEMORY_THRESHOLD=0.1
//! ```

use crate::error::{ConfigError, MemoryError, Result};
use crate::memory::extract::TopicTable;
use crate::memory::scoring::{DEFAULT_DECAY_WINDOW_HOURS, ScoringWeights};
use dotenv::dotenv;
use serde::{Deserialize, Serialize};

const ENV_PREFIX: &str = "ECHO_MEMORY_";

/// 记忆缓冲区的完整配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    /// 最大消息条数，须 >= 1
    pub capacity: i64,
    /// 检索未指定 limit 时的默认返回条数
    pub default_limit: usize,
    /// 最低相关度，得分不超过该值的消息不会出现在检索结果中
    pub relevance_threshold: f64,
    pub weights: ScoringWeights,
    /// 年龄因子的线性衰减窗口（小时）
    pub decay_window_hours: f64,
    pub topics: TopicTable,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            default_limit: 10,
            relevance_threshold: 0.1,
            weights: ScoringWeights::default(),
            decay_window_hours: DEFAULT_DECAY_WINDOW_HOURS,
            topics: TopicTable::default(),
        }
    }
}

impl MemoryConfig {
    pub fn with_capacity(capacity: i64) -> Self {
        Self {
            capacity,
            ..Self::default()
        }
    }

    /// 从 YAML 文件读取配置并校验
    pub fn load(path: &str) -> Result<Self> {
        let file =
            std::fs::File::open(path).map_err(|_| ConfigError::FileNotFound(path.to_string()))?;
        let config: MemoryConfig = serde_yaml::from_reader(file)?;
        config.validate()?;
        Ok(config)
    }

    /// 以默认值为基础，应用 `ECHO_MEMORY_*` 环境变量
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        let mut config = Self::default();
        config.apply_env_overrides(std::env::vars())?;
        config.validate()?;
        Ok(config)
    }

    /// 应用 `ECHO_MEMORY_*` 形式的键值对，其余键忽略
    pub fn apply_env_overrides(
        &mut self,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<()> {
        for (key, value) in vars {
            let Some(suffix) = key.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let malformed = || ConfigError::EnvFormatError {
                key: key.clone(),
                value: value.clone(),
            };
            match suffix {
                "CAPACITY" => self.capacity = value.trim().parse().map_err(|_| malformed())?,
                "DEFAULT_LIMIT" => {
                    self.default_limit = value.trim().parse().map_err(|_| malformed())?
                }
                "THRESHOLD" => {
                    self.relevance_threshold = value.trim().parse().map_err(|_| malformed())?
                }
                "DECAY_WINDOW_HOURS" => {
                    self.decay_window_hours = value.trim().parse().map_err(|_| malformed())?
                }
                _ => tracing::debug!(key = %key, "忽略未知的记忆配置项"),
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity < 1 {
            return Err(MemoryError::InvalidCapacity(self.capacity).into());
        }
        if self.default_limit == 0 {
            return Err(invalid("default_limit", "must be at least 1"));
        }
        if !(0.0..1.0).contains(&self.relevance_threshold) {
            return Err(invalid("relevance_threshold", "must lie in [0, 1)"));
        }
        if !(self.decay_window_hours.is_finite() && self.decay_window_hours > 0.0) {
            return Err(invalid("decay_window_hours", "must be a positive number"));
        }
        self.weights.validate()?;
        Ok(())
    }
}

fn invalid(field: &str, message: &str) -> crate::error::EchoError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        message: message.to_string(),
    }
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EchoError;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = MemoryConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.weights, ScoringWeights::default());
        assert_eq!(config.relevance_threshold, 0.1);
    }

    #[test]
    fn test_yaml_partial_uses_defaults() {
        let yaml = r#"
capacity: 3
weights:
  entity: 0.4
  topic: 0.2
  text: 0.3
  recency: 0.1
topics:
  sales: [ventas]
"#;
        let config: MemoryConfig = serde_yaml::from_str(yaml).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.capacity, 3);
        assert_eq!(config.default_limit, 10);
        assert_eq!(config.weights.entity, 0.4);
        assert_eq!(config.topics.topics().collect::<Vec<_>>(), vec!["sales"]);
    }

    #[test]
    fn test_invalid_capacity_rejected() {
        for capacity in [0, -1] {
            let err = MemoryConfig::with_capacity(capacity).validate().unwrap_err();
            assert!(matches!(
                err,
                EchoError::Memory(MemoryError::InvalidCapacity(c)) if c == capacity
            ));
        }
    }

    #[test]
    fn test_bad_weights_rejected() {
        let mut config = MemoryConfig::default();
        config.weights.text = 0.9;
        assert!(matches!(
            config.validate(),
            Err(EchoError::Config(ConfigError::InvalidValue { .. }))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = MemoryConfig::default();
        config
            .apply_env_overrides(vars(&[
                ("ECHO_MEMORY_CAPACITY", "7"),
                ("ECHO_MEMORY_THRESHOLD", " 0.2 "),
                ("ECHO_MEMORY_SOMETHING_ELSE", "x"),
                ("PATH", "/usr/bin"),
            ]))
            .unwrap();
        assert_eq!(config.capacity, 7);
        assert_eq!(config.relevance_threshold, 0.2);
        assert_eq!(config.default_limit, 10);
    }

    #[test]
    fn test_env_override_malformed() {
        let mut config = MemoryConfig::default();
        let err = config
            .apply_env_overrides(vars(&[("ECHO_MEMORY_CAPACITY", "many")]))
            .unwrap_err();
        assert!(matches!(
            err,
            EchoError::Config(ConfigError::EnvFormatError { key, .. }) if key == "ECHO_MEMORY_CAPACITY"
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let err = MemoryConfig::load("/definitely/not/here.yaml").unwrap_err();
        assert!(matches!(err, EchoError::Config(ConfigError::FileNotFound(_))));
    }
}
