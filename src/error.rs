use std::fmt;

/// echo-memory 的统一错误类型
#[derive(Debug)]
pub enum EchoError {
    /// 记忆操作错误
    Memory(MemoryError),
    /// 配置错误
    Config(ConfigError),
    /// IO 错误
    Io(std::io::Error),
    /// 其他错误
    Other(String),
}

/// 记忆相关错误
///
/// 核心缓冲区只会产生 `InvalidCapacity`、`InvalidQuery` 与恢复时的 `InvalidState`，
/// 其余变体来自 actor 句柄和 checkpoint 持久化。
#[derive(Debug, Clone, PartialEq)]
pub enum MemoryError {
    /// 容量必须为正整数
    InvalidCapacity(i64),
    /// 检索 query 为空（或仅含空白）
    InvalidQuery,
    /// 持有记忆的 actor 已退出
    Closed,
    /// 读写持久化文件失败
    IoError(String),
    /// 序列化/反序列化失败
    SerializationError(String),
    /// 待恢复的记忆状态自相矛盾
    InvalidState(String),
}

/// 配置错误
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// 配置文件未找到
    FileNotFound(String),
    /// 配置解析失败
    ParseFailed(String),
    /// 配置值无效
    InvalidValue { field: String, message: String },
    /// 环境变量格式错误
    EnvFormatError { key: String, value: String },
}

impl fmt::Display for EchoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EchoError::Memory(e) => write!(f, "Memory Error: {}", e),
            EchoError::Config(e) => write!(f, "Config Error: {}", e),
            EchoError::Io(e) => write!(f, "IO Error: {}", e),
            EchoError::Other(msg) => write!(f, "Error: {}", msg),
        }
    }
}

impl fmt::Display for MemoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MemoryError::InvalidCapacity(n) => {
                write!(f, "Invalid capacity {}: must be at least 1", n)
            }
            MemoryError::InvalidQuery => write!(f, "Search query must not be empty"),
            MemoryError::Closed => write!(f, "Memory actor has shut down"),
            MemoryError::IoError(msg) => write!(f, "IO error: {}", msg),
            MemoryError::SerializationError(msg) => write!(f, "Serialization error: {}", msg),
            MemoryError::InvalidState(msg) => write!(f, "Invalid memory state: {}", msg),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::FileNotFound(path) => write!(f, "Config file not found: {}", path),
            ConfigError::ParseFailed(msg) => write!(f, "Failed to parse config: {}", msg),
            ConfigError::InvalidValue { field, message } => {
                write!(f, "Invalid config value for '{}': {}", field, message)
            }
            ConfigError::EnvFormatError { key, value } => {
                write!(f, "Malformed environment variable {}={}", key, value)
            }
        }
    }
}

impl std::error::Error for EchoError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EchoError::Io(e) => Some(e),
            EchoError::Memory(e) => Some(e),
            EchoError::Config(e) => Some(e),
            EchoError::Other(_) => None,
        }
    }
}

impl std::error::Error for MemoryError {}
impl std::error::Error for ConfigError {}

// From 转换实现
impl From<std::io::Error> for EchoError {
    fn from(err: std::io::Error) -> Self {
        EchoError::Io(err)
    }
}

impl From<serde_json::Error> for EchoError {
    fn from(err: serde_json::Error) -> Self {
        EchoError::Memory(MemoryError::SerializationError(err.to_string()))
    }
}

impl From<serde_yaml::Error> for EchoError {
    fn from(err: serde_yaml::Error) -> Self {
        EchoError::Config(ConfigError::ParseFailed(err.to_string()))
    }
}

impl From<MemoryError> for EchoError {
    fn from(err: MemoryError) -> Self {
        EchoError::Memory(err)
    }
}

impl From<ConfigError> for EchoError {
    fn from(err: ConfigError) -> Self {
        EchoError::Config(err)
    }
}

// 便捷的 Result 类型别名
pub type Result<T> = std::result::Result<T, EchoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err: EchoError = MemoryError::InvalidCapacity(-1).into();
        assert_eq!(
            err.to_string(),
            "Memory Error: Invalid capacity -1: must be at least 1"
        );

        let err: EchoError = ConfigError::InvalidValue {
            field: "weights".to_string(),
            message: "must sum to 1.0".to_string(),
        }
        .into();
        assert!(err.to_string().contains("'weights'"));
    }

    #[test]
    fn test_yaml_error_maps_to_config() {
        let err = serde_yaml::from_str::<Vec<u32>>("{not: a list").unwrap_err();
        let err: EchoError = err.into();
        assert!(matches!(err, EchoError::Config(ConfigError::ParseFailed(_))));
    }
}
