// ==========================================
// 跨境电商数据中台 - 配置层错误类型
// ==========================================
// 工具: thiserror 派生宏
// ==========================================

use thiserror::Error;

/// 配置层错误类型
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("配置文件读取失败 ({path}): {message}")]
    FileReadError { path: String, message: String },

    #[error("配置文件解析失败: {0}")]
    YamlParseError(#[from] serde_yaml::Error),

    #[error("配置存储访问失败: {0}")]
    DatabaseError(#[from] rusqlite::Error),

    #[error("配置存储锁获取失败: {0}")]
    LockError(String),

    #[error("配置值格式错误 (key: {key}, value: {value}): {message}")]
    ConfigValueError {
        key: String,
        value: String,
        message: String,
    },
}

/// Result 类型别名
pub type ConfigResult<T> = Result<T, ConfigError>;
