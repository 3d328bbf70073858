// ==========================================
// 跨境电商数据中台 - 引擎层错误类型
// ==========================================
// 工具: thiserror 派生宏
// 红线: 仅存储不可用向调用方抛出；
//       货币无法识别/模式无效/未匹配/汇率获取失败均在本地降级处理
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

/// 引擎层错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("字段字典存储不可用: {0}")]
    DictionaryStore(#[source] RepositoryError),

    #[error("汇率存储不可用: {0}")]
    RateStore(#[source] RepositoryError),

    #[error("引擎配置错误: {0}")]
    Config(String),
}

impl From<regex::Error> for EngineError {
    fn from(err: regex::Error) -> Self {
        EngineError::Config(err.to_string())
    }
}

/// Result 类型别名
pub type EngineResult<T> = Result<T, EngineError>;
