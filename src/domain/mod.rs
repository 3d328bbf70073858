// ==========================================
// 跨境电商数据中台 - 领域模型层
// ==========================================
// 职责: 字段字典、匹配结果、汇率等实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod exchange_rate;
pub mod field_dictionary;
pub mod match_result;
pub mod types;

// 重导出核心类型
pub use exchange_rate::{ConversionRecord, ExchangeRate, RatePair};
pub use field_dictionary::FieldDictionaryEntry;
pub use match_result::{MatchResult, MatchSummary};
pub use types::{DimensionRule, MatchMethod, RateSource};
