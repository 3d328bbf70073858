// ==========================================
// 跨境电商数据中台 - 数据仓储层
// ==========================================
// 职责: 字段字典与汇率缓存的存储接口及 SQLite 实现
// 红线: Repository 不含业务逻辑
// ==========================================

pub mod error;
pub mod exchange_rate_repo;
pub mod field_dictionary_repo;

// 重导出
pub use error::{RepositoryError, RepositoryResult};
pub use exchange_rate_repo::{ExchangeRateStore, SqliteExchangeRateRepository};
pub use field_dictionary_repo::{FieldDictionaryStore, SqliteFieldDictionaryRepository};
