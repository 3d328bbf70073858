// ==========================================
// 跨境电商数据中台 - 字段映射与货币标准化引擎
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 导入管道的表头解析与金额换算核心
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 字段字典 / 汇率缓存
pub mod repository;

// 引擎层 - 匹配 / 标准化 / 换算
pub mod engine;

// 导入层 - 文件表头映射
pub mod importer;

// 配置层 - 汇率提供方与覆写
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DimensionRule, MatchMethod, RateSource};

// 领域实体
pub use domain::{
    ConversionRecord, ExchangeRate, FieldDictionaryEntry, MatchResult, MatchSummary, RatePair,
};

// 引擎
pub use engine::{
    CurrencyConverter, CurrencyExtractor, CurrencyNormalizer, DictionaryCache, EngineError,
    EngineResult, PatternMatcher, RateProvider,
};

// 仓储
pub use repository::{
    ExchangeRateStore, FieldDictionaryStore, SqliteExchangeRateRepository,
    SqliteFieldDictionaryRepository,
};

// 导入
pub use importer::{HeaderMapper, HeaderMappingReport};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "跨境电商数据中台 - 字段映射引擎";
