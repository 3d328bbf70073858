// ==========================================
// 跨境电商数据中台 - 引擎层
// ==========================================
// 职责: 表头字段匹配、币种标准化、批量货币换算
// 红线: Engine 不拼 SQL，存储访问只经由 repository trait
// ==========================================

pub mod currency_converter;
pub mod currency_extractor;
pub mod currency_normalizer;
pub mod dictionary_cache;
pub mod error;
pub mod pattern_matcher;
pub mod rate_provider;

// 重导出核心引擎
pub use currency_converter::CurrencyConverter;
pub use currency_extractor::CurrencyExtractor;
pub use currency_normalizer::{CurrencyNormalizer, DEFAULT_BASE_CURRENCY};
pub use dictionary_cache::{DictionaryCache, DictionarySnapshot};
pub use error::{EngineError, EngineResult};
pub use pattern_matcher::{PatternMatcher, DEFAULT_FUZZY_THRESHOLD, PATTERN_CONFIDENCE};
pub use rate_provider::{
    build_providers, HttpRateProvider, ProviderError, RateProvider, StaticRateProvider,
};
