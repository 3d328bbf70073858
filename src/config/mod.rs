// ==========================================
// 跨境电商数据中台 - 配置层
// ==========================================
// 职责: 汇率提供方 YAML 配置 + config_kv 覆写
// 存储: config/exchange_rates.yaml, config_kv 表
// ==========================================

pub mod config_manager;
pub mod engine_config_trait;
pub mod error;
pub mod exchange_rate_config;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager};
pub use engine_config_trait::EngineConfigReader;
pub use error::{ConfigError, ConfigResult};
pub use exchange_rate_config::{
    clamp_max_age_days, CurrencySettings, ExchangeRateConfig, FallbackStrategy, FetchSettings,
    ProviderConfig, ProviderKind, StaticRateEntry, MAX_HISTORICAL_AGE_DAYS,
};
