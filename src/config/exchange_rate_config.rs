// ==========================================
// 跨境电商数据中台 - 汇率换算配置
// ==========================================
// 来源: config/exchange_rates.yaml（缺失时使用默认值）
// 覆写: ConfigManager::apply_overrides（config_kv 表）
// ==========================================

use crate::config::error::{ConfigError, ConfigResult};
use crate::engine::currency_normalizer::DEFAULT_BASE_CURRENCY;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/exchange_rates.yaml";

// ==========================================
// ExchangeRateConfig - 顶层配置
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ExchangeRateConfig {
    pub providers: Vec<ProviderConfig>,
    pub fallback_strategy: FallbackStrategy,
    pub currencies: CurrencySettings,
    pub fetch: FetchSettings,
}

// ==========================================
// 汇率提供方
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Http,   // HTTP JSON 接口
    Static, // 配置内固定汇率表
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    pub priority: i32, // 升序优先
    pub kind: ProviderKind,
    pub base_url: Option<String>,
    pub api_key_env: Option<String>, // 从环境变量读取 API Key
    pub timeout_secs: u64,
    pub rate_field: String, // 响应 JSON 中的汇率字段（支持 a.b 路径）
    pub rates: Vec<StaticRateEntry>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            priority: 99,
            kind: ProviderKind::Http,
            base_url: None,
            api_key_env: None,
            timeout_secs: 30,
            rate_field: "rate".to_string(),
            rates: Vec::new(),
        }
    }
}

/// 固定汇率条目（date 为空表示任意日期）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticRateEntry {
    pub from: String,
    pub to: String,
    pub rate: Decimal,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

// ==========================================
// 降级策略
// ==========================================

/// 历史汇率回溯天数上限
pub const MAX_HISTORICAL_AGE_DAYS: i64 = 3650;

/// 将回溯天数限制在 [0, MAX_HISTORICAL_AGE_DAYS]
pub fn clamp_max_age_days(days: i64) -> i64 {
    days.clamp(0, MAX_HISTORICAL_AGE_DAYS)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackStrategy {
    pub use_historical_rate: bool,
    pub max_age_days: i64,
    pub alert_on_fallback: bool,
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self {
            use_historical_rate: true,
            max_age_days: 7,
            alert_on_fallback: true,
        }
    }
}

// ==========================================
// 币种与精度
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencySettings {
    pub base_currency: String,
    pub amount_decimal_places: u32,
}

impl Default for CurrencySettings {
    fn default() -> Self {
        Self {
            base_currency: DEFAULT_BASE_CURRENCY.to_string(),
            amount_decimal_places: 2,
        }
    }
}

// ==========================================
// 缺失汇率获取
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchSettings {
    pub max_concurrency: usize, // 1 = 逐对顺序获取
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self { max_concurrency: 1 }
    }
}

impl ExchangeRateConfig {
    /// 从 YAML 文本解析
    pub fn from_yaml_str(raw: &str) -> ConfigResult<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// 从文件加载
    ///
    /// # 返回
    /// - 文件不存在: 默认配置
    /// - 文件不可读或格式错误: Err
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::info!(path = %path.display(), "汇率配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::FileReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_yaml_str(&raw)?;
        tracing::info!(
            path = %path.display(),
            providers = config.providers.len(),
            "汇率配置已加载"
        );
        Ok(config)
    }

    /// 按优先级升序排列的提供方（同优先级保持配置顺序）
    pub fn sorted_providers(&self) -> Vec<&ProviderConfig> {
        let mut providers: Vec<&ProviderConfig> = self.providers.iter().collect();
        providers.sort_by_key(|p| p.priority);
        providers
    }
}
