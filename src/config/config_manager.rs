// ==========================================
// 跨境电商数据中台 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::config::error::{ConfigError, ConfigResult};
use crate::config::exchange_rate_config::{
    clamp_max_age_days, ExchangeRateConfig, MAX_HISTORICAL_AGE_DAYS,
};
use crate::db::open_sqlite_connection;
use crate::engine::currency_normalizer::DEFAULT_BASE_CURRENCY;
use crate::engine::pattern_matcher::DEFAULT_FUZZY_THRESHOLD;
use async_trait::async_trait;
use rusqlite::{params, Connection};
use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> ConfigResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| ConfigError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取并解析配置值，格式错误时告警并使用默认值
    fn get_parsed_or_default<T: FromStr>(&self, key: &str, default: T) -> ConfigResult<T> {
        match self.get_config_value(key)? {
            None => Ok(default),
            Some(raw) => match raw.trim().parse::<T>() {
                Ok(v) => Ok(v),
                Err(_) => {
                    tracing::warn!(config_key = key, raw_value = %raw, "配置值格式错误，使用默认值");
                    Ok(default)
                }
            },
        }
    }

    /// 获取所有 global 配置（键有序）
    pub fn get_config_snapshot(&self) -> ConfigResult<BTreeMap<String, String>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ConfigError::LockError(e.to_string()))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut config_map = BTreeMap::new();
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }
        Ok(config_map)
    }

    /// 用 config_kv 中的覆写项合并 YAML 配置
    ///
    /// 未设置的键保持 YAML 原值
    pub async fn apply_overrides(
        &self,
        mut config: ExchangeRateConfig,
    ) -> ConfigResult<ExchangeRateConfig> {
        if let Some(v) = self.get_config_value(config_keys::BASE_CURRENCY)? {
            config.currencies.base_currency = v.trim().to_uppercase();
        }
        config.currencies.amount_decimal_places = self.get_parsed_or_default(
            config_keys::AMOUNT_DECIMAL_PLACES,
            config.currencies.amount_decimal_places,
        )?;
        config.fallback_strategy.max_age_days = clamp_max_age_days(self.get_parsed_or_default(
            config_keys::HISTORICAL_MAX_AGE_DAYS,
            config.fallback_strategy.max_age_days,
        )?);
        config.fallback_strategy.use_historical_rate = self.get_parsed_or_default(
            config_keys::USE_HISTORICAL_RATE,
            config.fallback_strategy.use_historical_rate,
        )?;
        config.fallback_strategy.alert_on_fallback = self.get_parsed_or_default(
            config_keys::ALERT_ON_FALLBACK,
            config.fallback_strategy.alert_on_fallback,
        )?;
        config.fetch.max_concurrency = self
            .get_parsed_or_default(config_keys::RATE_FETCH_CONCURRENCY, config.fetch.max_concurrency)?
            .max(1);
        Ok(config)
    }
}

// ==========================================
// EngineConfigReader 实现
// ==========================================
#[async_trait]
impl EngineConfigReader for ConfigManager {
    async fn get_base_currency(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::BASE_CURRENCY, DEFAULT_BASE_CURRENCY)?;
        let value = value.trim().to_uppercase();
        if value.is_empty() {
            return Ok(DEFAULT_BASE_CURRENCY.to_string());
        }
        Ok(value)
    }

    async fn get_fuzzy_threshold(&self) -> ConfigResult<f64> {
        let value =
            self.get_parsed_or_default(config_keys::FUZZY_THRESHOLD, DEFAULT_FUZZY_THRESHOLD)?;
        if !(0.0..=1.0).contains(&value) {
            tracing::warn!(
                config_key = config_keys::FUZZY_THRESHOLD,
                value = value,
                "模糊匹配阈值超出 [0, 1]，使用默认值"
            );
            return Ok(DEFAULT_FUZZY_THRESHOLD);
        }
        Ok(value)
    }

    async fn get_historical_max_age_days(&self) -> ConfigResult<i64> {
        let value = self.get_parsed_or_default(config_keys::HISTORICAL_MAX_AGE_DAYS, 7i64)?;
        if value != clamp_max_age_days(value) {
            tracing::warn!(
                config_key = config_keys::HISTORICAL_MAX_AGE_DAYS,
                value = value,
                max = MAX_HISTORICAL_AGE_DAYS,
                "历史汇率回溯天数超出范围，已截断"
            );
        }
        Ok(clamp_max_age_days(value))
    }

    async fn get_use_historical_rate(&self) -> ConfigResult<bool> {
        self.get_parsed_or_default(config_keys::USE_HISTORICAL_RATE, true)
    }

    async fn get_amount_decimal_places(&self) -> ConfigResult<u32> {
        self.get_parsed_or_default(config_keys::AMOUNT_DECIMAL_PLACES, 2u32)
    }

    async fn get_rate_fetch_concurrency(&self) -> ConfigResult<usize> {
        let value = self.get_parsed_or_default(config_keys::RATE_FETCH_CONCURRENCY, 1usize)?;
        Ok(value.max(1))
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 币种
    pub const BASE_CURRENCY: &str = "base_currency";
    pub const AMOUNT_DECIMAL_PLACES: &str = "amount_decimal_places";

    // 字段匹配
    pub const FUZZY_THRESHOLD: &str = "fuzzy_match_threshold";

    // 汇率回退
    pub const HISTORICAL_MAX_AGE_DAYS: &str = "historical_rate_max_age_days";
    pub const USE_HISTORICAL_RATE: &str = "use_historical_rate";
    pub const ALERT_ON_FALLBACK: &str = "alert_on_rate_fallback";

    // 汇率获取
    pub const RATE_FETCH_CONCURRENCY: &str = "rate_fetch_concurrency";
}
