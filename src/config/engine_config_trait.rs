// ==========================================
// 跨境电商数据中台 - 引擎配置读取 Trait
// ==========================================
// 职责: 定义匹配器/换算器所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::config::error::ConfigResult;
use async_trait::async_trait;

// ==========================================
// EngineConfigReader Trait
// ==========================================
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait EngineConfigReader: Send + Sync {
    /// 本位币
    ///
    /// # 默认值
    /// - CNY
    async fn get_base_currency(&self) -> ConfigResult<String>;

    /// 模糊匹配阈值（严格大于才命中）
    ///
    /// # 默认值
    /// - 0.7
    async fn get_fuzzy_threshold(&self) -> ConfigResult<f64>;

    /// 历史汇率回退窗口（天）
    ///
    /// # 默认值
    /// - 7
    async fn get_historical_max_age_days(&self) -> ConfigResult<i64>;

    /// 是否启用历史汇率回退
    ///
    /// # 默认值
    /// - true
    async fn get_use_historical_rate(&self) -> ConfigResult<bool>;

    /// 金额小数位
    ///
    /// # 默认值
    /// - 2
    async fn get_amount_decimal_places(&self) -> ConfigResult<u32>;

    /// 缺失汇率并发获取数
    ///
    /// # 默认值
    /// - 1（顺序获取）
    async fn get_rate_fetch_concurrency(&self) -> ConfigResult<usize>;
}
