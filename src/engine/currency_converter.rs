// ==========================================
// 跨境电商数据中台 - 货币换算器
// ==========================================
// 职责: 批量将 (金额, 币种, 日期) 换算为目标币种
// 流程: 标准化币种 → 去重 (币种, 日期) → 一次批量查缓存
//       → 缺失项按优先级询问提供方并回写 → 历史汇率回退 → 原值保留
// 红线: 金额与汇率全程使用 Decimal；仅在输出时按 half-up 舍入一次
//       仅存储不可用向调用方抛错
// ==========================================

use crate::config::engine_config_trait::EngineConfigReader;
use crate::config::exchange_rate_config::{
    clamp_max_age_days, ExchangeRateConfig, FallbackStrategy,
};
use crate::domain::exchange_rate::{ConversionRecord, ExchangeRate, RatePair};
use crate::domain::types::RateSource;
use crate::engine::currency_normalizer::CurrencyNormalizer;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::rate_provider::{build_providers, RateProvider};
use crate::repository::exchange_rate_repo::ExchangeRateStore;
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use uuid::Uuid;

/// 默认金额小数位
pub const DEFAULT_AMOUNT_DECIMAL_PLACES: u32 = 2;

// ==========================================
// CurrencyConverter
// ==========================================
pub struct CurrencyConverter {
    store: Arc<dyn ExchangeRateStore>,
    providers: Vec<Arc<dyn RateProvider>>, // 按 priority 升序
    normalizer: CurrencyNormalizer,
    fallback: FallbackStrategy,
    decimal_places: u32,
    max_concurrency: usize,
}

impl CurrencyConverter {
    /// 创建换算器
    ///
    /// # 参数
    /// - store: 汇率缓存
    /// - providers: 汇率提供方（内部按优先级稳定排序）
    /// - normalizer: 币种标准化器（其本位币即默认目标币种）
    pub fn new(
        store: Arc<dyn ExchangeRateStore>,
        mut providers: Vec<Arc<dyn RateProvider>>,
        normalizer: CurrencyNormalizer,
    ) -> Self {
        providers.sort_by_key(|p| p.priority());
        Self {
            store,
            providers,
            normalizer,
            fallback: FallbackStrategy::default(),
            decimal_places: DEFAULT_AMOUNT_DECIMAL_PLACES,
            max_concurrency: 1,
        }
    }

    /// 按汇率配置构造（提供方链、本位币、回退策略、精度、并发）
    pub fn from_config(
        store: Arc<dyn ExchangeRateStore>,
        config: &ExchangeRateConfig,
    ) -> EngineResult<Self> {
        let providers =
            build_providers(config).map_err(|e| EngineError::Config(e.to_string()))?;
        Ok(Self::new(
            store,
            providers,
            CurrencyNormalizer::new(&config.currencies.base_currency),
        )
        .with_fallback_strategy(config.fallback_strategy.clone())
        .with_decimal_places(config.currencies.amount_decimal_places)
        .with_max_concurrency(config.fetch.max_concurrency))
    }

    /// 用 config_kv 覆写项调整运行参数
    pub async fn with_engine_config(
        self,
        reader: &dyn EngineConfigReader,
    ) -> EngineResult<Self> {
        let config_err = |e: crate::config::ConfigError| EngineError::Config(e.to_string());

        let base = reader.get_base_currency().await.map_err(config_err)?;
        let places = reader.get_amount_decimal_places().await.map_err(config_err)?;
        let max_age = reader.get_historical_max_age_days().await.map_err(config_err)?;
        let use_historical = reader.get_use_historical_rate().await.map_err(config_err)?;
        let concurrency = reader.get_rate_fetch_concurrency().await.map_err(config_err)?;

        let fallback = FallbackStrategy {
            use_historical_rate: use_historical,
            max_age_days: max_age,
            alert_on_fallback: self.fallback.alert_on_fallback,
        };
        Ok(Self {
            normalizer: CurrencyNormalizer::new(&base),
            ..self
        }
        .with_fallback_strategy(fallback)
        .with_decimal_places(places)
        .with_max_concurrency(concurrency))
    }

    pub fn with_fallback_strategy(mut self, fallback: FallbackStrategy) -> Self {
        self.fallback = FallbackStrategy {
            max_age_days: clamp_max_age_days(fallback.max_age_days),
            ..fallback
        };
        self
    }

    pub fn with_decimal_places(mut self, places: u32) -> Self {
        self.decimal_places = places;
        self
    }

    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency.max(1);
        self
    }

    pub fn base_currency(&self) -> &str {
        self.normalizer.base_currency()
    }

    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// 批量换算
    ///
    /// # 参数
    /// - records: 待换算金额
    /// - target: 目标币种（None 表示本位币）
    ///
    /// # 返回
    /// - Ok(Vec<Decimal>): 与输入等长同序
    /// - Err: 汇率存储不可用
    #[tracing::instrument(
        skip(self, records, target),
        fields(batch_id = %Uuid::new_v4(), record_count = records.len())
    )]
    pub async fn batch_convert(
        &self,
        records: &[ConversionRecord],
        target: Option<&str>,
    ) -> EngineResult<Vec<Decimal>> {
        let target = match target {
            Some(t) => self.normalizer.normalize(t),
            None => self.normalizer.base_currency().to_string(),
        };

        // 1. 标准化币种（同一原始文本只标准化一次）
        let mut normalized: HashMap<&str, String> = HashMap::new();
        let currencies: Vec<String> = records
            .iter()
            .map(|r| {
                normalized
                    .entry(r.currency.as_str())
                    .or_insert_with(|| self.normalizer.normalize(&r.currency))
                    .clone()
            })
            .collect();

        // 2. 去重待查键
        let pairs: BTreeSet<RatePair> = records
            .iter()
            .zip(currencies.iter())
            .filter(|(_, cur)| cur.as_str() != target)
            .map(|(r, cur)| (cur.clone(), r.date))
            .collect();

        let rates = if pairs.is_empty() {
            HashMap::new()
        } else {
            self.resolve_rates(&pairs, &target).await?
        };

        // 3. 逐条换算
        let places = self.decimal_places;
        let output = records
            .iter()
            .zip(currencies.iter())
            .map(|(r, cur)| {
                if *cur == target {
                    return r.amount;
                }
                match rates.get(&(cur.clone(), r.date)) {
                    Some(rate) => match r.amount.checked_mul(*rate) {
                        Some(v) => v.round_dp_with_strategy(
                            places,
                            RoundingStrategy::MidpointAwayFromZero,
                        ),
                        None => {
                            tracing::warn!(
                                amount = %r.amount,
                                rate = %rate,
                                currency = %cur,
                                "金额换算溢出，保留原值"
                            );
                            r.amount
                        }
                    },
                    None => r.amount,
                }
            })
            .collect::<Vec<_>>();

        tracing::info!(
            target_currency = %target,
            pairs = pairs.len(),
            resolved = rates.len(),
            "批量换算完成"
        );
        Ok(output)
    }

    /// 单笔换算
    ///
    /// # 参数
    /// - to: 目标币种（None 表示本位币）
    /// - date: 汇率日期（None 表示今天）
    pub async fn convert_single(
        &self,
        amount: Decimal,
        from: &str,
        to: Option<&str>,
        date: Option<NaiveDate>,
    ) -> EngineResult<Decimal> {
        let date = date.unwrap_or_else(|| chrono::Local::now().date_naive());
        let record = ConversionRecord::new(amount, from, date);
        let converted = self
            .batch_convert(std::slice::from_ref(&record), to)
            .await?;
        Ok(converted.into_iter().next().unwrap_or(amount))
    }

    /// 解析全部键的汇率：缓存 → 提供方 → 历史回退
    ///
    /// 未解析的键不出现在返回结果中（调用方保留原值）
    async fn resolve_rates(
        &self,
        pairs: &BTreeSet<RatePair>,
        target: &str,
    ) -> EngineResult<HashMap<RatePair, Decimal>> {
        let mut rates = self
            .store
            .get_rates(pairs, target)
            .await
            .map_err(EngineError::RateStore)?;

        let missing: Vec<&RatePair> = pairs.iter().filter(|p| !rates.contains_key(*p)).collect();
        if missing.is_empty() {
            tracing::debug!(cached = rates.len(), "汇率全部命中缓存");
            return Ok(rates);
        }
        tracing::debug!(
            cached = rates.len(),
            missing = missing.len(),
            "部分汇率未缓存，询问提供方"
        );

        // 缺失项并发度受限；写回失败即存储不可用
        let fetched: Vec<EngineResult<(RatePair, Option<Decimal>)>> = stream::iter(missing)
            .map(|pair| async move {
                let rate = self.fetch_and_store(&pair.0, target, pair.1).await?;
                Ok::<_, EngineError>((pair.clone(), rate))
            })
            .buffer_unordered(self.max_concurrency)
            .collect()
            .await;

        let mut unresolved = Vec::new();
        for item in fetched {
            let (pair, rate) = item?;
            match rate {
                Some(rate) => {
                    rates.insert(pair, rate);
                }
                None => unresolved.push(pair),
            }
        }
        unresolved.sort();

        for pair in unresolved {
            if let Some(rate) = self.historical_fallback(&pair, target).await? {
                rates.insert(pair, rate);
            } else {
                self.log_fallback(&pair, target, "无可用汇率，金额保留原币种");
            }
        }
        Ok(rates)
    }

    /// 按优先级询问提供方，首个有效汇率写回缓存
    async fn fetch_and_store(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> EngineResult<Option<Decimal>> {
        for provider in &self.providers {
            match provider.fetch_rate(from, to, date).await {
                Ok(Some(rate)) if rate > Decimal::ZERO => {
                    let record = ExchangeRate {
                        from_currency: from.to_string(),
                        to_currency: to.to_string(),
                        rate_date: date,
                        rate,
                        source: RateSource::Api,
                        priority: provider.priority(),
                    };
                    self.store
                        .put_rate(&record)
                        .await
                        .map_err(EngineError::RateStore)?;
                    tracing::debug!(
                        provider = provider.name(),
                        from = from,
                        to = to,
                        date = %date,
                        rate = %rate,
                        "汇率已获取并写入缓存"
                    );
                    return Ok(Some(rate));
                }
                Ok(Some(rate)) => {
                    tracing::warn!(provider = provider.name(), rate = %rate, "提供方返回非正汇率，跳过");
                }
                Ok(None) => {
                    tracing::debug!(provider = provider.name(), from = from, date = %date, "提供方无此汇率");
                }
                Err(e) => {
                    tracing::warn!(
                        provider = provider.name(),
                        from = from,
                        to = to,
                        date = %date,
                        error = %e,
                        "汇率提供方请求失败，尝试下一个"
                    );
                }
            }
        }
        Ok(None)
    }

    /// 历史汇率回退（窗口内严格早于目标日期的最近一条）
    async fn historical_fallback(
        &self,
        pair: &RatePair,
        target: &str,
    ) -> EngineResult<Option<Decimal>> {
        if !self.fallback.use_historical_rate {
            return Ok(None);
        }
        let found = self
            .store
            .get_historical_rate(&pair.0, target, pair.1, self.fallback.max_age_days)
            .await
            .map_err(EngineError::RateStore)?;

        Ok(found.map(|historical| {
            let message = format!("使用 {} 的历史汇率", historical.rate_date);
            self.log_fallback(pair, target, &message);
            historical.rate
        }))
    }

    fn log_fallback(&self, pair: &RatePair, target: &str, message: &str) {
        if self.fallback.alert_on_fallback {
            tracing::error!(currency = %pair.0, target_currency = target, date = %pair.1, "{}", message);
        } else {
            tracing::warn!(currency = %pair.0, target_currency = target, date = %pair.1, "{}", message);
        }
    }
}
