// ==========================================
// 跨境电商数据中台 - 汇率提供方
// ==========================================
// 职责: 按 (from, to, date) 获取单个汇率
// 约定: 任意错误或空结果均视为“尝试下一个提供方”，由换算器处理
// 实现: HttpRateProvider (reqwest) / StaticRateProvider (配置内固定表)
// ==========================================

use crate::config::exchange_rate_config::{
    ExchangeRateConfig, ProviderConfig, ProviderKind, StaticRateEntry,
};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// 汇率提供方错误
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),

    #[error("接口返回异常状态 {status}: {body}")]
    Status { status: u16, body: String },

    #[error("响应格式错误: {0}")]
    InvalidPayload(String),

    #[error("提供方配置错误 ({provider}): {message}")]
    Config { provider: String, message: String },
}

// ==========================================
// RateProvider Trait
// ==========================================
#[async_trait]
pub trait RateProvider: Send + Sync {
    fn name(&self) -> &str;

    /// 优先级（升序优先尝试）
    fn priority(&self) -> i32;

    /// 获取汇率
    ///
    /// # 返回
    /// - Ok(Some(rate)): 正数汇率
    /// - Ok(None): 该提供方无此币种对
    /// - Err: 网络或接口错误
    async fn fetch_rate(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ProviderError>;
}

// ==========================================
// HttpRateProvider
// ==========================================
// 请求: GET {base_url}?from=USD&to=CNY&date=2025-01-10
// 响应: {"rate": 7.1234} 或 {"data": {"rate": "7.1234"}} (rate_field = "data.rate")
pub struct HttpRateProvider {
    name: String,
    priority: i32,
    base_url: String,
    api_key: Option<String>,
    rate_field: String,
    http: reqwest::Client,
}

impl HttpRateProvider {
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = config
            .base_url
            .clone()
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ProviderError::Config {
                provider: config.name.clone(),
                message: "缺少 base_url".to_string(),
            })?;

        let api_key = match config.api_key_env.as_deref() {
            Some(var) => match std::env::var(var) {
                Ok(key) => Some(key),
                Err(_) => {
                    tracing::warn!(provider = %config.name, env = %var, "API Key 环境变量未设置");
                    None
                }
            },
            None => None,
        };

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        Ok(Self {
            name: config.name.clone(),
            priority: config.priority,
            base_url,
            api_key,
            rate_field: config.rate_field.clone(),
            http,
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_rate(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ProviderError> {
        let date_str = date.format("%Y-%m-%d").to_string();
        let mut request = self
            .http
            .get(&self.base_url)
            .query(&[("from", from), ("to", to), ("date", date_str.as_str())]);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body: body.chars().take(200).collect(),
            });
        }

        let payload: Value = response.json().await?;
        parse_rate_payload(&payload, &self.rate_field)
    }
}

/// 从响应 JSON 中按路径提取汇率
///
/// 字段缺失或为 null 返回 None；非数值或非正数视为格式错误
pub fn parse_rate_payload(payload: &Value, rate_field: &str) -> Result<Option<Decimal>, ProviderError> {
    let mut node = payload;
    for segment in rate_field.split('.').filter(|s| !s.is_empty()) {
        match node.get(segment) {
            Some(next) => node = next,
            None => return Ok(None),
        }
    }

    let rate = match node {
        Value::Null => return Ok(None),
        Value::Number(n) => Decimal::from_str(&n.to_string()),
        Value::String(s) => Decimal::from_str(s.trim()),
        other => {
            return Err(ProviderError::InvalidPayload(format!(
                "{} 不是数值: {}",
                rate_field, other
            )))
        }
    }
    .map_err(|e| ProviderError::InvalidPayload(format!("{}: {}", rate_field, e)))?;

    if rate <= Decimal::ZERO {
        return Err(ProviderError::InvalidPayload(format!(
            "{} 非正数: {}",
            rate_field, rate
        )));
    }
    Ok(Some(rate))
}

// ==========================================
// StaticRateProvider
// ==========================================
// 指定日期的条目优先于不限日期的条目
pub struct StaticRateProvider {
    name: String,
    priority: i32,
    dated: HashMap<(String, String, NaiveDate), Decimal>,
    undated: HashMap<(String, String), Decimal>,
}

impl StaticRateProvider {
    pub fn new(name: &str, priority: i32, entries: &[StaticRateEntry]) -> Self {
        let mut dated = HashMap::new();
        let mut undated = HashMap::new();
        for e in entries {
            let from = e.from.trim().to_uppercase();
            let to = e.to.trim().to_uppercase();
            match e.date {
                Some(d) => {
                    dated.insert((from, to, d), e.rate);
                }
                None => {
                    undated.insert((from, to), e.rate);
                }
            }
        }
        Self {
            name: name.to_string(),
            priority,
            dated,
            undated,
        }
    }

    pub fn from_config(config: &ProviderConfig) -> Self {
        Self::new(&config.name, config.priority, &config.rates)
    }
}

#[async_trait]
impl RateProvider for StaticRateProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_rate(
        &self,
        from: &str,
        to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ProviderError> {
        let key = (from.to_string(), to.to_string());
        let rate = self
            .dated
            .get(&(key.0.clone(), key.1.clone(), date))
            .or_else(|| self.undated.get(&key))
            .copied()
            .filter(|r| *r > Decimal::ZERO);
        Ok(rate)
    }
}

/// 按配置构造提供方链（按优先级升序）
pub fn build_providers(
    config: &ExchangeRateConfig,
) -> Result<Vec<Arc<dyn RateProvider>>, ProviderError> {
    let mut providers: Vec<Arc<dyn RateProvider>> = Vec::with_capacity(config.providers.len());
    for p in config.sorted_providers() {
        let provider: Arc<dyn RateProvider> = match p.kind {
            ProviderKind::Http => Arc::new(HttpRateProvider::from_config(p)?),
            ProviderKind::Static => Arc::new(StaticRateProvider::from_config(p)),
        };
        tracing::debug!(provider = %p.name, priority = p.priority, kind = ?p.kind, "汇率提供方已注册");
        providers.push(provider);
    }
    Ok(providers)
}
