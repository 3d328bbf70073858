// ==========================================
// 跨境电商数据中台 - 汇率领域模型
// ==========================================
// 对齐: dim_exchange_rate 表
// 主键: (from_currency, to_currency, rate_date)，后写覆盖
// ==========================================

use crate::domain::types::RateSource;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// 批量查询键: (已标准化币种, 日期)
pub type RatePair = (String, NaiveDate);

// ==========================================
// ExchangeRate - 缓存汇率
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub from_currency: String,
    pub to_currency: String,
    pub rate_date: NaiveDate,
    pub rate: Decimal, // 正数
    pub source: RateSource,
    pub priority: i32,
}

// ==========================================
// ConversionRecord - 单条待换算金额
// ==========================================
// 由导入管道按单元格产生，批次内消费即丢弃
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversionRecord {
    pub amount: Decimal,
    pub currency: String, // 原始币种文本（待标准化）
    pub date: NaiveDate,
}

impl ConversionRecord {
    pub fn new(amount: Decimal, currency: &str, date: NaiveDate) -> Self {
        Self {
            amount,
            currency: currency.to_string(),
            date,
        }
    }
}
