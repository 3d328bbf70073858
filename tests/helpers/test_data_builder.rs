// ==========================================
// 测试数据构造器
// ==========================================

use chrono::NaiveDate;
use field_mapping_engine::domain::{ConversionRecord, DimensionRule, FieldDictionaryEntry};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::BTreeMap;

pub const SALES_AMOUNT_PATTERN: &str =
    r"销售额\s*[(（](?P<order_status>[^)）]+)[)）]\s*[(（](?P<currency>[A-Za-z]{3})[)）]";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn record(amount: Decimal, currency: &str, date: NaiveDate) -> ConversionRecord {
    ConversionRecord::new(amount, currency, date)
}

/// 普通字段
pub fn field(code: &str, cn_name: &str, domain: &str, weight: f64) -> FieldDictionaryEntry {
    FieldDictionaryEntry {
        match_weight: weight,
        ..FieldDictionaryEntry::new(code, cn_name, domain)
    }
}

/// 带同义词与英文名的字段
pub fn field_with_synonyms(
    code: &str,
    cn_name: &str,
    en_name: &str,
    synonyms: &[&str],
    weight: f64,
) -> FieldDictionaryEntry {
    FieldDictionaryEntry {
        en_name: Some(en_name.to_string()),
        synonyms: synonyms.iter().map(|s| s.to_string()).collect(),
        ..field(code, cn_name, "orders", weight)
    }
}

/// 模式字段
pub fn pattern_field(
    code: &str,
    cn_name: &str,
    pattern: &str,
    dimension_config: BTreeMap<String, DimensionRule>,
    weight: f64,
) -> FieldDictionaryEntry {
    FieldDictionaryEntry {
        is_pattern_based: true,
        field_pattern: Some(pattern.to_string()),
        dimension_config,
        target_table: Some("fact_order_amounts".to_string()),
        target_columns: json!({"amount": "amount_original", "currency": "currency"}),
        ..field(code, cn_name, "orders", weight)
    }
}

/// 销售额 (订单状态) (币种) 模式字段
pub fn sales_amount_entry() -> FieldDictionaryEntry {
    let mut mapping = BTreeMap::new();
    mapping.insert("已付款订单".to_string(), "paid".to_string());
    mapping.insert("已取消订单".to_string(), "cancelled".to_string());

    let mut config = BTreeMap::new();
    config.insert("order_status".to_string(), DimensionRule::Enum { mapping });
    config.insert("currency".to_string(), DimensionRule::Normalize);

    pattern_field("sales_amount", "销售额明细", SALES_AMOUNT_PATTERN, config, 1.8)
}

/// orders 域基础字典（与初始化工具一致的子集）
pub fn orders_dictionary() -> Vec<FieldDictionaryEntry> {
    vec![
        field_with_synonyms(
            "order_id",
            "订单号",
            "Order ID",
            &["订单编号", "order_no", "订单ID"],
            2.0,
        ),
        field_with_synonyms(
            "order_date_local",
            "下单时间",
            "Order Date",
            &["订单时间", "创建时间"],
            2.0,
        ),
        field_with_synonyms(
            "total_amount",
            "订单金额",
            "Total Amount",
            &["总金额", "实收金额", "金额"],
            2.0,
        ),
        sales_amount_entry(),
        field_with_synonyms("currency", "币种", "Currency", &["货币"], 1.5),
    ]
}
