// ==========================================
// 跨境电商数据中台 - 字段字典初始化工具
// ==========================================
// 用法: seed_dictionary [db_path]
// 说明: 建表并写入 orders 域初始字典（可重复执行，按 field_code 覆盖）
// ==========================================

use anyhow::Context;
use field_mapping_engine::db::{default_db_path, init_schema, open_sqlite_connection};
use field_mapping_engine::domain::{DimensionRule, FieldDictionaryEntry};
use field_mapping_engine::logging;
use field_mapping_engine::repository::SqliteFieldDictionaryRepository;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// 销售额 (订单状态) (币种)
const SALES_AMOUNT_PATTERN: &str =
    r"销售额\s*[(（](?P<order_status>[^)）]+)[)）]\s*[(（](?P<currency>[A-Za-z]{3})[)）]";

struct Seed {
    field_code: &'static str,
    cn_name: &'static str,
    en_name: &'static str,
    description: &'static str,
    field_group: &'static str,
    is_required: bool,
    data_type: &'static str,
    synonyms: &'static [&'static str],
    match_weight: f64,
}

const ORDER_SEEDS: &[Seed] = &[
    Seed {
        field_code: "order_id",
        cn_name: "订单号",
        en_name: "Order ID",
        description: "订单唯一标识符",
        field_group: "dimension",
        is_required: true,
        data_type: "string",
        synonyms: &["订单编号", "order_id", "order_no", "ddh", "订单ID"],
        match_weight: 2.0,
    },
    Seed {
        field_code: "order_date_local",
        cn_name: "下单时间",
        en_name: "Order Date",
        description: "订单创建时间（店铺本地时区）",
        field_group: "dimension",
        is_required: true,
        data_type: "datetime",
        synonyms: &["订单时间", "创建时间", "order_date", "order_time", "xdsj", "创单时间"],
        match_weight: 2.0,
    },
    Seed {
        field_code: "shop_id",
        cn_name: "店铺",
        en_name: "Shop ID",
        description: "店铺标识",
        field_group: "dimension",
        is_required: true,
        data_type: "string",
        synonyms: &["店铺ID", "shop", "shop_id", "dp", "店铺编号"],
        match_weight: 2.0,
    },
    Seed {
        field_code: "platform_code",
        cn_name: "平台",
        en_name: "Platform",
        description: "销售平台代码",
        field_group: "dimension",
        is_required: true,
        data_type: "string",
        synonyms: &["平台代码", "platform", "platform_code", "pt"],
        match_weight: 2.0,
    },
    Seed {
        field_code: "total_amount",
        cn_name: "订单金额",
        en_name: "Total Amount",
        description: "订单总金额（原币种）",
        field_group: "amount",
        is_required: true,
        data_type: "currency",
        synonyms: &["总金额", "实收金额", "金额", "total_amount", "gmv", "je", "amount"],
        match_weight: 2.0,
    },
    Seed {
        field_code: "buyer_paid_amount",
        cn_name: "买家实付",
        en_name: "Buyer Paid Amount",
        description: "买家实际支付金额",
        field_group: "amount",
        is_required: false,
        data_type: "currency",
        synonyms: &["实付金额", "buyer_paid", "paid_amount", "买家支付"],
        match_weight: 1.5,
    },
    Seed {
        field_code: "currency",
        cn_name: "币种",
        en_name: "Currency",
        description: "金额币种",
        field_group: "dimension",
        is_required: false,
        data_type: "string",
        synonyms: &["货币", "currency", "bz"],
        match_weight: 1.5,
    },
];

fn build_entry(seed: &Seed) -> FieldDictionaryEntry {
    FieldDictionaryEntry {
        en_name: Some(seed.en_name.to_string()),
        description: Some(seed.description.to_string()),
        field_group: Some(seed.field_group.to_string()),
        is_required: seed.is_required,
        data_type: seed.data_type.to_string(),
        synonyms: seed.synonyms.iter().map(|s| s.to_string()).collect(),
        match_weight: seed.match_weight,
        target_table: Some("fact_orders".to_string()),
        target_columns: json!({ "column": seed.field_code }),
        ..FieldDictionaryEntry::new(seed.field_code, seed.cn_name, "orders")
    }
}

fn sales_amount_entry() -> FieldDictionaryEntry {
    let mut status_mapping = BTreeMap::new();
    status_mapping.insert("已付款订单".to_string(), "paid".to_string());
    status_mapping.insert("已取消订单".to_string(), "cancelled".to_string());
    status_mapping.insert("已退款订单".to_string(), "refunded".to_string());
    status_mapping.insert("全部订单".to_string(), "all".to_string());

    let mut dimension_config = BTreeMap::new();
    dimension_config.insert(
        "order_status".to_string(),
        DimensionRule::Enum {
            mapping: status_mapping,
        },
    );
    dimension_config.insert("currency".to_string(), DimensionRule::Normalize);

    FieldDictionaryEntry {
        en_name: Some("Sales Amount".to_string()),
        description: Some("按订单状态与币种拆分的销售额".to_string()),
        field_group: Some("amount".to_string()),
        data_type: "currency".to_string(),
        match_weight: 1.8,
        is_pattern_based: true,
        field_pattern: Some(SALES_AMOUNT_PATTERN.to_string()),
        dimension_config,
        target_table: Some("fact_order_amounts".to_string()),
        target_columns: json!({
            "amount": "amount_original",
            "currency": "currency",
            "order_status": "order_status"
        }),
        ..FieldDictionaryEntry::new("sales_amount", "销售额明细", "orders")
    }
}

fn main() -> anyhow::Result<()> {
    logging::init();

    let db_path = match std::env::args().nth(1) {
        Some(path) => path,
        None => {
            let path = default_db_path();
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("无法创建数据目录: {}", parent.display()))?;
            }
            path.display().to_string()
        }
    };

    let conn = open_sqlite_connection(&db_path)
        .with_context(|| format!("无法打开数据库: {}", db_path))?;
    init_schema(&conn).context("建表失败")?;

    let repo = SqliteFieldDictionaryRepository::from_connection(Arc::new(Mutex::new(conn)));

    let mut entries: Vec<FieldDictionaryEntry> = ORDER_SEEDS.iter().map(build_entry).collect();
    entries.push(sales_amount_entry());

    for entry in &entries {
        repo.upsert_entry(entry)
            .with_context(|| format!("写入字典条目失败: {}", entry.field_code))?;
    }

    tracing::info!(db = %db_path, count = entries.len(), "字段字典初始化完成");
    Ok(())
}
