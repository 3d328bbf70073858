// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: SQLite 字典/汇率仓储 + 匹配器/换算器完整流程
// ==========================================

mod helpers;

use field_mapping_engine::config::{FallbackStrategy, MAX_HISTORICAL_AGE_DAYS};
use field_mapping_engine::domain::{ExchangeRate, RateSource};
use field_mapping_engine::engine::{
    CurrencyConverter, CurrencyNormalizer, DictionaryCache, PatternMatcher, RateProvider,
};
use field_mapping_engine::logging;
use field_mapping_engine::repository::{
    ExchangeRateStore, FieldDictionaryStore, SqliteExchangeRateRepository,
    SqliteFieldDictionaryRepository,
};
use helpers::mock_stores::ScriptedProvider;
use helpers::test_data_builder::{date, orders_dictionary, record, sales_amount_entry};
use rust_decimal_macros::dec;
use std::collections::BTreeSet;
use std::sync::Arc;
use test_helpers::{create_test_db, open_shared_connection};

#[tokio::test]
async fn test_dictionary_roundtrip_preserves_rules_and_order() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = SqliteFieldDictionaryRepository::new(&db_path).expect("Failed to create repo");

    for entry in orders_dictionary() {
        repo.upsert_entry(&entry).expect("Failed to upsert");
    }

    let loaded = repo.load_domain(Some("orders")).await.expect("Failed to load");
    assert_eq!(loaded.len(), 5);
    // match_weight 降序，同权重按写入顺序
    let codes: Vec<&str> = loaded.iter().map(|e| e.field_code.as_str()).collect();
    assert_eq!(
        codes,
        vec!["order_id", "order_date_local", "total_amount", "sales_amount", "currency"]
    );

    let sales = &loaded[3];
    assert!(sales.is_pattern_based);
    assert_eq!(sales.dimension_config, sales_amount_entry().dimension_config);
    assert_eq!(sales.target_table.as_deref(), Some("fact_order_amounts"));

    // 停用后不再加载
    assert!(repo.set_active("currency", false).expect("Failed to deactivate"));
    let loaded = repo.load_domain(Some("orders")).await.expect("Failed to load");
    assert_eq!(loaded.len(), 4);
    assert!(!repo.set_active("no_such_field", false).expect("Failed to query"));
}

#[tokio::test]
async fn test_matcher_over_sqlite_dictionary() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = SqliteFieldDictionaryRepository::new(&db_path).expect("Failed to create repo");
    for entry in orders_dictionary() {
        repo.upsert_entry(&entry).expect("Failed to upsert");
    }

    let cache = Arc::new(DictionaryCache::new(Arc::new(repo)));
    let matcher = PatternMatcher::new(cache, CurrencyNormalizer::default());

    let r = matcher
        .match_header("销售额 (已取消订单) (usd)", Some("orders"))
        .await
        .expect("Failed to match");
    assert_eq!(r.standard_field.as_deref(), Some("sales_amount"));
    assert_eq!(r.dimensions.get("order_status").map(String::as_str), Some("cancelled"));
    assert_eq!(r.dimensions.get("currency").map(String::as_str), Some("USD"));
}

#[tokio::test]
async fn test_converter_write_through_persists_rates() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let conn = open_shared_connection(&db_path).expect("Failed to open db");
    let repo = Arc::new(SqliteExchangeRateRepository::from_connection(conn));

    let provider = Arc::new(
        ScriptedProvider::new("p1", 2)
            .with_rate("USD", dec!(7.1884))
            .with_rate("SGD", dec!(5.3012)),
    );
    let providers: Vec<Arc<dyn RateProvider>> = vec![provider.clone()];
    let converter =
        CurrencyConverter::new(repo.clone(), providers, CurrencyNormalizer::default());

    let records = vec![
        record(dec!(19.99), "US$", date(2025, 1, 10)),
        record(dec!(8.50), "S$", date(2025, 1, 10)),
        record(dec!(100), "CNY", date(2025, 1, 10)),
        record(dec!(1.01), "USD", date(2025, 1, 10)),
    ];
    let first = converter.batch_convert(&records, None).await.expect("Failed to convert");
    assert_eq!(first, vec![dec!(143.70), dec!(45.06), dec!(100), dec!(7.26)]);
    assert_eq!(provider.calls(), 2);
    assert_eq!(repo.count().expect("Failed to count"), 2);

    // 新的换算器实例复用同一缓存，不再请求提供方
    let providers: Vec<Arc<dyn RateProvider>> = vec![provider.clone()];
    let converter =
        CurrencyConverter::new(repo.clone(), providers, CurrencyNormalizer::default());
    let second = converter.batch_convert(&records, None).await.expect("Failed to convert");
    assert_eq!(first, second);
    assert_eq!(provider.calls(), 2);

    let mut pairs = BTreeSet::new();
    pairs.insert(("USD".to_string(), date(2025, 1, 10)));
    let cached = repo.get_rates(&pairs, "CNY").await.expect("Failed to read");
    assert_eq!(cached.get(&("USD".to_string(), date(2025, 1, 10))), Some(&dec!(7.1884)));
}

#[tokio::test]
async fn test_converter_historical_fallback_from_sqlite() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = Arc::new(SqliteExchangeRateRepository::new(&db_path).expect("Failed to create repo"));

    repo.put_rate(&ExchangeRate {
        from_currency: "EUR".to_string(),
        to_currency: "CNY".to_string(),
        rate_date: date(2025, 1, 7),
        rate: dec!(7.5),
        source: RateSource::Manual,
        priority: 0,
    })
    .await
    .expect("Failed to seed rate");

    let providers: Vec<Arc<dyn RateProvider>> =
        vec![Arc::new(ScriptedProvider::failing("down", 1))];
    let converter = CurrencyConverter::new(repo.clone(), providers, CurrencyNormalizer::default());

    let out = converter
        .batch_convert(
            &[
                record(dec!(10), "欧元", date(2025, 1, 10)),
                record(dec!(10), "EUR", date(2025, 1, 20)),
            ],
            None,
        )
        .await
        .expect("Failed to convert");

    // 1-10 命中 1-07 历史汇率；1-20 超出 7 天窗口保留原值
    assert_eq!(out, vec![dec!(75.00), dec!(10)]);
    assert_eq!(repo.count().expect("Failed to count"), 1);
}

#[tokio::test]
async fn test_converter_oversized_fallback_window_degrades_instead_of_panicking() {
    logging::init_test();
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let repo = Arc::new(SqliteExchangeRateRepository::new(&db_path).expect("Failed to create repo"));

    repo.put_rate(&ExchangeRate {
        from_currency: "USD".to_string(),
        to_currency: "CNY".to_string(),
        rate_date: date(2024, 6, 1),
        rate: dec!(7.2),
        source: RateSource::Manual,
        priority: 0,
    })
    .await
    .expect("Failed to seed rate");

    let providers: Vec<Arc<dyn RateProvider>> =
        vec![Arc::new(ScriptedProvider::failing("down", 1))];
    let converter = CurrencyConverter::new(repo.clone(), providers, CurrencyNormalizer::default())
        .with_fallback_strategy(FallbackStrategy {
            use_historical_rate: true,
            max_age_days: 1_000_000_000,
            alert_on_fallback: false,
        });

    // 窗口被截断到上限，仍可命中较早的历史汇率
    assert!(MAX_HISTORICAL_AGE_DAYS >= 365);
    let out = converter
        .convert_single(dec!(10), "USD", None, Some(date(2025, 1, 10)))
        .await
        .expect("Failed to convert");
    assert_eq!(out, dec!(72.00));

    let untouched = converter
        .convert_single(dec!(10), "EUR", None, Some(date(2025, 1, 10)))
        .await
        .expect("Failed to convert");
    assert_eq!(untouched, dec!(10));
}
