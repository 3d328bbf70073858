// ==========================================
// ConfigManager 集成测试
// ==========================================
// 测试目标: 验证 config_kv 读取、默认值、覆写合并，
//           以及匹配器/换算器按配置构造
// ==========================================

mod helpers;

use field_mapping_engine::config::{
    config_keys, ConfigManager, EngineConfigReader, ExchangeRateConfig, MAX_HISTORICAL_AGE_DAYS,
};
use field_mapping_engine::engine::{
    CurrencyConverter, CurrencyNormalizer, DictionaryCache, PatternMatcher, RateProvider,
};
use helpers::mock_stores::{CountingRateStore, MemoryDictionaryStore, ScriptedProvider};
use helpers::test_data_builder::{date, field};
use rust_decimal_macros::dec;
use std::sync::Arc;
use test_helpers::create_test_db;

#[tokio::test]
async fn test_config_manager_creation() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config_manager = ConfigManager::new(&db_path);
    assert!(
        config_manager.is_ok(),
        "ConfigManager should be created successfully"
    );
}

#[tokio::test]
async fn test_defaults_when_unset() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    assert_eq!(config.get_base_currency().await.unwrap(), "CNY");
    assert_eq!(config.get_fuzzy_threshold().await.unwrap(), 0.7);
    assert_eq!(config.get_historical_max_age_days().await.unwrap(), 7);
    assert!(config.get_use_historical_rate().await.unwrap());
    assert_eq!(config.get_amount_decimal_places().await.unwrap(), 2);
    assert_eq!(config.get_rate_fetch_concurrency().await.unwrap(), 1);
    assert!(config.get_config_snapshot().unwrap().is_empty());
}

#[tokio::test]
async fn test_set_and_read_values() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config
        .set_global_config_value(config_keys::BASE_CURRENCY, " usd ")
        .unwrap();
    config
        .set_global_config_value(config_keys::FUZZY_THRESHOLD, "0.8")
        .unwrap();
    config
        .set_global_config_value(config_keys::HISTORICAL_MAX_AGE_DAYS, "3")
        .unwrap();
    config
        .set_global_config_value(config_keys::USE_HISTORICAL_RATE, "false")
        .unwrap();
    config
        .set_global_config_value(config_keys::RATE_FETCH_CONCURRENCY, "4")
        .unwrap();

    assert_eq!(config.get_base_currency().await.unwrap(), "USD");
    assert_eq!(config.get_fuzzy_threshold().await.unwrap(), 0.8);
    assert_eq!(config.get_historical_max_age_days().await.unwrap(), 3);
    assert!(!config.get_use_historical_rate().await.unwrap());
    assert_eq!(config.get_rate_fetch_concurrency().await.unwrap(), 4);

    // 覆盖写入
    config
        .set_global_config_value(config_keys::HISTORICAL_MAX_AGE_DAYS, "10")
        .unwrap();
    assert_eq!(config.get_historical_max_age_days().await.unwrap(), 10);

    let snapshot = config.get_config_snapshot().unwrap();
    assert_eq!(snapshot.len(), 5);
    assert_eq!(
        snapshot.get(config_keys::HISTORICAL_MAX_AGE_DAYS).map(String::as_str),
        Some("10")
    );
}

#[tokio::test]
async fn test_malformed_values_fall_back_to_defaults() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config
        .set_global_config_value(config_keys::FUZZY_THRESHOLD, "很高")
        .unwrap();
    config
        .set_global_config_value(config_keys::AMOUNT_DECIMAL_PLACES, "-1")
        .unwrap();
    config
        .set_global_config_value(config_keys::RATE_FETCH_CONCURRENCY, "0")
        .unwrap();

    assert_eq!(config.get_fuzzy_threshold().await.unwrap(), 0.7);
    assert_eq!(config.get_amount_decimal_places().await.unwrap(), 2);
    assert_eq!(config.get_rate_fetch_concurrency().await.unwrap(), 1);

    // 超出 [0, 1] 视为无效
    config
        .set_global_config_value(config_keys::FUZZY_THRESHOLD, "1.5")
        .unwrap();
    assert_eq!(config.get_fuzzy_threshold().await.unwrap(), 0.7);
}

#[tokio::test]
async fn test_historical_window_is_bounded() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    config
        .set_global_config_value(config_keys::HISTORICAL_MAX_AGE_DAYS, "1000000000")
        .unwrap();
    assert_eq!(
        config.get_historical_max_age_days().await.unwrap(),
        MAX_HISTORICAL_AGE_DAYS
    );
    let merged = config
        .apply_overrides(ExchangeRateConfig::default())
        .await
        .unwrap();
    assert_eq!(merged.fallback_strategy.max_age_days, MAX_HISTORICAL_AGE_DAYS);

    config
        .set_global_config_value(config_keys::HISTORICAL_MAX_AGE_DAYS, "-3")
        .unwrap();
    assert_eq!(config.get_historical_max_age_days().await.unwrap(), 0);
}

#[tokio::test]
async fn test_apply_overrides_merges_into_yaml_config() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");

    let yaml = r#"
fallback_strategy:
  max_age_days: 5
  alert_on_fallback: true
currencies:
  base_currency: CNY
"#;
    let base = ExchangeRateConfig::from_yaml_str(yaml).unwrap();

    config
        .set_global_config_value(config_keys::ALERT_ON_FALLBACK, "false")
        .unwrap();
    config
        .set_global_config_value(config_keys::AMOUNT_DECIMAL_PLACES, "4")
        .unwrap();

    let merged = config.apply_overrides(base).await.unwrap();
    assert!(!merged.fallback_strategy.alert_on_fallback);
    assert_eq!(merged.fallback_strategy.max_age_days, 5);
    assert_eq!(merged.currencies.amount_decimal_places, 4);
    assert_eq!(merged.currencies.base_currency, "CNY");
    assert_eq!(merged.fetch.max_concurrency, 1);
}

#[tokio::test]
async fn test_matcher_uses_configured_threshold() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config
        .set_global_config_value(config_keys::FUZZY_THRESHOLD, "0.6")
        .unwrap();

    let store = Arc::new(MemoryDictionaryStore::new(vec![field(
        "visitor_count",
        "店铺访客数",
        "traffic",
        1.0,
    )]));
    let cache = Arc::new(DictionaryCache::new(store));
    let matcher = PatternMatcher::from_engine_config(cache, &config)
        .await
        .unwrap();
    assert_eq!(matcher.fuzzy_threshold(), 0.6);

    // 5/8 = 0.625，默认阈值下不命中
    let r = matcher.match_header("店铺访客数汇总表", None).await.unwrap();
    assert!(r.matched);
}

#[tokio::test]
async fn test_converter_uses_configured_precision_and_target() {
    let (_temp_file, db_path) = create_test_db().expect("Failed to create test db");
    let config = ConfigManager::new(&db_path).expect("Failed to create ConfigManager");
    config
        .set_global_config_value(config_keys::BASE_CURRENCY, "USD")
        .unwrap();
    config
        .set_global_config_value(config_keys::AMOUNT_DECIMAL_PLACES, "3")
        .unwrap();

    let provider: Arc<dyn RateProvider> =
        Arc::new(ScriptedProvider::new("p1", 1).with_rate("CNY", dec!(0.13888)));
    let converter = CurrencyConverter::new(
        Arc::new(CountingRateStore::new()),
        vec![provider],
        CurrencyNormalizer::default(),
    )
    .with_engine_config(&config)
    .await
    .unwrap();

    assert_eq!(converter.base_currency(), "USD");
    let out = converter
        .convert_single(dec!(10), "人民币", None, Some(date(2025, 1, 10)))
        .await
        .unwrap();
    assert_eq!(out, dec!(1.389));
}
