// ==========================================
// Mock 存储与提供方 - 用于集成测试
// ==========================================
// MemoryDictionaryStore: 内存字典，统计加载次数，可注入故障
// CountingRateStore: 内存汇率缓存，记录批量查询键与写入次数
// ScriptedProvider: 固定汇率表提供方，统计调用次数，可注入故障
// ==========================================

use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use field_mapping_engine::domain::{ExchangeRate, FieldDictionaryEntry, RatePair, RateSource};
use field_mapping_engine::engine::{ProviderError, RateProvider};
use field_mapping_engine::repository::{
    ExchangeRateStore, FieldDictionaryStore, RepositoryError, RepositoryResult,
};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

// ==========================================
// MemoryDictionaryStore
// ==========================================
pub struct MemoryDictionaryStore {
    entries: Mutex<Vec<FieldDictionaryEntry>>,
    load_count: AtomicUsize,
    fail: AtomicBool,
}

impl MemoryDictionaryStore {
    pub fn new(entries: Vec<FieldDictionaryEntry>) -> Self {
        Self {
            entries: Mutex::new(entries),
            load_count: AtomicUsize::new(0),
            fail: AtomicBool::new(false),
        }
    }

    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn push(&self, entry: FieldDictionaryEntry) {
        self.entries.lock().unwrap().push(entry);
    }
}

#[async_trait]
impl FieldDictionaryStore for MemoryDictionaryStore {
    async fn load_domain(
        &self,
        domain: Option<&str>,
    ) -> RepositoryResult<Vec<FieldDictionaryEntry>> {
        self.load_count.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseConnectionError(
                "字典存储不可用（注入故障）".to_string(),
            ));
        }

        let mut entries: Vec<FieldDictionaryEntry> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.active)
            .filter(|e| domain.map_or(true, |d| e.data_domain == d))
            .cloned()
            .collect();
        // 稳定排序: 同权重保持插入顺序
        entries.sort_by(|a, b| b.match_weight.total_cmp(&a.match_weight));
        Ok(entries)
    }
}

// ==========================================
// CountingRateStore
// ==========================================
#[derive(Default)]
pub struct CountingRateStore {
    rates: Mutex<HashMap<(String, String, NaiveDate), ExchangeRate>>,
    get_rates_calls: Mutex<Vec<BTreeSet<RatePair>>>,
    put_count: AtomicUsize,
    historical_calls: AtomicUsize,
    fail: AtomicBool,
}

impl CountingRateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// 预置缓存汇率（不计入 put_count）
    pub fn seed(&self, from: &str, to: &str, date: NaiveDate, rate: Decimal) {
        self.rates.lock().unwrap().insert(
            (from.to_string(), to.to_string(), date),
            ExchangeRate {
                from_currency: from.to_string(),
                to_currency: to.to_string(),
                rate_date: date,
                rate,
                source: RateSource::Manual,
                priority: 0,
            },
        );
    }

    pub fn stored(&self, from: &str, to: &str, date: NaiveDate) -> Option<ExchangeRate> {
        self.rates
            .lock()
            .unwrap()
            .get(&(from.to_string(), to.to_string(), date))
            .cloned()
    }

    pub fn get_rates_calls(&self) -> Vec<BTreeSet<RatePair>> {
        self.get_rates_calls.lock().unwrap().clone()
    }

    pub fn put_count(&self) -> usize {
        self.put_count.load(Ordering::SeqCst)
    }

    pub fn historical_calls(&self) -> usize {
        self.historical_calls.load(Ordering::SeqCst)
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn check_fail(&self) -> RepositoryResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(RepositoryError::DatabaseConnectionError(
                "汇率存储不可用（注入故障）".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ExchangeRateStore for CountingRateStore {
    async fn get_rates(
        &self,
        pairs: &BTreeSet<RatePair>,
        target: &str,
    ) -> RepositoryResult<HashMap<RatePair, Decimal>> {
        self.get_rates_calls.lock().unwrap().push(pairs.clone());
        self.check_fail()?;

        let rates = self.rates.lock().unwrap();
        Ok(pairs
            .iter()
            .filter_map(|(currency, date)| {
                rates
                    .get(&(currency.clone(), target.to_string(), *date))
                    .map(|r| ((currency.clone(), *date), r.rate))
            })
            .collect())
    }

    async fn put_rate(&self, rate: &ExchangeRate) -> RepositoryResult<()> {
        self.check_fail()?;
        self.put_count.fetch_add(1, Ordering::SeqCst);
        self.rates.lock().unwrap().insert(
            (
                rate.from_currency.clone(),
                rate.to_currency.clone(),
                rate.rate_date,
            ),
            rate.clone(),
        );
        Ok(())
    }

    async fn get_historical_rate(
        &self,
        from: &str,
        to: &str,
        before: NaiveDate,
        max_age_days: i64,
    ) -> RepositoryResult<Option<ExchangeRate>> {
        self.historical_calls.fetch_add(1, Ordering::SeqCst);
        self.check_fail()?;

        let earliest = before - Duration::days(max_age_days);
        let rates = self.rates.lock().unwrap();
        Ok(rates
            .values()
            .filter(|r| r.from_currency == from && r.to_currency == to)
            .filter(|r| r.rate_date < before && r.rate_date >= earliest)
            .max_by_key(|r| r.rate_date)
            .cloned())
    }
}

// ==========================================
// ScriptedProvider
// ==========================================
pub struct ScriptedProvider {
    name: String,
    priority: i32,
    dated: HashMap<(String, NaiveDate), Decimal>,
    undated: HashMap<String, Decimal>,
    fail: bool,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new(name: &str, priority: i32) -> Self {
        Self {
            name: name.to_string(),
            priority,
            dated: HashMap::new(),
            undated: HashMap::new(),
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// 每次调用均返回错误
    pub fn failing(name: &str, priority: i32) -> Self {
        Self {
            fail: true,
            ..Self::new(name, priority)
        }
    }

    /// 任意日期的汇率（到目标币种）
    pub fn with_rate(mut self, from: &str, rate: Decimal) -> Self {
        self.undated.insert(from.to_string(), rate);
        self
    }

    /// 指定日期的汇率
    pub fn with_dated_rate(mut self, from: &str, date: NaiveDate, rate: Decimal) -> Self {
        self.dated.insert((from.to_string(), date), rate);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateProvider for ScriptedProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> i32 {
        self.priority
    }

    async fn fetch_rate(
        &self,
        from: &str,
        _to: &str,
        date: NaiveDate,
    ) -> Result<Option<Decimal>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(ProviderError::InvalidPayload(format!(
                "{}: 注入故障",
                self.name
            )));
        }
        Ok(self
            .dated
            .get(&(from.to_string(), date))
            .or_else(|| self.undated.get(from))
            .copied())
    }
}
