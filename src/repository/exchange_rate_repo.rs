// ==========================================
// 跨境电商数据中台 - 汇率缓存仓储
// ==========================================
// 职责: dim_exchange_rate 表的批量读取、写穿缓存、历史回退查询
// 并发: 连接由 Mutex 串行化，同键写入后写覆盖
// ==========================================

use crate::domain::exchange_rate::{ExchangeRate, RatePair};
use crate::domain::types::RateSource;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use rusqlite::{params, params_from_iter, Connection, Result as SqliteResult};
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap};
use std::str::FromStr;
use std::sync::{Arc, Mutex};

/// 日期存储格式
pub const RATE_DATE_FORMAT: &str = "%Y-%m-%d";

/// 单条 SQL 的最大批量键数（每键 2 个参数）
const MAX_PAIRS_PER_QUERY: usize = 400;

// ==========================================
// ExchangeRateStore Trait
// ==========================================
// 用途: 货币换算器的汇率缓存
// 实现者: SqliteExchangeRateRepository / 测试用计数实现
#[async_trait]
pub trait ExchangeRateStore: Send + Sync {
    /// 批量查询已缓存汇率
    ///
    /// # 参数
    /// - pairs: 去重后的 (币种, 日期) 集合
    /// - target: 目标币种
    ///
    /// # 返回
    /// - Ok(HashMap): 仅包含命中的键
    /// - Err: 存储不可用
    async fn get_rates(
        &self,
        pairs: &BTreeSet<RatePair>,
        target: &str,
    ) -> RepositoryResult<HashMap<RatePair, Decimal>>;

    /// 写入汇率（幂等 upsert，后写覆盖）
    async fn put_rate(&self, rate: &ExchangeRate) -> RepositoryResult<()>;

    /// 查询历史回退汇率
    ///
    /// # 返回
    /// - Ok(Some): [before - max_age_days, before) 区间内最近的一条
    /// - Ok(None): 区间内无记录
    async fn get_historical_rate(
        &self,
        from: &str,
        to: &str,
        before: NaiveDate,
        max_age_days: i64,
    ) -> RepositoryResult<Option<ExchangeRate>>;
}

// ==========================================
// SqliteExchangeRateRepository
// ==========================================
pub struct SqliteExchangeRateRepository {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteExchangeRateRepository {
    /// 创建新的仓储实例
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 统计缓存条数（运维/测试用）
    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let n = conn.query_row("SELECT COUNT(*) FROM dim_exchange_rate", [], |row| {
            row.get(0)
        })?;
        Ok(n)
    }
}

#[async_trait]
impl ExchangeRateStore for SqliteExchangeRateRepository {
    #[tracing::instrument(skip(self, pairs), fields(pair_count = pairs.len()))]
    async fn get_rates(
        &self,
        pairs: &BTreeSet<RatePair>,
        target: &str,
    ) -> RepositoryResult<HashMap<RatePair, Decimal>> {
        let mut found = HashMap::new();
        if pairs.is_empty() {
            return Ok(found);
        }

        let conn = self.get_conn()?;
        let all: Vec<&RatePair> = pairs.iter().collect();

        for chunk in all.chunks(MAX_PAIRS_PER_QUERY) {
            let placeholders = (0..chunk.len())
                .map(|i| format!("(?{}, ?{})", i * 2 + 2, i * 2 + 3))
                .collect::<Vec<_>>()
                .join(", ");
            let sql = format!(
                r#"
                SELECT from_currency, rate_date, rate
                FROM dim_exchange_rate
                WHERE to_currency = ?1
                  AND (from_currency, rate_date) IN (VALUES {})
                "#,
                placeholders
            );

            let mut values: Vec<String> = Vec::with_capacity(chunk.len() * 2 + 1);
            values.push(target.to_string());
            for (currency, date) in chunk {
                values.push(currency.clone());
                values.push(date.format(RATE_DATE_FORMAT).to_string());
            }

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(values.iter()), |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<SqliteResult<Vec<_>>>()?;

            for (currency, raw_date, raw_rate) in rows {
                let date = parse_rate_date(&raw_date)?;
                let rate = parse_rate(&raw_rate)?;
                found.insert((currency, date), rate);
            }
        }

        tracing::debug!(hit_count = found.len(), "汇率缓存批量查询完成");
        Ok(found)
    }

    async fn put_rate(&self, rate: &ExchangeRate) -> RepositoryResult<()> {
        if rate.rate <= Decimal::ZERO {
            return Err(RepositoryError::ValidationError(format!(
                "汇率必须为正数: {}/{} {} = {}",
                rate.from_currency, rate.to_currency, rate.rate_date, rate.rate
            )));
        }

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO dim_exchange_rate (
                from_currency, to_currency, rate_date, rate, source, priority
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(from_currency, to_currency, rate_date) DO UPDATE SET
                rate = excluded.rate,
                source = excluded.source,
                priority = excluded.priority,
                updated_at = datetime('now')
            "#,
            params![
                rate.from_currency,
                rate.to_currency,
                rate.rate_date.format(RATE_DATE_FORMAT).to_string(),
                rate.rate.to_string(),
                rate.source.as_str(),
                rate.priority,
            ],
        )?;
        Ok(())
    }

    async fn get_historical_rate(
        &self,
        from: &str,
        to: &str,
        before: NaiveDate,
        max_age_days: i64,
    ) -> RepositoryResult<Option<ExchangeRate>> {
        let earliest = Duration::try_days(max_age_days.max(0))
            .and_then(|window| before.checked_sub_signed(window))
            .unwrap_or(NaiveDate::MIN);

        let conn = self.get_conn()?;
        let result = conn.query_row(
            r#"
            SELECT rate_date, rate, source, priority
            FROM dim_exchange_rate
            WHERE from_currency = ?1
              AND to_currency = ?2
              AND rate_date < ?3
              AND rate_date >= ?4
            ORDER BY rate_date DESC
            LIMIT 1
            "#,
            params![
                from,
                to,
                before.format(RATE_DATE_FORMAT).to_string(),
                earliest.format(RATE_DATE_FORMAT).to_string(),
            ],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, i32>(3)?,
                ))
            },
        );

        match result {
            Ok((raw_date, raw_rate, source, priority)) => Ok(Some(ExchangeRate {
                from_currency: from.to_string(),
                to_currency: to.to_string(),
                rate_date: parse_rate_date(&raw_date)?,
                rate: parse_rate(&raw_rate)?,
                source: RateSource::from_db_str(&source),
                priority,
            })),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

fn parse_rate_date(raw: &str) -> RepositoryResult<NaiveDate> {
    NaiveDate::parse_from_str(raw, RATE_DATE_FORMAT).map_err(|e| RepositoryError::CorruptData {
        field: "rate_date".to_string(),
        message: format!("{} ({})", raw, e),
    })
}

fn parse_rate(raw: &str) -> RepositoryResult<Decimal> {
    Decimal::from_str(raw.trim()).map_err(|e| RepositoryError::CorruptData {
        field: "rate".to_string(),
        message: format!("{} ({})", raw, e),
    })
}
