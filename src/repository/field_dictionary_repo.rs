// ==========================================
// 跨境电商数据中台 - 字段字典仓储
// ==========================================
// 职责: field_mapping_dictionary 表的读取（引擎）与写入（种子/管理工具）
// 红线: Repository 不含匹配逻辑，只负责数据访问
// ==========================================

use crate::domain::field_dictionary::FieldDictionaryEntry;
use crate::domain::types::DimensionRule;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// FieldDictionaryStore Trait
// ==========================================
// 用途: 模式匹配器按域加载字典
// 实现者: SqliteFieldDictionaryRepository / 测试用内存实现
#[async_trait]
pub trait FieldDictionaryStore: Send + Sync {
    /// 加载某数据域的启用字典
    ///
    /// # 参数
    /// - domain: 数据域（None 表示全部域）
    ///
    /// # 返回
    /// - Ok(Vec): active = true，按 match_weight 降序
    /// - Err: 存储不可用
    async fn load_domain(&self, domain: Option<&str>)
        -> RepositoryResult<Vec<FieldDictionaryEntry>>;
}

// ==========================================
// SqliteFieldDictionaryRepository
// ==========================================
pub struct SqliteFieldDictionaryRepository {
    conn: Arc<Mutex<Connection>>,
}

const SELECT_COLUMNS: &str = r#"
    SELECT
        field_code, cn_name, en_name, description,
        data_domain, field_group, is_required, data_type,
        synonyms, match_weight, active,
        is_pattern_based, field_pattern, dimension_config,
        target_table, target_columns
    FROM field_mapping_dictionary
"#;

impl SqliteFieldDictionaryRepository {
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

    /// 插入或更新字典条目（按 field_code）
    pub fn upsert_entry(&self, entry: &FieldDictionaryEntry) -> RepositoryResult<()> {
        if entry.is_pattern_based && entry.field_pattern.is_none() {
            return Err(RepositoryError::ValidationError(format!(
                "模式字段缺少 field_pattern: {}",
                entry.field_code
            )));
        }

        let dimension_config: BTreeMap<&String, serde_json::Value> = entry
            .dimension_config
            .iter()
            .map(|(k, v)| (k, v.to_json()))
            .collect();

        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO field_mapping_dictionary (
                field_code, cn_name, en_name, description,
                data_domain, field_group, is_required, data_type,
                synonyms, match_weight, active,
                is_pattern_based, field_pattern, dimension_config,
                target_table, target_columns
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
            ON CONFLICT(field_code) DO UPDATE SET
                cn_name = excluded.cn_name,
                en_name = excluded.en_name,
                description = excluded.description,
                data_domain = excluded.data_domain,
                field_group = excluded.field_group,
                is_required = excluded.is_required,
                data_type = excluded.data_type,
                synonyms = excluded.synonyms,
                match_weight = excluded.match_weight,
                active = excluded.active,
                is_pattern_based = excluded.is_pattern_based,
                field_pattern = excluded.field_pattern,
                dimension_config = excluded.dimension_config,
                target_table = excluded.target_table,
                target_columns = excluded.target_columns,
                updated_at = datetime('now')
            "#,
            params![
                entry.field_code,
                entry.cn_name,
                entry.en_name,
                entry.description,
                entry.data_domain,
                entry.field_group,
                entry.is_required,
                entry.data_type,
                serde_json::to_string(&entry.synonyms)?,
                entry.match_weight,
                entry.active,
                entry.is_pattern_based,
                entry.field_pattern,
                serde_json::to_string(&dimension_config)?,
                entry.target_table,
                serde_json::to_string(&entry.target_columns)?,
            ],
        )?;
        Ok(())
    }

    /// 启用/停用字典条目
    ///
    /// # 返回
    /// - Ok(true): 条目存在并已更新
    /// - Ok(false): 条目不存在
    pub fn set_active(&self, field_code: &str, active: bool) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            r#"
            UPDATE field_mapping_dictionary
            SET active = ?2, updated_at = datetime('now')
            WHERE field_code = ?1
            "#,
            params![field_code, active],
        )?;
        Ok(affected > 0)
    }

    fn query_entries(&self, domain: Option<&str>) -> RepositoryResult<Vec<FieldDictionaryEntry>> {
        let conn = self.get_conn()?;

        let rows: Vec<RawEntryRow> = match domain {
            Some(d) => {
                let sql = format!(
                    "{} WHERE active = 1 AND data_domain = ?1 ORDER BY match_weight DESC, id ASC",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map(params![d], RawEntryRow::from_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let sql = format!(
                    "{} WHERE active = 1 ORDER BY match_weight DESC, id ASC",
                    SELECT_COLUMNS
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt
                    .query_map([], RawEntryRow::from_row)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        rows.into_iter().map(RawEntryRow::into_entry).collect()
    }
}

#[async_trait]
impl FieldDictionaryStore for SqliteFieldDictionaryRepository {
    #[tracing::instrument(skip(self))]
    async fn load_domain(
        &self,
        domain: Option<&str>,
    ) -> RepositoryResult<Vec<FieldDictionaryEntry>> {
        let entries = self.query_entries(domain)?;
        tracing::debug!(count = entries.len(), "字典加载完成");
        Ok(entries)
    }
}

// ==========================================
// 行映射（JSON 列延后解析）
// ==========================================
struct RawEntryRow {
    entry: FieldDictionaryEntry,
    synonyms: String,
    dimension_config: String,
    target_columns: String,
}

impl RawEntryRow {
    fn from_row(row: &Row<'_>) -> SqliteResult<Self> {
        Ok(Self {
            entry: FieldDictionaryEntry {
                field_code: row.get(0)?,
                cn_name: row.get(1)?,
                en_name: row.get(2)?,
                description: row.get(3)?,
                data_domain: row.get(4)?,
                field_group: row.get(5)?,
                is_required: row.get(6)?,
                data_type: row.get(7)?,
                match_weight: row.get(9)?,
                active: row.get(10)?,
                is_pattern_based: row.get(11)?,
                field_pattern: row.get(12)?,
                target_table: row.get(14)?,
                ..Default::default()
            },
            synonyms: row.get(8)?,
            dimension_config: row.get(13)?,
            target_columns: row.get(15)?,
        })
    }

    fn into_entry(self) -> RepositoryResult<FieldDictionaryEntry> {
        let mut entry = self.entry;
        entry.synonyms = parse_json_column(&entry.field_code, "synonyms", &self.synonyms)?;
        let raw_dims: BTreeMap<String, serde_json::Value> =
            parse_json_column(&entry.field_code, "dimension_config", &self.dimension_config)?;
        entry.dimension_config = raw_dims
            .iter()
            .map(|(k, v)| (k.clone(), DimensionRule::from_json(v)))
            .collect();
        entry.target_columns =
            parse_json_column(&entry.field_code, "target_columns", &self.target_columns)?;
        Ok(entry)
    }
}

fn parse_json_column<T: serde::de::DeserializeOwned + Default>(
    field_code: &str,
    column: &str,
    raw: &str,
) -> RepositoryResult<T> {
    if raw.trim().is_empty() {
        return Ok(T::default());
    }
    serde_json::from_str(raw).map_err(|e| RepositoryError::CorruptData {
        field: format!("{}.{}", field_code, column),
        message: e.to_string(),
    })
}
