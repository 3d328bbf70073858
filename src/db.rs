// ==========================================
// 跨境电商数据中台 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入汇率缓存时的偶发 busy 错误
// - 提供字段字典/汇率缓存/配置表的建表语句
// ==========================================

use rusqlite::Connection;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 默认数据库文件名
pub const DEFAULT_DB_FILE: &str = "field_mapping.db";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径（用户数据目录下）
///
/// 无法解析用户数据目录时退回当前目录
pub fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("field-mapping-engine"))
        .unwrap_or_else(|| PathBuf::from("."))
        .join(DEFAULT_DB_FILE)
}

/// 初始化引擎所需的表结构（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS field_mapping_dictionary (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            field_code TEXT NOT NULL UNIQUE,
            cn_name TEXT NOT NULL,
            en_name TEXT,
            description TEXT,
            data_domain TEXT NOT NULL,
            field_group TEXT,
            is_required INTEGER NOT NULL DEFAULT 0,
            data_type TEXT NOT NULL DEFAULT 'string',
            synonyms TEXT NOT NULL DEFAULT '[]',
            match_weight REAL NOT NULL DEFAULT 1.0,
            active INTEGER NOT NULL DEFAULT 1,
            is_pattern_based INTEGER NOT NULL DEFAULT 0,
            field_pattern TEXT,
            dimension_config TEXT NOT NULL DEFAULT '{}',
            target_table TEXT,
            target_columns TEXT NOT NULL DEFAULT '{}',
            updated_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_dictionary_domain
            ON field_mapping_dictionary(data_domain, active, match_weight);

        CREATE TABLE IF NOT EXISTS dim_exchange_rate (
            from_currency TEXT NOT NULL,
            to_currency TEXT NOT NULL,
            rate_date TEXT NOT NULL,
            rate TEXT NOT NULL,
            source TEXT NOT NULL DEFAULT 'manual',
            priority INTEGER NOT NULL DEFAULT 99,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (from_currency, to_currency, rate_date)
        );

        CREATE TABLE IF NOT EXISTS config_scope (
            scope_id TEXT PRIMARY KEY,
            scope_type TEXT NOT NULL,
            scope_key TEXT NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now')),
            UNIQUE(scope_type, scope_key)
        );

        INSERT OR IGNORE INTO config_scope (scope_id, scope_type, scope_key)
        VALUES ('global', 'GLOBAL', 'global');

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL REFERENCES config_scope(scope_id) ON DELETE CASCADE,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )
}
