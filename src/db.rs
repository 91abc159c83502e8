// ==========================================
// 取件账户分配系统 - 数据库基础设施
// ==========================================
// 所有连接 (仓储 / 配置 / 测试) 都经由 open_sqlite_connection 打开
// 建表幂等, 首次启动与测试共用同一份 SQL
// ==========================================

use rusqlite::Connection;
use std::time::Duration;
use tracing::warn;

/// 写锁等待上限
pub const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// 本版本建表 SQL 对应的 schema 版本
pub const SCHEMA_VERSION: i64 = 1;

/// 连接级 PRAGMA (外键与 busy_timeout 不随数据库文件持久化)
pub fn apply_pragmas(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", true)?;
    conn.busy_timeout(BUSY_TIMEOUT)
}

pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    apply_pragmas(&conn)?;
    Ok(conn)
}

/// 已记录的 schema 版本; 未建表时为 None
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let tables: i64 = conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
        [],
        |row| row.get(0),
    )?;
    if tables == 0 {
        return Ok(None);
    }
    conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))
}

/// 初始化数据库 schema（幂等）
///
/// 日期列统一存 ISO 文本 (YYYY-MM-DD / HH:MM:SS)，与 rusqlite chrono 特性一致
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [SCHEMA_VERSION],
    )?;

    if let Some(found) = read_schema_version(conn)? {
        if found > SCHEMA_VERSION {
            warn!(found, expected = SCHEMA_VERSION, "数据库 schema 版本高于当前程序");
        }
    }
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
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

-- ===== 承运商 / 排程 / 服务器 =====
CREATE TABLE IF NOT EXISTS contractor (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS server_schedule (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    time_min_min_per_step REAL NOT NULL,
    time_max_min_per_step REAL NOT NULL,
    time_start TEXT NOT NULL,
    time_end TEXT NOT NULL,
    time_first_point TEXT NOT NULL,
    time_second_point TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS server (
    id INTEGER PRIMARY KEY,
    number TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL,
    is_active INTEGER NOT NULL DEFAULT 1,
    schedule_id INTEGER NOT NULL REFERENCES server_schedule(id)
);

CREATE TABLE IF NOT EXISTS server_contractor (
    server_id INTEGER NOT NULL REFERENCES server(id) ON DELETE CASCADE,
    contractor_id INTEGER NOT NULL REFERENCES contractor(id),
    load_percent REAL NOT NULL,
    load_j_min INTEGER NOT NULL DEFAULT 0,
    load_j_max INTEGER NOT NULL DEFAULT 1000000,
    load_l_min INTEGER NOT NULL DEFAULT 0,
    load_l_max INTEGER NOT NULL DEFAULT 1000000,
    load_t_min INTEGER NOT NULL DEFAULT 0,
    load_t_max INTEGER NOT NULL DEFAULT 1000000,
    load_i INTEGER NOT NULL DEFAULT 1000000,
    load_m TEXT NOT NULL,
    PRIMARY KEY (server_id, contractor_id)
);

-- ===== 地址 / 账户 / 组织 =====
CREATE TABLE IF NOT EXISTS address (
    id INTEGER PRIMARY KEY,
    address TEXT NOT NULL,
    district TEXT,
    contractor_id INTEGER NOT NULL REFERENCES contractor(id),
    is_active INTEGER NOT NULL DEFAULT 1
);

CREATE TABLE IF NOT EXISTS account (
    id INTEGER PRIMARY KEY,
    number TEXT NOT NULL UNIQUE,
    name TEXT NOT NULL DEFAULT '',
    is_active INTEGER NOT NULL DEFAULT 1,
    reg_date TEXT,
    address_id INTEGER NOT NULL REFERENCES address(id),
    server_id INTEGER NOT NULL REFERENCES server(id)
);

CREATE TABLE IF NOT EXISTS organization (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    server_id INTEGER NOT NULL REFERENCES server(id)
);

CREATE TABLE IF NOT EXISTS server_client (
    server_id INTEGER NOT NULL REFERENCES server(id) ON DELETE CASCADE,
    org_id INTEGER NOT NULL REFERENCES organization(id) ON DELETE CASCADE,
    load_i INTEGER NOT NULL,
    PRIMARY KEY (server_id, org_id)
);

-- ===== 订单 (当日任务 + 历史) =====
CREATE TABLE IF NOT EXISTS orders (
    id INTEGER PRIMARY KEY,
    org_id INTEGER NOT NULL REFERENCES organization(id),
    article TEXT NOT NULL,
    size TEXT,
    keyword TEXT,
    price INTEGER,
    status TEXT NOT NULL,
    dt_planned TEXT,
    dt_ordered TEXT,
    dt_collected TEXT,
    account_id INTEGER REFERENCES account(id),
    address_id INTEGER REFERENCES address(id),
    scheduled_at TEXT
);

CREATE INDEX IF NOT EXISTS idx_orders_planned ON orders(status, dt_planned);
CREATE INDEX IF NOT EXISTS idx_orders_account ON orders(account_id);

-- ===== 运行历史 =====
CREATE TABLE IF NOT EXISTS picker_history (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    server_id INTEGER NOT NULL REFERENCES server(id),
    run_at TEXT NOT NULL,
    logs_artifact TEXT NOT NULL,
    result_artifact TEXT
);
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(SCHEMA_VERSION));
    }

    #[test]
    fn test_pragmas_enable_foreign_keys() {
        let conn = Connection::open_in_memory().unwrap();
        apply_pragmas(&conn).unwrap();
        let enabled: i64 = conn
            .pragma_query_value(None, "foreign_keys", |row| row.get(0))
            .unwrap();
        assert_eq!(enabled, 1);
    }

    #[test]
    fn test_schema_version_absent_on_empty_db() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }
}
