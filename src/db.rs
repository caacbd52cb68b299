// ==========================================
// 玻璃生产出入库单据 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键级联删除依赖 foreign_keys）
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 建表 + 一次性映射/单据编号去重迁移
// ==========================================

use chrono::NaiveDateTime;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

use crate::repository::mapping_repo::MaterialOutputMappingRepository;
use crate::repository::slip_repo::InventorySlipRepository;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
///
/// v1: 单据/明细/映射基础表
/// v2: 映射 (input_detail_id, output_detail_id) 唯一索引（需先去重历史数据）
/// v3: 单据 is_finalized + slip_code 唯一索引
pub const CURRENT_SCHEMA_VERSION: i64 = 3;

/// 时间戳存储格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

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

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 建表 SQL（幂等）
///
/// 注意: 映射唯一索引不在这里创建，必须在历史重复数据清理之后创建
const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_code TEXT NOT NULL,
    product_name TEXT NOT NULL,
    product_type TEXT,
    uom TEXT,
    unit_price REAL
);

CREATE TABLE IF NOT EXISTS production_orders (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    production_order_code TEXT NOT NULL,
    order_type TEXT NOT NULL,
    description TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING'
);

CREATE TABLE IF NOT EXISTS production_outputs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    production_order_id INTEGER NOT NULL REFERENCES production_orders(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    product_name TEXT,
    uom TEXT,
    amount REAL NOT NULL DEFAULT 0,
    finished REAL,
    defected REAL
);

CREATE TABLE IF NOT EXISTS production_materials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    production_output_id INTEGER NOT NULL REFERENCES production_outputs(id),
    product_id INTEGER NOT NULL REFERENCES products(id),
    uom TEXT,
    amount REAL
);

CREATE TABLE IF NOT EXISTS inventory_slips (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    slip_code TEXT NOT NULL,
    description TEXT,
    production_order_id INTEGER NOT NULL REFERENCES production_orders(id),
    created_by INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    is_finalized INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS ix_inventory_slips_order
    ON inventory_slips(production_order_id);

CREATE TABLE IF NOT EXISTS inventory_slip_details (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    inventory_slip_id INTEGER NOT NULL REFERENCES inventory_slips(id) ON DELETE CASCADE,
    product_id INTEGER REFERENCES products(id),
    production_output_id INTEGER REFERENCES production_outputs(id),
    quantity REAL NOT NULL,
    note TEXT,
    sort_order INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_inventory_slip_details_slip
    ON inventory_slip_details(inventory_slip_id);

CREATE TABLE IF NOT EXISTS material_output_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    input_detail_id INTEGER NOT NULL REFERENCES inventory_slip_details(id) ON DELETE CASCADE,
    output_detail_id INTEGER NOT NULL REFERENCES inventory_slip_details(id) ON DELETE CASCADE,
    note TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS ix_material_output_mappings_output
    ON material_output_mappings(output_detail_id);
"#;

/// 唯一索引（去重之后创建）
const MAPPING_UNIQUE_INDEX_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS ux_material_output_mappings_pair
    ON material_output_mappings(input_detail_id, output_detail_id);
"#;

const SLIP_CODE_UNIQUE_INDEX_SQL: &str = r#"
CREATE UNIQUE INDEX IF NOT EXISTS ux_inventory_slips_slip_code
    ON inventory_slips(slip_code);
"#;

/// 应用 schema（幂等）
///
/// # 步骤
/// 1. 建表（IF NOT EXISTS）
/// 2. 历史重复映射去重（保留每对最小 id）
/// 3. 创建映射唯一索引
/// 4. 历史重复单据编号改写（最小 id 保留原编号，其余追加 -{id}）
/// 5. 创建 slip_code 唯一索引
/// 6. 写入 schema_version
///
/// # 返回
/// - Ok(usize): 去重删除的历史重复映射行数
pub fn apply_schema(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute_batch(SCHEMA_SQL)?;

    let removed = MaterialOutputMappingRepository::dedupe_legacy_pairs(conn)?;
    if removed > 0 {
        tracing::warn!(removed, "清理历史重复映射");
    }

    conn.execute_batch(MAPPING_UNIQUE_INDEX_SQL)?;

    let renamed = InventorySlipRepository::dedupe_legacy_codes(conn)?;
    if renamed > 0 {
        tracing::warn!(renamed, "改写历史重复单据编号");
    }

    conn.execute_batch(SLIP_CODE_UNIQUE_INDEX_SQL)?;

    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    Ok(removed)
}

/// 格式化时间戳
pub fn format_datetime(ts: &NaiveDateTime) -> String {
    ts.format(DATETIME_FORMAT).to_string()
}

/// 解析时间戳（格式异常回退到 1970-01-01 00:00:00）
pub fn parse_datetime(raw: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(raw, DATETIME_FORMAT).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        configure_sqlite_connection(&conn).unwrap();

        assert_eq!(read_schema_version(&conn).unwrap(), None);
        apply_schema(&conn).unwrap();
        apply_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_datetime_round_trip() {
        let ts = NaiveDateTime::parse_from_str("2025-08-19 18:17:44", DATETIME_FORMAT).unwrap();
        assert_eq!(parse_datetime(&format_datetime(&ts)), ts);
        assert_eq!(parse_datetime("not a date"), NaiveDateTime::default());
    }
}
