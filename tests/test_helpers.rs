// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化等功能
// ==========================================

#![allow(dead_code)]

use glass_slip_engine::db::{apply_schema, open_sqlite_connection};
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_str().unwrap().to_string();

    let conn = open_sqlite_connection(&db_path)?;
    apply_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 统计表行数
pub fn count_rows(conn: &Connection, table: &str) -> i64 {
    conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| row.get(0))
        .unwrap()
}
