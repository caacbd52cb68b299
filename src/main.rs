// ==========================================
// 玻璃生产出入库单据 - 维护工具入口
// ==========================================
// 用法:
//   slip-admin [db_path]                 建表/迁移并输出概要
//   slip-admin [db_path] config KEY VAL  写入 global 配置
//
// db_path 缺省时使用 GLASS_SLIP_DB_PATH 或用户数据目录
// ==========================================

use anyhow::{bail, Context};
use glass_slip_engine::app::get_default_db_path;
use glass_slip_engine::config::ConfigManager;
use glass_slip_engine::db::{apply_schema, open_sqlite_connection, read_schema_version};
use std::sync::{Arc, Mutex};

fn main() -> anyhow::Result<()> {
    glass_slip_engine::logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let (db_path, rest) = match args.first() {
        Some(first) if first != "config" => (first.clone(), &args[1..]),
        _ => (get_default_db_path(), &args[..]),
    };

    tracing::info!("{} v{}", glass_slip_engine::APP_NAME, glass_slip_engine::VERSION);
    tracing::info!(db_path = %db_path, "使用数据库");

    let conn = open_sqlite_connection(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;
    let before = read_schema_version(&conn)?;
    let removed = apply_schema(&conn).context("schema 初始化失败")?;
    let after = read_schema_version(&conn)?;

    let slip_count: i64 = conn.query_row("SELECT COUNT(*) FROM inventory_slips", [], |row| row.get(0))?;
    let mapping_count: i64 =
        conn.query_row("SELECT COUNT(*) FROM material_output_mappings", [], |row| row.get(0))?;

    match rest {
        [] => {}
        [cmd, key, value] if cmd == "config" => {
            let manager = ConfigManager::from_connection(Arc::new(Mutex::new(conn)))
                .map_err(|e| anyhow::anyhow!("无法创建ConfigManager: {}", e))?;
            manager
                .set_global_config_value(key, value)
                .map_err(|e| anyhow::anyhow!("配置写入失败: {}", e))?;
            println!("config {}={}", key, value);
        }
        other => bail!("无法识别的参数: {:?}", other),
    }

    println!("schema_version={:?} -> {:?}", before, after);
    println!("deduped_mappings={}", removed);
    println!("slips={} mappings={}", slip_count, mapping_count);
    Ok(())
}
