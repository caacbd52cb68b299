// ==========================================
// 玻璃生产出入库单据 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::slip_config_trait::{
    SlipConfigReader, DEFAULT_SHEET_UOM, DEFAULT_SLIP_CODE_PREFIX,
};
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

type ConfigResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ConfigResult<Self> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    pub fn get_global_config_value(&self, key: &str) -> ConfigResult<Option<String>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 写入 global scope 的配置值（UPSERT）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> ConfigResult<()> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;

        tracing::info!(key, value, "配置已更新");
        Ok(())
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> ConfigResult<String> {
        Ok(self
            .get_global_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> ConfigResult<String> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }
}

impl SlipConfigReader for ConfigManager {
    fn get_slip_code_prefix(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::SLIP_CODE_PREFIX, DEFAULT_SLIP_CODE_PREFIX)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(DEFAULT_SLIP_CODE_PREFIX.to_string());
        }
        Ok(trimmed.to_string())
    }

    fn get_sheet_uom(&self) -> ConfigResult<String> {
        let value = self.get_config_or_default(config_keys::SHEET_UOM, DEFAULT_SHEET_UOM)?;
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Ok(DEFAULT_SHEET_UOM.to_string());
        }
        Ok(trimmed.to_string())
    }

    fn get_finalize_requires_mapping(&self) -> ConfigResult<bool> {
        let value = self.get_config_or_default(config_keys::FINALIZE_REQUIRES_MAPPING, "true")?;
        match value.trim().to_lowercase().as_str() {
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Ok(true), // 默认开启
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 单据编号
    pub const SLIP_CODE_PREFIX: &str = "slip_code_prefix";

    // 物料目录
    pub const SHEET_UOM: &str = "sheet_uom";

    // 终审
    pub const FINALIZE_REQUIRES_MAPPING: &str = "finalize_requires_mapping";
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SlipSettings;

    fn setup() -> ConfigManager {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::apply_schema(&conn).unwrap();
        ConfigManager::from_connection(Arc::new(Mutex::new(conn))).unwrap()
    }

    #[test]
    fn test_defaults_when_missing() {
        let cfg = setup();
        assert_eq!(cfg.load_settings(), SlipSettings::default());
    }

    #[test]
    fn test_override_values() {
        let cfg = setup();
        cfg.set_global_config_value(config_keys::SLIP_CODE_PREFIX, "PX").unwrap();
        cfg.set_global_config_value(config_keys::FINALIZE_REQUIRES_MAPPING, "off").unwrap();
        cfg.set_global_config_value(config_keys::SHEET_UOM, "  ").unwrap();

        let s = cfg.load_settings();
        assert_eq!(s.slip_code_prefix, "PX");
        assert!(!s.finalize_requires_mapping);
        // 空白值回退默认
        assert_eq!(s.sheet_uom, DEFAULT_SHEET_UOM);

        let snapshot = cfg.get_config_snapshot().unwrap();
        assert!(snapshot.contains("slip_code_prefix"));
    }
}
