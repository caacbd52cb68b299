// ==========================================
// 玻璃生产出入库单据 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享状态和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;

use crate::api::{InventorySlipApi, ProductionOrderApi};
use crate::config::config_manager::ConfigManager;
use crate::config::SlipConfigReader;
use crate::db::{apply_schema, open_sqlite_connection};
use crate::engine::{ProductionOrderService, ProductionOutputService, QuantityReconciler};
use crate::services::{SqliteProductionOrderService, SqliteProductionOutputService};

/// 应用状态
///
/// 所有 API 共享同一个连接（Arc<Mutex<Connection>>）
pub struct AppState {
    /// 数据库路径（内存库为 ":memory:"）
    pub db_path: String,

    /// 共享连接
    pub conn: Arc<Mutex<Connection>>,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 出入库单据API
    pub slip_api: Arc<InventorySlipApi>,

    /// 生产指令信息API
    pub production_order_api: Arc<ProductionOrderApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 打开数据库 → 应用 schema（含历史映射去重）→ 装配 API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!(db_path = %db_path, "初始化AppState");

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        let removed = apply_schema(&conn).map_err(|e| format!("无法初始化数据库结构: {}", e))?;
        if removed > 0 {
            tracing::info!(removed, "历史重复映射已清理");
        }

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)))?;
        state.db_path = db_path;
        Ok(state)
    }

    /// 基于已初始化 schema 的连接装配
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        let config_manager = Arc::new(
            ConfigManager::from_connection(conn.clone())
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        let output_service: Arc<dyn ProductionOutputService> =
            Arc::new(SqliteProductionOutputService::from_connection(conn.clone()));
        let order_service: Arc<dyn ProductionOrderService> =
            Arc::new(SqliteProductionOrderService::from_connection(conn.clone()));

        Ok(Self::with_services(conn, config_manager, output_service, order_service))
    }

    /// 使用自定义协作服务装配（便于替换完成量回写实现）
    pub fn with_services(
        conn: Arc<Mutex<Connection>>,
        config_manager: Arc<ConfigManager>,
        output_service: Arc<dyn ProductionOutputService>,
        order_service: Arc<dyn ProductionOrderService>,
    ) -> Self {
        let config: Arc<dyn SlipConfigReader> = config_manager.clone();
        let reconciler = QuantityReconciler::new(output_service, order_service);

        let slip_api = Arc::new(InventorySlipApi::new(conn.clone(), config.clone(), reconciler));
        let production_order_api = Arc::new(ProductionOrderApi::new(conn.clone(), config));

        Self {
            db_path: ":memory:".to_string(),
            conn,
            config_manager,
            slip_api,
            production_order_api,
        }
    }
}

/// 获取默认数据库路径
///
/// 优先级: GLASS_SLIP_DB_PATH 环境变量 → 用户数据目录 → 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("GLASS_SLIP_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./glass_slip.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("glass-slip-engine");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("glass_slip.db");
        }
    }

    path.to_string_lossy().to_string()
}
