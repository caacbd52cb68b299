// ==========================================
// 玻璃生产出入库单据 - 配置层
// ==========================================
// 职责: 单据引擎配置读取与覆写
// 存储: config_kv 表（scope_id = 'global'）
// ==========================================

pub mod config_manager;
pub mod slip_config_trait;

pub use config_manager::{config_keys, ConfigManager};
pub use slip_config_trait::{SlipConfigReader, SlipSettings};
