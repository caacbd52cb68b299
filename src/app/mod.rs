// ==========================================
// 玻璃生产出入库单据 - 应用层
// ==========================================
// 职责: 共享连接与 API 实例装配,供传输层持有
// ==========================================

pub mod state;

// 重导出
pub use state::{get_default_db_path, AppState};
