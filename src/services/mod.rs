// ==========================================
// 玻璃生产出入库单据 - 外部协作方默认实现
// ==========================================
// 职责: 基于 SQLite 实现 engine::collaborators 中的服务 trait
// ==========================================

pub mod production_order_service;
pub mod production_output_service;

pub use production_order_service::SqliteProductionOrderService;
pub use production_output_service::SqliteProductionOutputService;
