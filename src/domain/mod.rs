// ==========================================
// 玻璃生产出入库单据 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod production;
pub mod slip;
pub mod types;

// 重导出核心类型
pub use production::{Product, ProductionMaterial, ProductionOrder, ProductionOutput};
pub use slip::{InventorySlip, InventorySlipDetail, MaterialOutputMapping};
pub use types::{DetailRole, ProductionOrderType, ProductionStatus, SlipStrategy};
