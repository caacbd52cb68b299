// ==========================================
// 玻璃生产出入库单据 - 引擎层
// ==========================================
// 职责: 角色判定、单据编号、完成量回写等业务规则
// 红线: Engine 不拼 SQL（编号生成经由仓储 *_tx 函数访问数据）
// ==========================================

pub mod classification;
pub mod collaborators;
pub mod reconciliation;
pub mod slip_code;

// 重导出核心引擎
pub use classification::{classify, sort_for_display, ClassificationContext};
pub use collaborators::{CollaboratorResult, ProductionOrderService, ProductionOutputService};
pub use reconciliation::{
    plan_contributions, Contribution, QuantityReconciler, ReconciliationError,
    ReconciliationReport,
};
pub use slip_code::{format_slip_code, SlipCodeGenerator, MAX_CODE_ATTEMPTS};
