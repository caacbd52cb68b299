// ==========================================
// 玻璃生产出入库单据 - API 层
// ==========================================
// 职责: 提供业务 API 接口,供传输层（HTTP 等）调用
// ==========================================

pub mod dto;
pub mod error;
pub mod production_order_api;
pub mod slip_api;
pub mod validator;

// 重导出核心类型
pub use dto::{
    CreateSlipRequest, LineRef, MappingEdge, MappingEdgeRequest, ProductionMaterialView,
    ProductionOrderInfo, ProductionTargetRequest, ReconciliationOutcome, SlipCreated,
    SlipDetailView, SlipLineRequest, SlipStockMovement, SlipView, StockLine,
};
pub use error::{ApiError, ApiResult, ErrorResponse, ValidationViolation};
pub use production_order_api::ProductionOrderApi;
pub use slip_api::{InventorySlipApi, TARGET_NOTE_PREFIX};
pub use validator::{validate_mapping_edges, validate_slip_request};
