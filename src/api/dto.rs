// ==========================================
// 玻璃生产出入库单据 - API 请求/响应结构
// ==========================================

use crate::domain::production::{Product, ProductionMaterial, ProductionOutput};
use crate::domain::slip::MaterialOutputMapping;
use crate::domain::types::{DetailRole, ProductionStatus, SlipStrategy};
use crate::engine::reconciliation::ReconciliationReport;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// 请求
// ==========================================

/// 单据明细行请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipLineRequest {
    /// 为空表示目标成品（仅由系统追加，调用方一般不传空）
    pub product_id: Option<i64>,
    pub quantity: f64,
    #[serde(default)]
    pub note: Option<String>,
    /// 缺省时取行下标
    #[serde(default)]
    pub sort_order: Option<i32>,
    #[serde(default)]
    pub production_output_id: Option<i64>,
}

/// 映射边请求（以明细行下标表示，插入后解析为明细 id）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingEdgeRequest {
    pub input_index: usize,
    pub output_index: usize,
}

/// 生产目标（仅物料出库）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionTargetRequest {
    pub production_output_id: i64,
    pub target_quantity: f64,
}

/// 创建/更新单据请求
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSlipRequest {
    pub production_order_id: i64,
    #[serde(default)]
    pub description: Option<String>,
    pub lines: Vec<SlipLineRequest>,
    #[serde(default)]
    pub mappings: Vec<MappingEdgeRequest>,
    #[serde(default)]
    pub targets: Vec<ProductionTargetRequest>,
}

/// 已持久化明细之间的映射边
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappingEdge {
    pub input_detail_id: i64,
    pub output_detail_id: i64,
}

// ==========================================
// 响应
// ==========================================

/// 单据明细视图（含读时判定的角色）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipDetailView {
    pub id: i64,
    pub product_id: Option<i64>,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub uom: Option<String>,
    pub unit_price: Option<f64>,
    pub production_output_id: Option<i64>,
    pub quantity: f64,
    pub note: Option<String>,
    pub sort_order: i32,
    pub role: DetailRole,
    pub role_label: String,
    /// 关联计划产出的产品名称
    pub target_product_name: Option<String>,
    pub outgoing: Vec<MaterialOutputMapping>,
    pub incoming: Vec<MaterialOutputMapping>,
}

/// 单据视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipView {
    pub id: i64,
    pub slip_code: String,
    pub description: Option<String>,
    pub production_order_id: i64,
    pub production_order_code: Option<String>,
    pub order_type: Option<String>,
    /// 生产指令类型无法识别时为空
    pub strategy: Option<SlipStrategy>,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_finalized: bool,
    pub details: Vec<SlipDetailView>,
    pub mappings: Vec<MaterialOutputMapping>,
}

/// 请求下标 → 明细 id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineRef {
    pub index: usize,
    pub detail_id: i64,
}

/// 提交后回写结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReconciliationOutcome {
    Applied(ReconciliationReport),
    /// 回写失败（单据已提交，不回滚）
    Failed { message: String },
}

impl ReconciliationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, ReconciliationOutcome::Applied(_))
    }
}

/// 创建单据结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipCreated {
    pub slip: SlipView,
    /// lines[index] → 明细 id
    pub line_ids: Vec<LineRef>,
    /// targets[index] → 目标成品明细 id
    pub target_line_ids: Vec<LineRef>,
    pub reconciliation: ReconciliationOutcome,
}

impl SlipCreated {
    /// 按请求行下标查明细 id
    pub fn detail_id_of_line(&self, index: usize) -> Option<i64> {
        self.line_ids
            .iter()
            .find(|r| r.index == index)
            .map(|r| r.detail_id)
    }
}

/// 出入库行（对账/会计同步）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockLine {
    pub detail_id: i64,
    pub product_id: Option<i64>,
    pub production_output_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: f64,
    pub unit_price: Option<f64>,
    pub role: DetailRole,
}

/// 单据出入库拆分
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlipStockMovement {
    pub slip_id: i64,
    pub slip_code: String,
    pub created_by: i64,
    /// 出库（消耗）
    pub exported: Vec<StockLine>,
    /// 入库（产出）
    pub imported: Vec<StockLine>,
}

/// 生产指令信息（供调用方组装创建请求）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrderInfo {
    pub id: i64,
    pub production_order_code: String,
    pub order_type: String,
    pub description: Option<String>,
    pub status: ProductionStatus,
    pub planned_outputs: Vec<ProductionOutput>,
    pub raw_materials: Vec<Product>,
    pub semi_finished: Vec<Product>,
    pub glass_offcuts: Vec<Product>,
    /// 切玻璃: 上述三类去重合并；物料出库: 候选产品
    pub available_products: Vec<Product>,
}

/// BOM 物料行视图
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionMaterialView {
    pub material: ProductionMaterial,
    pub product_code: Option<String>,
    pub product_name: Option<String>,
}
