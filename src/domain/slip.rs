// ==========================================
// 玻璃生产出入库单据 - 单据领域模型
// ==========================================
// 对齐: inventory_slips / inventory_slip_details / material_output_mappings 表
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// InventorySlip - 单据头
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySlip {
    pub id: i64,
    pub slip_code: String,
    pub description: Option<String>,
    pub production_order_id: i64,
    pub created_by: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub is_finalized: bool,
}

// ==========================================
// InventorySlipDetail - 单据明细
// ==========================================
// product_id 为 None 表示目标成品行（不是实物物料）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventorySlipDetail {
    pub id: i64,
    pub inventory_slip_id: i64,
    pub product_id: Option<i64>,
    pub production_output_id: Option<i64>,
    pub quantity: f64,
    pub note: Option<String>,
    pub sort_order: i32,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl InventorySlipDetail {
    /// 是否为目标成品行
    pub fn is_target_line(&self) -> bool {
        self.product_id.is_none()
    }
}

// ==========================================
// MaterialOutputMapping - 物料→产出映射边
// ==========================================
// 红线: 两端明细必须属于同一单据；(input, output) 唯一
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaterialOutputMapping {
    pub id: i64,
    pub input_detail_id: i64,
    pub output_detail_id: i64,
    pub note: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}
