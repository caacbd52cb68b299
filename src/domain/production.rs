// ==========================================
// 玻璃生产出入库单据 - 生产指令领域模型
// ==========================================
// 说明: 生产指令/计划产出/BOM 由外部模块维护，本引擎只读
//       （计划产出的 finished 仅由完成量回写累加）
// ==========================================

use crate::domain::types::{ProductionOrderType, ProductionStatus};
use serde::{Deserialize, Serialize};

// ==========================================
// Product - 产品目录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: i64,
    pub product_code: String,
    pub product_name: String,
    pub product_type: Option<String>, // NVL / Nguyên vật liệu / Bán thành phẩm ...
    pub uom: Option<String>,          // 计量单位（tấm = 片）
    pub unit_price: Option<f64>,
}

impl Product {
    /// 是否为原材料类型（NVL）
    pub fn is_raw_material_type(&self) -> bool {
        matches!(
            self.product_type.as_deref(),
            Some("NVL") | Some("Nguyên vật liệu")
        )
    }

    /// 计量单位是否匹配（忽略大小写）
    pub fn has_uom(&self, uom: &str) -> bool {
        self.uom
            .as_deref()
            .map(|u| u.to_lowercase() == uom.to_lowercase())
            .unwrap_or(false)
    }
}

// ==========================================
// ProductionOrder - 生产指令
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOrder {
    pub id: i64,
    pub production_order_code: String,
    pub order_type: String, // 原始类型标签（可能是未知值）
    pub description: Option<String>,
    pub status: ProductionStatus,
}

impl ProductionOrder {
    /// 解析类型标签
    pub fn kind(&self) -> Option<ProductionOrderType> {
        ProductionOrderType::from_db_str(&self.order_type)
    }
}

// ==========================================
// ProductionOutput - 计划产出
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionOutput {
    pub id: i64,
    pub production_order_id: i64,
    pub product_id: i64,
    pub product_name: Option<String>,
    pub uom: Option<String>,
    pub amount: f64,   // 计划数量
    pub finished: f64, // 累计完成数量
    pub defected: f64, // 累计不良数量
}

impl ProductionOutput {
    /// 是否已完成（完成量 >= 计划量）
    pub fn is_completed(&self) -> bool {
        self.finished >= self.amount
    }
}

// ==========================================
// ProductionMaterial - BOM 物料行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionMaterial {
    pub id: i64,
    pub production_output_id: i64,
    pub product_id: i64,
    pub uom: Option<String>,
    pub amount: f64, // 单批计划用量
}
