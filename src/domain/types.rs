// ==========================================
// 玻璃生产出入库单据 - 领域类型定义
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 生产指令类型 (Production Order Type)
// ==========================================
// 数据库中以中文标签存储（历史数据口径）
// 红线: 新增类型只能扩展本枚举与 strategy()，不允许按字符串约定分支
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionOrderType {
    CutGlass,           // 切玻璃
    GlueLamination,     // 合片（丁基胶）
    ChemicalProduction, // 制胶
    GlueCasting,        // 灌胶
}

impl ProductionOrderType {
    /// 从数据库标签解析
    ///
    /// 未知标签返回 None，由调用方转换为 UnsupportedOrderType
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "Cắt kính" => Some(ProductionOrderType::CutGlass),
            "Ghép kính" => Some(ProductionOrderType::GlueLamination),
            "Sản xuất keo" => Some(ProductionOrderType::ChemicalProduction),
            "Đổ keo" => Some(ProductionOrderType::GlueCasting),
            _ => None,
        }
    }

    /// 转换为数据库存储的标签
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProductionOrderType::CutGlass => "Cắt kính",
            ProductionOrderType::GlueLamination => "Ghép kính",
            ProductionOrderType::ChemicalProduction => "Sản xuất keo",
            ProductionOrderType::GlueCasting => "Đổ keo",
        }
    }

    /// 单据创建策略
    ///
    /// 合片/制胶/灌胶共用物料出库策略
    pub fn strategy(&self) -> SlipStrategy {
        match self {
            ProductionOrderType::CutGlass => SlipStrategy::CutGlass,
            ProductionOrderType::GlueLamination
            | ProductionOrderType::ChemicalProduction
            | ProductionOrderType::GlueCasting => SlipStrategy::MaterialExport,
        }
    }
}

impl fmt::Display for ProductionOrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 单据策略 (Slip Strategy)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SlipStrategy {
    CutGlass,       // 切玻璃: 明细 + 映射边
    MaterialExport, // 物料出库: 明细 + 目标成品行
}

impl fmt::Display for SlipStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlipStrategy::CutGlass => write!(f, "CUT_GLASS"),
            SlipStrategy::MaterialExport => write!(f, "MATERIAL_EXPORT"),
        }
    }
}

// ==========================================
// 明细角色 (Detail Role)
// ==========================================
// 红线: 读时计算，不落库（依赖的计划产出/物料目录随时可能变化）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DetailRole {
    RawMaterial,   // 原材料（NVL）
    SemiFinished,  // 半成品（计划产出）
    GlassOffcut,   // 余料玻璃
    TargetProduct, // 目标成品（物料出库单）
}

impl DetailRole {
    /// 业务显示标签
    pub fn label(&self) -> &'static str {
        match self {
            DetailRole::RawMaterial => "NVL",
            DetailRole::SemiFinished => "Bán thành phẩm",
            DetailRole::GlassOffcut => "Kính dư",
            DetailRole::TargetProduct => "Thành phẩm mục tiêu",
        }
    }

    /// 是否为出库（消耗）方向
    pub fn is_consumed(&self) -> bool {
        matches!(self, DetailRole::RawMaterial)
    }
}

impl fmt::Display for DetailRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailRole::RawMaterial => write!(f, "RAW_MATERIAL"),
            DetailRole::SemiFinished => write!(f, "SEMI_FINISHED"),
            DetailRole::GlassOffcut => write!(f, "GLASS_OFFCUT"),
            DetailRole::TargetProduct => write!(f, "TARGET_PRODUCT"),
        }
    }
}

// ==========================================
// 生产指令状态 (Production Status)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductionStatus {
    Pending,    // 待生产
    InProgress, // 生产中
    Completed,  // 已完成
}

impl ProductionStatus {
    /// 从数据库字符串解析
    pub fn from_str(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "IN_PROGRESS" => ProductionStatus::InProgress,
            "COMPLETED" => ProductionStatus::Completed,
            _ => ProductionStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ProductionStatus::Pending => "PENDING",
            ProductionStatus::InProgress => "IN_PROGRESS",
            ProductionStatus::Completed => "COMPLETED",
        }
    }
}
