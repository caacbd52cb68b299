// ==========================================
// 玻璃生产出入库单据 - 明细角色判定引擎
// ==========================================
// 红线:
// - 纯函数，不访问数据库
// - 读时计算，不落库（计划产出/目录/映射图随时可能变化）
// ==========================================
// 切玻璃判定优先级:
//   1. 产品属于计划产出      → 半成品（压过其他规则）
//   2. 有出边                → 原材料
//   3. 有入边                → 余料玻璃
//   4. 无边                  → 原材料（未使用）
// 物料出库:
//   product_id 为空 → 目标成品；否则 → 原材料
// ==========================================

use crate::domain::production::ProductionOutput;
use crate::domain::slip::{InventorySlipDetail, MaterialOutputMapping};
use crate::domain::types::{DetailRole, SlipStrategy};
use std::cmp::Ordering;
use std::collections::HashSet;

// ==========================================
// ClassificationContext - 判定上下文
// ==========================================
#[derive(Debug, Clone)]
pub struct ClassificationContext {
    pub strategy: SlipStrategy,
    planned_product_ids: HashSet<i64>,
    with_outgoing: HashSet<i64>,
    with_incoming: HashSet<i64>,
}

impl ClassificationContext {
    /// 构建判定上下文
    ///
    /// # 参数
    /// - strategy: 生产指令对应的单据策略
    /// - outputs: 生产指令的计划产出
    /// - edges: 单据内的映射边
    pub fn new(
        strategy: SlipStrategy,
        outputs: &[ProductionOutput],
        edges: &[MaterialOutputMapping],
    ) -> Self {
        Self {
            strategy,
            planned_product_ids: outputs.iter().map(|o| o.product_id).collect(),
            with_outgoing: edges.iter().map(|e| e.input_detail_id).collect(),
            with_incoming: edges.iter().map(|e| e.output_detail_id).collect(),
        }
    }

    pub fn is_planned_product(&self, product_id: i64) -> bool {
        self.planned_product_ids.contains(&product_id)
    }

    pub fn has_outgoing(&self, detail_id: i64) -> bool {
        self.with_outgoing.contains(&detail_id)
    }

    pub fn has_incoming(&self, detail_id: i64) -> bool {
        self.with_incoming.contains(&detail_id)
    }
}

/// 判定单条明细的业务角色
pub fn classify(detail: &InventorySlipDetail, ctx: &ClassificationContext) -> DetailRole {
    match ctx.strategy {
        SlipStrategy::CutGlass => classify_cut_glass(detail, ctx),
        SlipStrategy::MaterialExport => match detail.product_id {
            None => DetailRole::TargetProduct,
            Some(_) => DetailRole::RawMaterial,
        },
    }
}

fn classify_cut_glass(detail: &InventorySlipDetail, ctx: &ClassificationContext) -> DetailRole {
    if let Some(product_id) = detail.product_id {
        if ctx.is_planned_product(product_id) {
            return DetailRole::SemiFinished;
        }
    }

    if ctx.has_outgoing(detail.id) {
        DetailRole::RawMaterial
    } else if ctx.has_incoming(detail.id) {
        DetailRole::GlassOffcut
    } else {
        DetailRole::RawMaterial
    }
}

/// 展示排序
///
/// - 切玻璃: (sort_order, id)
/// - 物料出库: 按 production_output_id 分组（无关联的排最后），再按 sort_order, id
pub fn sort_for_display(strategy: SlipStrategy, details: &mut [InventorySlipDetail]) {
    match strategy {
        SlipStrategy::CutGlass => {
            details.sort_by(|a, b| (a.sort_order, a.id).cmp(&(b.sort_order, b.id)));
        }
        SlipStrategy::MaterialExport => {
            details.sort_by(|a, b| {
                cmp_output_group(a.production_output_id, b.production_output_id)
                    .then(a.sort_order.cmp(&b.sort_order))
                    .then(a.id.cmp(&b.id))
            });
        }
    }
}

fn cmp_output_group(a: Option<i64>, b: Option<i64>) -> Ordering {
    match (a, b) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}
