// ==========================================
// 玻璃生产出入库单据 - 完成量回写与完工传播
// ==========================================
// 两阶段:
//   1. 单据事务（台账，权威）由编排层提交
//   2. 本模块在提交后执行回写（尽力而为），失败不回滚台账
// 红线:
// - 每条明细至多贡献一次（同一次创建内不重复累加）
// - 每个涉及的生产指令只做一次完工检查
// - 非幂等: 重复提交同一请求会重复累加
// ==========================================

use crate::domain::production::ProductionOutput;
use crate::domain::slip::InventorySlipDetail;
use crate::domain::types::{DetailRole, SlipStrategy};
use crate::engine::classification::{classify, ClassificationContext};
use crate::engine::collaborators::{ProductionOrderService, ProductionOutputService};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use thiserror::Error;

// ==========================================
// Contribution - 单条明细对计划产出的贡献
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contribution {
    pub detail_id: i64,
    pub production_output_id: i64,
    pub production_order_id: i64,
    pub quantity: f64,
}

/// 计算单据明细对计划产出的贡献（纯函数）
///
/// # 参数
/// - ctx: 判定上下文（含策略、计划产出、映射边）
/// - details: 单据明细
/// - outputs: 生产指令的计划产出
///
/// # 规则
/// - 切玻璃: 判定为半成品的明细贡献其数量；优先使用明细自带的
///   production_output_id（须属于该指令且产品一致），否则取第一条同产品计划产出
/// - 物料出库: 目标成品行（product_id 为空）贡献到其 production_output_id
pub fn plan_contributions(
    ctx: &ClassificationContext,
    details: &[InventorySlipDetail],
    outputs: &[ProductionOutput],
) -> Vec<Contribution> {
    let mut seen = HashSet::new();
    let mut contributions = Vec::new();

    for detail in details {
        if detail.quantity <= 0.0 || !seen.insert(detail.id) {
            continue;
        }

        let target = match ctx.strategy {
            SlipStrategy::CutGlass => {
                if classify(detail, ctx) != DetailRole::SemiFinished {
                    continue;
                }
                resolve_cut_glass_output(detail, outputs)
            }
            SlipStrategy::MaterialExport => {
                if classify(detail, ctx) != DetailRole::TargetProduct {
                    continue;
                }
                detail
                    .production_output_id
                    .and_then(|id| outputs.iter().find(|o| o.id == id))
            }
        };

        match target {
            Some(output) => contributions.push(Contribution {
                detail_id: detail.id,
                production_output_id: output.id,
                production_order_id: output.production_order_id,
                quantity: detail.quantity,
            }),
            None => tracing::debug!(detail_id = detail.id, "明细无对应计划产出，跳过回写"),
        }
    }

    contributions
}

fn resolve_cut_glass_output<'a>(
    detail: &InventorySlipDetail,
    outputs: &'a [ProductionOutput],
) -> Option<&'a ProductionOutput> {
    let product_id = detail.product_id?;

    detail
        .production_output_id
        .and_then(|id| outputs.iter().find(|o| o.id == id && o.product_id == product_id))
        .or_else(|| outputs.iter().find(|o| o.product_id == product_id))
}

// ==========================================
// 回写结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    /// 成功累加的贡献数
    pub applied: usize,
    /// 累加的总数量
    pub total_quantity: f64,
    /// 服务返回 false 而未累加的明细
    pub skipped_detail_ids: Vec<i64>,
    /// 已做完工检查的生产指令
    pub checked_orders: Vec<i64>,
    /// 完工检查后置为完成的生产指令
    pub completed_orders: Vec<i64>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReconciliationError {
    #[error("计划产出完成量回写失败: output_id={output_id}, detail_id={detail_id}, 已成功 {applied} 条: {message}")]
    OutputUpdateFailed {
        output_id: i64,
        detail_id: i64,
        applied: usize,
        message: String,
    },

    #[error("生产指令完工检查失败: order_id={order_id}: {message}")]
    CompletionCheckFailed { order_id: i64, message: String },
}

// ==========================================
// QuantityReconciler - 回写执行器
// ==========================================
pub struct QuantityReconciler {
    output_service: Arc<dyn ProductionOutputService>,
    order_service: Arc<dyn ProductionOrderService>,
}

impl QuantityReconciler {
    pub fn new(
        output_service: Arc<dyn ProductionOutputService>,
        order_service: Arc<dyn ProductionOrderService>,
    ) -> Self {
        Self {
            output_service,
            order_service,
        }
    }

    /// 执行回写
    ///
    /// # 参数
    /// - order_id: 单据所属生产指令（总会做完工检查）
    /// - contributions: plan_contributions 的结果
    ///
    /// # 返回
    /// - Ok(report)
    /// - Err: 首个协作方故障；之前已完成的累加不会撤销
    pub fn apply(
        &self,
        order_id: i64,
        contributions: &[Contribution],
    ) -> Result<ReconciliationReport, ReconciliationError> {
        let mut report = ReconciliationReport::default();

        for c in contributions {
            match self
                .output_service
                .update_finished_quantity(c.production_output_id, c.quantity)
            {
                Ok(true) => {
                    tracing::debug!(
                        output_id = c.production_output_id,
                        detail_id = c.detail_id,
                        quantity = c.quantity,
                        "计划产出完成量已累加"
                    );
                    report.applied += 1;
                    report.total_quantity += c.quantity;
                }
                Ok(false) => {
                    tracing::warn!(
                        output_id = c.production_output_id,
                        detail_id = c.detail_id,
                        "计划产出未累加（不存在或数量非正）"
                    );
                    report.skipped_detail_ids.push(c.detail_id);
                }
                Err(e) => {
                    return Err(ReconciliationError::OutputUpdateFailed {
                        output_id: c.production_output_id,
                        detail_id: c.detail_id,
                        applied: report.applied,
                        message: e.to_string(),
                    });
                }
            }
        }

        let orders: BTreeSet<i64> = std::iter::once(order_id)
            .chain(contributions.iter().map(|c| c.production_order_id))
            .collect();

        for oid in orders {
            let completed = self
                .order_service
                .check_and_update_completion(oid)
                .map_err(|e| ReconciliationError::CompletionCheckFailed {
                    order_id: oid,
                    message: e.to_string(),
                })?;
            report.checked_orders.push(oid);
            if completed {
                report.completed_orders.push(oid);
            }
        }

        Ok(report)
    }
}
