// ==========================================
// 玻璃生产出入库单据 - 请求校验器
// ==========================================
// 职责: 创建/更新单据请求的结构校验（不访问数据库）
// 约定: 收集全部违规后一次性返回 ValidationFailed
// ==========================================

use crate::api::dto::{CreateSlipRequest, MappingEdge};
use crate::api::error::{ApiError, ApiResult, ValidationViolation};
use crate::domain::types::SlipStrategy;

fn violation(violation_type: &str, index: Option<usize>, reason: String) -> ValidationViolation {
    ValidationViolation {
        violation_type: violation_type.to_string(),
        index,
        reason,
    }
}

/// 校验创建/更新单据请求
///
/// # 规则
/// - 明细行非空
/// - 每行数量 > 0，且必须指定产品（空产品行由系统为目标成品追加）
/// - 映射边仅用于切玻璃；下标在范围内且不自环
/// - 生产目标仅用于物料出库；目标数量 > 0
pub fn validate_slip_request(req: &CreateSlipRequest, strategy: SlipStrategy) -> ApiResult<()> {
    let mut violations = Vec::new();

    if req.lines.is_empty() {
        violations.push(violation("EMPTY_LINES", None, "单据明细不能为空".to_string()));
    }

    for (i, line) in req.lines.iter().enumerate() {
        if !(line.quantity > 0.0) || !line.quantity.is_finite() {
            violations.push(violation(
                "NON_POSITIVE_QUANTITY",
                Some(i),
                format!("第{}行数量必须大于0: {}", i, line.quantity),
            ));
        }
        if line.product_id.is_none() {
            violations.push(violation(
                "MISSING_PRODUCT",
                Some(i),
                format!("第{}行未指定产品", i),
            ));
        }
    }

    match strategy {
        SlipStrategy::CutGlass => {
            if !req.targets.is_empty() {
                violations.push(violation(
                    "TARGETS_NOT_ALLOWED",
                    None,
                    "切玻璃单据不接受生产目标".to_string(),
                ));
            }
            for (i, edge) in req.mappings.iter().enumerate() {
                let n = req.lines.len();
                if edge.input_index >= n || edge.output_index >= n {
                    violations.push(violation(
                        "EDGE_INDEX_OUT_OF_RANGE",
                        Some(i),
                        format!(
                            "映射边下标越界: {} → {}（共{}行）",
                            edge.input_index, edge.output_index, n
                        ),
                    ));
                } else if edge.input_index == edge.output_index {
                    violations.push(violation(
                        "SELF_LOOP",
                        Some(i),
                        format!("映射边两端为同一行: {}", edge.input_index),
                    ));
                }
            }
        }
        SlipStrategy::MaterialExport => {
            if !req.mappings.is_empty() {
                violations.push(violation(
                    "MAPPINGS_NOT_ALLOWED",
                    None,
                    "物料出库单据不接受映射边".to_string(),
                ));
            }
            for (i, target) in req.targets.iter().enumerate() {
                if !(target.target_quantity > 0.0) || !target.target_quantity.is_finite() {
                    violations.push(violation(
                        "NON_POSITIVE_TARGET",
                        Some(i),
                        format!(
                            "生产目标数量必须大于0: output_id={}, quantity={}",
                            target.production_output_id, target.target_quantity
                        ),
                    ));
                }
            }
        }
    }

    if violations.is_empty() {
        return Ok(());
    }

    Err(ApiError::ValidationFailed {
        reason: format!("{}项校验未通过", violations.len()),
        violations,
    })
}

/// 校验追加映射边（自环）
pub fn validate_mapping_edges(edges: &[MappingEdge]) -> ApiResult<()> {
    let violations: Vec<ValidationViolation> = edges
        .iter()
        .enumerate()
        .filter(|(_, e)| e.input_detail_id == e.output_detail_id)
        .map(|(i, e)| {
            violation(
                "SELF_LOOP",
                Some(i),
                format!("映射边两端为同一明细: {}", e.input_detail_id),
            )
        })
        .collect();

    if violations.is_empty() {
        return Ok(());
    }

    Err(ApiError::ValidationFailed {
        reason: format!("{}条映射边自环", violations.len()),
        violations,
    })
}
