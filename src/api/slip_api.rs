// ==========================================
// 玻璃生产出入库单据 - 单据编排 API
// ==========================================
// 职责:
// 1. 创建单据: 解析指令类型 → 事务写入（单据头/明细/映射边或目标成品行）
//    → 提交 → 完成量回写（尽力而为）→ 返回判定后的单据
// 2. 查询/删除/追加映射/终审/更新
// 3. 映射图读取、出入库拆分
// ==========================================
// 锁约定: 持有连接锁期间只调用仓储 *_tx 关联函数；
//         配置读取与回写服务会自行加锁，必须在锁外调用
// ==========================================

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use rusqlite::{Connection, TransactionBehavior};

use crate::api::dto::{
    CreateSlipRequest, LineRef, MappingEdge, ReconciliationOutcome, SlipCreated,
    SlipDetailView, SlipStockMovement, SlipView, StockLine,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::validator::{validate_mapping_edges, validate_slip_request};
use crate::config::SlipConfigReader;
use crate::domain::production::{Product, ProductionOrder, ProductionOutput};
use crate::domain::slip::{InventorySlip, InventorySlipDetail, MaterialOutputMapping};
use crate::domain::types::{DetailRole, ProductionOrderType, SlipStrategy};
use crate::engine::classification::{classify, sort_for_display, ClassificationContext};
use crate::engine::reconciliation::{plan_contributions, Contribution, QuantityReconciler};
use crate::engine::slip_code::SlipCodeGenerator;
use crate::repository::error::RepositoryResult;
use crate::repository::mapping_repo::MaterialOutputMappingRepository;
use crate::repository::product_repo::ProductRepository;
use crate::repository::production_repo::ProductionRepository;
use crate::repository::slip_repo::InventorySlipRepository;

/// 目标成品行备注前缀
pub const TARGET_NOTE_PREFIX: &str = "Thành phẩm mục tiêu: ";

// ==========================================
// InventorySlipApi - 单据编排 API
// ==========================================
pub struct InventorySlipApi {
    conn: Arc<Mutex<Connection>>,
    slip_repo: InventorySlipRepository,
    mapping_repo: MaterialOutputMappingRepository,
    config: Arc<dyn SlipConfigReader>,
    reconciler: QuantityReconciler,
}

impl InventorySlipApi {
    /// 创建新的 InventorySlipApi 实例
    ///
    /// # 参数
    /// - conn: 共享连接
    /// - config: 单据配置读取（不得在持有 conn 锁时调用）
    /// - reconciler: 提交后回写执行器
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        config: Arc<dyn SlipConfigReader>,
        reconciler: QuantityReconciler,
    ) -> Self {
        Self {
            slip_repo: InventorySlipRepository::from_connection(conn.clone()),
            mapping_repo: MaterialOutputMappingRepository::from_connection(conn.clone()),
            conn,
            config,
            reconciler,
        }
    }

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    // ==========================================
    // 创建
    // ==========================================

    /// 创建单据
    ///
    /// # 参数
    /// - req: 创建请求（映射边以明细行下标表示）
    /// - operator_id: 操作人
    ///
    /// # 返回
    /// - Ok(SlipCreated): 判定后的单据 + 下标→明细 id 映射 + 回写结果
    /// - Err(OrderNotFound / UnsupportedOrderType / ValidationFailed / TransactionFailure)
    ///
    /// # 说明
    /// 回写失败只记录日志并体现在 reconciliation 字段，单据不回滚
    pub fn create_slip(&self, req: &CreateSlipRequest, operator_id: i64) -> ApiResult<SlipCreated> {
        let settings = self.config.load_settings();
        let generator = SlipCodeGenerator::new(settings.slip_code_prefix);
        let now = current_timestamp();
        let today = now.date();

        let (created, order_id, contributions) = {
            let mut conn = self.get_conn()?;

            let (order, kind) = load_order_tx(&conn, req.production_order_id)?;
            let strategy = kind.strategy();
            validate_slip_request(req, strategy)?;

            let outputs = ProductionRepository::find_outputs_by_order_tx(&conn, order.id)?;
            validate_targets(req, &outputs)?;

            let tx = conn
                .transaction_with_behavior(TransactionBehavior::Immediate)
                .map_err(|e| ApiError::from_transaction(e.into()))?;

            let (slip_id, line_ids, target_line_ids) =
                write_new_slip_tx(&tx, &generator, &order, strategy, req, &outputs, operator_id, now, today)
                    .map_err(ApiError::from_transaction)?;

            tx.commit()
                .map_err(|e| ApiError::from_transaction(e.into()))?;

            let state = SlipState::load_tx(&conn, slip_id)?
                .ok_or_else(|| ApiError::InternalError(format!("已提交的单据读取失败: id={}", slip_id)))?;

            tracing::info!(
                slip_id,
                slip_code = %state.slip.slip_code,
                order_id = order.id,
                strategy = %strategy,
                lines = line_ids.len(),
                targets = target_line_ids.len(),
                edges = state.edges.len(),
                operator_id,
                "单据已提交"
            );

            let contributions = state.contributions();
            (
                (state.into_view(), line_ids, target_line_ids),
                order.id,
                contributions,
            )
        };

        // 锁外执行回写（服务自行加锁）
        let reconciliation = self.reconcile(order_id, &contributions);

        let (slip, line_ids, target_line_ids) = created;
        Ok(SlipCreated {
            slip,
            line_ids,
            target_line_ids,
            reconciliation,
        })
    }

    /// 提交后回写（尽力而为）
    fn reconcile(&self, order_id: i64, contributions: &[Contribution]) -> ReconciliationOutcome {
        match self.reconciler.apply(order_id, contributions) {
            Ok(report) => {
                tracing::info!(
                    order_id,
                    applied = report.applied,
                    total_quantity = report.total_quantity,
                    completed = ?report.completed_orders,
                    "完成量回写完成"
                );
                ReconciliationOutcome::Applied(report)
            }
            Err(e) => {
                tracing::warn!(order_id, error = %e, "完成量回写失败，单据已提交不回滚");
                ReconciliationOutcome::Failed {
                    message: e.to_string(),
                }
            }
        }
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按 id 查询单据
    pub fn get_slip(&self, slip_id: i64) -> ApiResult<Option<SlipView>> {
        let conn = self.get_conn()?;
        Ok(SlipState::load_tx(&conn, slip_id)?.map(SlipState::into_view))
    }

    /// 查询全部单据（新建在前）
    pub fn list_slips(&self) -> ApiResult<Vec<SlipView>> {
        let slips = self.slip_repo.list_all()?;
        self.hydrate_all(slips)
    }

    /// 查询生产指令的单据（新建在前）
    pub fn list_slips_by_order(&self, order_id: i64) -> ApiResult<Vec<SlipView>> {
        let slips = self.slip_repo.list_by_order(order_id)?;
        self.hydrate_all(slips)
    }

    fn hydrate_all(&self, slips: Vec<InventorySlip>) -> ApiResult<Vec<SlipView>> {
        let conn = self.get_conn()?;
        let mut views = Vec::with_capacity(slips.len());
        for slip in slips {
            views.push(SlipState::from_slip_tx(&conn, slip)?.into_view());
        }
        Ok(views)
    }

    /// 出边: 该物料变成了什么
    pub fn outputs_of_detail(&self, detail_id: i64) -> ApiResult<Vec<MaterialOutputMapping>> {
        Ok(self.mapping_repo.find_outgoing(detail_id)?)
    }

    /// 入边: 该产品由什么制成
    pub fn inputs_of_detail(&self, detail_id: i64) -> ApiResult<Vec<MaterialOutputMapping>> {
        Ok(self.mapping_repo.find_incoming(detail_id)?)
    }

    /// 单据出入库拆分
    ///
    /// - 切玻璃: 原材料出库；半成品/余料玻璃入库
    /// - 物料出库: 物料行出库；目标成品行入库（同一计划产出只取第一行）
    pub fn stock_movement(&self, slip_id: i64) -> ApiResult<SlipStockMovement> {
        let conn = self.get_conn()?;
        let state = SlipState::load_tx(&conn, slip_id)?.ok_or(ApiError::SlipNotFound(slip_id))?;
        Ok(state.stock_movement())
    }

    // ==========================================
    // 删除
    // ==========================================

    /// 删除单据（连同明细与触及明细的映射边）
    ///
    /// # 返回
    /// - Ok(false): 单据不存在
    pub fn delete_slip(&self, slip_id: i64) -> ApiResult<bool> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        if InventorySlipRepository::find_by_id_tx(&tx, slip_id)?.is_none() {
            return Ok(false);
        }

        let edges = MaterialOutputMappingRepository::delete_touching_tx(&tx, slip_id)
            .map_err(ApiError::from_transaction)?;
        let details = InventorySlipRepository::delete_details_tx(&tx, slip_id)
            .map_err(ApiError::from_transaction)?;
        InventorySlipRepository::delete_slip_tx(&tx, slip_id).map_err(ApiError::from_transaction)?;

        tx.commit()?;

        tracing::info!(slip_id, details, edges, "单据已删除");
        Ok(true)
    }

    // ==========================================
    // 追加映射
    // ==========================================

    /// 向已有单据追加映射边
    ///
    /// # 返回
    /// - Ok(true): 追加成功（重复边被折叠）
    /// - Err(SlipNotFound / SlipFinalized / MappingDetailNotInSlip / ValidationFailed)
    pub fn add_mappings(&self, slip_id: i64, edges: &[MappingEdge]) -> ApiResult<bool> {
        validate_mapping_edges(edges)?;
        let now = current_timestamp();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let slip = InventorySlipRepository::find_by_id_tx(&tx, slip_id)?
            .ok_or(ApiError::SlipNotFound(slip_id))?;
        if slip.is_finalized {
            return Err(ApiError::SlipFinalized(slip_id));
        }

        let (_, kind) = load_order_tx(&tx, slip.production_order_id)?;
        if kind.strategy() != SlipStrategy::CutGlass {
            return Err(ApiError::validation(format!(
                "只有切玻璃单据可以追加映射边: slip_id={}, type={}",
                slip_id, kind
            )));
        }

        let pairs: Vec<(i64, i64)> = edges
            .iter()
            .map(|e| (e.input_detail_id, e.output_detail_id))
            .collect();
        let inserted = MaterialOutputMappingRepository::insert_edges_tx(&tx, slip_id, &pairs, &now)
            .map_err(ApiError::from_transaction)?;

        tx.commit()?;

        tracing::info!(slip_id, requested = edges.len(), inserted, "映射边已追加");
        Ok(true)
    }

    // ==========================================
    // 终审
    // ==========================================

    /// 终审单据
    ///
    /// # 返回
    /// - Ok(false): 单据不存在
    /// - Ok(true): 已终审（含此前已终审）
    /// - Err(FinalizeBlocked): 切玻璃单据存在无出边的原材料明细
    ///
    /// # 说明
    /// 终审只设置标记，不触发完成量回写（回写已在创建时完成）
    pub fn finalize_slip(&self, slip_id: i64) -> ApiResult<bool> {
        let settings = self.config.load_settings();
        let now = current_timestamp();

        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let state = match SlipState::load_tx(&tx, slip_id)? {
            Some(s) => s,
            None => return Ok(false),
        };
        if state.slip.is_finalized {
            return Ok(true);
        }

        if state.strategy == Some(SlipStrategy::CutGlass) && settings.finalize_requires_mapping {
            let unmapped = state.unmapped_raw_material_ids();
            if !unmapped.is_empty() {
                tracing::warn!(slip_id, unmapped = ?unmapped, "单据终审被阻止");
                return Err(ApiError::FinalizeBlocked {
                    slip_id,
                    unmapped_detail_ids: unmapped,
                });
            }
        }

        InventorySlipRepository::set_finalized_tx(&tx, slip_id, &now)?;
        tx.commit()?;

        tracing::info!(slip_id, "单据已终审");
        Ok(true)
    }

    // ==========================================
    // 更新
    // ==========================================

    /// 更新单据（整体替换描述、明细与映射边/目标成品行）
    ///
    /// # 说明
    /// - 已终审单据拒绝更新
    /// - 不允许变更所属生产指令
    /// - 不重新执行完成量回写
    pub fn update_slip(&self, slip_id: i64, req: &CreateSlipRequest, operator_id: i64) -> ApiResult<SlipView> {
        let now = current_timestamp();

        let mut conn = self.get_conn()?;

        let slip = InventorySlipRepository::find_by_id_tx(&conn, slip_id)?
            .ok_or(ApiError::SlipNotFound(slip_id))?;
        if slip.is_finalized {
            return Err(ApiError::SlipFinalized(slip_id));
        }
        if req.production_order_id != slip.production_order_id {
            return Err(ApiError::validation(format!(
                "不允许变更单据所属生产指令: {} → {}",
                slip.production_order_id, req.production_order_id
            )));
        }

        let (_, kind) = load_order_tx(&conn, slip.production_order_id)?;
        let strategy = kind.strategy();
        validate_slip_request(req, strategy)?;

        let outputs = ProductionRepository::find_outputs_by_order_tx(&conn, slip.production_order_id)?;
        validate_targets(req, &outputs)?;

        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(|e| ApiError::from_transaction(e.into()))?;

        let (edges, details) = replace_slip_content_tx(&tx, slip_id, strategy, req, &outputs, now)
            .map_err(ApiError::from_transaction)?;

        tx.commit()
            .map_err(|e| ApiError::from_transaction(e.into()))?;

        tracing::info!(
            slip_id,
            operator_id,
            removed_details = details,
            removed_edges = edges,
            "单据已更新"
        );

        SlipState::load_tx(&conn, slip_id)?
            .map(SlipState::into_view)
            .ok_or_else(|| ApiError::InternalError(format!("已更新的单据读取失败: id={}", slip_id)))
    }
}

// ==========================================
// 事务写入
// ==========================================

#[allow(clippy::too_many_arguments)]
fn write_new_slip_tx(
    tx: &Connection,
    generator: &SlipCodeGenerator,
    order: &ProductionOrder,
    strategy: SlipStrategy,
    req: &CreateSlipRequest,
    outputs: &[ProductionOutput],
    operator_id: i64,
    now: NaiveDateTime,
    today: NaiveDate,
) -> RepositoryResult<(i64, Vec<LineRef>, Vec<LineRef>)> {
    let (_, slip_id) = generator.insert_with_code(
        tx,
        order.id,
        &order.production_order_code,
        today,
        |code| {
            InventorySlipRepository::insert_slip_tx(
                tx,
                &InventorySlip {
                    id: 0,
                    slip_code: code.to_string(),
                    description: req.description.clone(),
                    production_order_id: order.id,
                    created_by: operator_id,
                    created_at: now,
                    updated_at: now,
                    is_finalized: false,
                },
            )
        },
    )?;

    let (line_ids, target_line_ids) = insert_slip_content_tx(tx, slip_id, strategy, req, outputs, now)?;
    Ok((slip_id, line_ids, target_line_ids))
}

/// 整体替换单据内容
///
/// # 返回
/// - (删除的映射边数, 删除的明细数)
fn replace_slip_content_tx(
    tx: &Connection,
    slip_id: i64,
    strategy: SlipStrategy,
    req: &CreateSlipRequest,
    outputs: &[ProductionOutput],
    now: NaiveDateTime,
) -> RepositoryResult<(usize, usize)> {
    let edges = MaterialOutputMappingRepository::delete_touching_tx(tx, slip_id)?;
    let details = InventorySlipRepository::delete_details_tx(tx, slip_id)?;
    InventorySlipRepository::update_header_tx(tx, slip_id, req.description.as_deref(), &now)?;

    insert_slip_content_tx(tx, slip_id, strategy, req, outputs, now)?;
    Ok((edges, details))
}

/// 插入明细，并按策略插入映射边或追加目标成品行
///
/// # 返回
/// - (请求行下标 → 明细 id, 目标下标 → 目标成品明细 id)
fn insert_slip_content_tx(
    tx: &Connection,
    slip_id: i64,
    strategy: SlipStrategy,
    req: &CreateSlipRequest,
    outputs: &[ProductionOutput],
    now: NaiveDateTime,
) -> RepositoryResult<(Vec<LineRef>, Vec<LineRef>)> {
    let mut line_ids = Vec::with_capacity(req.lines.len());
    for (index, line) in req.lines.iter().enumerate() {
        let detail_id = InventorySlipRepository::insert_detail_tx(
            tx,
            &InventorySlipDetail {
                id: 0,
                inventory_slip_id: slip_id,
                product_id: line.product_id,
                production_output_id: line.production_output_id,
                quantity: line.quantity,
                note: line.note.clone(),
                sort_order: line.sort_order.unwrap_or(index as i32),
                created_at: now,
                updated_at: now,
            },
        )?;
        line_ids.push(LineRef { index, detail_id });
    }

    let mut target_line_ids = Vec::new();
    match strategy {
        SlipStrategy::CutGlass => {
            let pairs: Vec<(i64, i64)> = req
                .mappings
                .iter()
                .map(|e| (line_ids[e.input_index].detail_id, line_ids[e.output_index].detail_id))
                .collect();
            MaterialOutputMappingRepository::insert_edges_tx(tx, slip_id, &pairs, &now)?;
        }
        SlipStrategy::MaterialExport => {
            for (index, target) in req.targets.iter().enumerate() {
                let name = match outputs.iter().find(|o| o.id == target.production_output_id) {
                    Some(output) => output_display_name(tx, output)?,
                    None => String::new(),
                };
                let detail_id = InventorySlipRepository::insert_detail_tx(
                    tx,
                    &InventorySlipDetail {
                        id: 0,
                        inventory_slip_id: slip_id,
                        product_id: None,
                        production_output_id: Some(target.production_output_id),
                        quantity: target.target_quantity,
                        note: Some(format!("{}{}", TARGET_NOTE_PREFIX, name)),
                        sort_order: (req.lines.len() + index) as i32,
                        created_at: now,
                        updated_at: now,
                    },
                )?;
                target_line_ids.push(LineRef { index, detail_id });
            }
        }
    }

    Ok((line_ids, target_line_ids))
}

fn output_display_name(conn: &Connection, output: &ProductionOutput) -> RepositoryResult<String> {
    if let Some(name) = output.product_name.as_deref().filter(|n| !n.trim().is_empty()) {
        return Ok(name.to_string());
    }
    Ok(ProductRepository::find_by_id_tx(conn, output.product_id)?
        .map(|p| p.product_name)
        .unwrap_or_default())
}

// ==========================================
// 辅助
// ==========================================

/// 读取生产指令并解析类型
fn load_order_tx(conn: &Connection, order_id: i64) -> ApiResult<(ProductionOrder, ProductionOrderType)> {
    let order = ProductionRepository::find_order_by_id_tx(conn, order_id)?
        .ok_or(ApiError::OrderNotFound(order_id))?;
    let kind = order.kind().ok_or_else(|| ApiError::UnsupportedOrderType {
        order_id,
        order_type: order.order_type.clone(),
    })?;
    Ok((order, kind))
}

/// 目标计划产出必须属于该生产指令
fn validate_targets(req: &CreateSlipRequest, outputs: &[ProductionOutput]) -> ApiResult<()> {
    for target in &req.targets {
        if !outputs.iter().any(|o| o.id == target.production_output_id) {
            return Err(ApiError::validation(format!(
                "计划产出不属于生产指令: output_id={}, order_id={}",
                target.production_output_id, req.production_order_id
            )));
        }
    }
    Ok(())
}

/// 当前时间（秒级，与存储精度一致）
fn current_timestamp() -> NaiveDateTime {
    let now = Local::now().naive_local();
    now.with_nanosecond(0).unwrap_or(now)
}

// ==========================================
// SlipState - 单据读时快照（判定与视图组装）
// ==========================================
struct SlipState {
    slip: InventorySlip,
    order: Option<ProductionOrder>,
    strategy: Option<SlipStrategy>,
    details: Vec<InventorySlipDetail>,
    edges: Vec<MaterialOutputMapping>,
    outputs: Vec<ProductionOutput>,
    products: HashMap<i64, Product>,
}

impl SlipState {
    fn load_tx(conn: &Connection, slip_id: i64) -> ApiResult<Option<Self>> {
        match InventorySlipRepository::find_by_id_tx(conn, slip_id)? {
            Some(slip) => Ok(Some(Self::from_slip_tx(conn, slip)?)),
            None => Ok(None),
        }
    }

    fn from_slip_tx(conn: &Connection, slip: InventorySlip) -> ApiResult<Self> {
        let order = ProductionRepository::find_order_by_id_tx(conn, slip.production_order_id)?;
        let strategy = order
            .as_ref()
            .and_then(|o| o.kind())
            .map(|k| k.strategy());

        let details = InventorySlipRepository::find_details_by_slip_tx(conn, slip.id)?;
        let edges = MaterialOutputMappingRepository::find_by_slip_tx(conn, slip.id)?;
        let outputs = ProductionRepository::find_outputs_by_order_tx(conn, slip.production_order_id)?;

        let product_ids: Vec<i64> = details
            .iter()
            .filter_map(|d| d.product_id)
            .chain(outputs.iter().map(|o| o.product_id))
            .collect();
        let products = ProductRepository::find_by_ids_tx(conn, &product_ids)?;

        Ok(Self {
            slip,
            order,
            strategy,
            details,
            edges,
            outputs,
            products,
        })
    }

    /// 判定上下文（类型无法识别时按物料出库规则展示）
    fn context(&self) -> ClassificationContext {
        ClassificationContext::new(
            self.strategy.unwrap_or(SlipStrategy::MaterialExport),
            &self.outputs,
            &self.edges,
        )
    }

    fn contributions(&self) -> Vec<Contribution> {
        if self.strategy.is_none() {
            return Vec::new();
        }
        plan_contributions(&self.context(), &self.details, &self.outputs)
    }

    /// 无出边的原材料明细
    fn unmapped_raw_material_ids(&self) -> Vec<i64> {
        let ctx = self.context();
        self.details
            .iter()
            .filter(|d| classify(d, &ctx) == DetailRole::RawMaterial && !ctx.has_outgoing(d.id))
            .map(|d| d.id)
            .collect()
    }

    fn output_name(&self, output_id: i64) -> Option<String> {
        let output = self.outputs.iter().find(|o| o.id == output_id)?;
        output
            .product_name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .or_else(|| self.products.get(&output.product_id).map(|p| p.product_name.clone()))
    }

    fn output_product(&self, output_id: i64) -> Option<&Product> {
        let output = self.outputs.iter().find(|o| o.id == output_id)?;
        self.products.get(&output.product_id)
    }

    fn detail_view(&self, detail: &InventorySlipDetail, ctx: &ClassificationContext) -> SlipDetailView {
        let role = classify(detail, ctx);

        // 目标成品行无产品引用，显示信息取自其计划产出
        let product = match detail.product_id {
            Some(pid) => self.products.get(&pid),
            None => detail
                .production_output_id
                .and_then(|oid| self.output_product(oid)),
        };
        let target_product_name = detail
            .production_output_id
            .and_then(|oid| self.output_name(oid));
        let product_name = match (detail.product_id, product) {
            (None, _) => target_product_name
                .clone()
                .or_else(|| product.map(|p| p.product_name.clone())),
            (Some(_), Some(p)) => Some(p.product_name.clone()),
            (Some(_), None) => None,
        };

        SlipDetailView {
            id: detail.id,
            product_id: detail.product_id,
            product_code: product.map(|p| p.product_code.clone()),
            product_name,
            uom: product.and_then(|p| p.uom.clone()),
            unit_price: product.and_then(|p| p.unit_price),
            production_output_id: detail.production_output_id,
            quantity: detail.quantity,
            note: detail.note.clone(),
            sort_order: detail.sort_order,
            role,
            role_label: role.label().to_string(),
            target_product_name,
            outgoing: self
                .edges
                .iter()
                .filter(|e| e.input_detail_id == detail.id)
                .cloned()
                .collect(),
            incoming: self
                .edges
                .iter()
                .filter(|e| e.output_detail_id == detail.id)
                .cloned()
                .collect(),
        }
    }

    fn into_view(self) -> SlipView {
        let ctx = self.context();
        let mut ordered = self.details.clone();
        sort_for_display(ctx.strategy, &mut ordered);

        let details: Vec<SlipDetailView> = ordered.iter().map(|d| self.detail_view(d, &ctx)).collect();

        SlipView {
            id: self.slip.id,
            slip_code: self.slip.slip_code.clone(),
            description: self.slip.description.clone(),
            production_order_id: self.slip.production_order_id,
            production_order_code: self.order.as_ref().map(|o| o.production_order_code.clone()),
            order_type: self.order.as_ref().map(|o| o.order_type.clone()),
            strategy: self.strategy,
            created_by: self.slip.created_by,
            created_at: self.slip.created_at,
            updated_at: self.slip.updated_at,
            is_finalized: self.slip.is_finalized,
            details,
            mappings: self.edges,
        }
    }

    fn stock_movement(&self) -> SlipStockMovement {
        let ctx = self.context();
        let mut ordered = self.details.clone();
        sort_for_display(ctx.strategy, &mut ordered);

        let mut exported = Vec::new();
        let mut imported = Vec::new();
        let mut seen_outputs = HashSet::new();

        for detail in &ordered {
            let view = self.detail_view(detail, &ctx);
            let line = StockLine {
                detail_id: view.id,
                product_id: view.product_id,
                production_output_id: view.production_output_id,
                product_name: view.product_name.or_else(|| {
                    view.note
                        .as_deref()
                        .and_then(|n| n.strip_prefix(TARGET_NOTE_PREFIX))
                        .map(str::to_string)
                }),
                quantity: view.quantity,
                unit_price: view.unit_price,
                role: view.role,
            };

            match view.role {
                DetailRole::RawMaterial => exported.push(line),
                DetailRole::SemiFinished | DetailRole::GlassOffcut => imported.push(line),
                DetailRole::TargetProduct => {
                    // 同一计划产出只取第一行，避免重复入库
                    let first = match view.production_output_id {
                        Some(oid) => seen_outputs.insert(oid),
                        None => true,
                    };
                    if first {
                        imported.push(line);
                    }
                }
            }
        }

        SlipStockMovement {
            slip_id: self.slip.id,
            slip_code: self.slip.slip_code.clone(),
            created_by: self.slip.created_by,
            exported,
            imported,
        }
    }
}
