// ==========================================
// 玻璃生产出入库单据 - 生产指令信息 API
// ==========================================
// 职责: 只读聚合，供调用方组装创建请求
// - 切玻璃: 原材料 / 半成品 / 余料玻璃 三类候选产品
// - 物料出库: BOM 中计量单位为片的物料 + 目录 NVL 片材
// ==========================================

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

use crate::api::dto::{ProductionMaterialView, ProductionOrderInfo};
use crate::api::error::{ApiError, ApiResult};
use crate::config::SlipConfigReader;
use crate::domain::production::{Product, ProductionOutput};
use crate::domain::types::SlipStrategy;
use crate::repository::product_repo::ProductRepository;
use crate::repository::production_repo::ProductionRepository;

/// 半成品产品类型标签
const SEMI_FINISHED_TYPE: &str = "Bán thành phẩm";

// ==========================================
// ProductionOrderApi
// ==========================================
pub struct ProductionOrderApi {
    conn: Arc<Mutex<Connection>>,
    config: Arc<dyn SlipConfigReader>,
}

impl ProductionOrderApi {
    pub fn new(conn: Arc<Mutex<Connection>>, config: Arc<dyn SlipConfigReader>) -> Self {
        Self { conn, config }
    }

    fn get_conn(&self) -> ApiResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))
    }

    /// 查询生产指令信息
    ///
    /// 切玻璃: 原材料/半成品/余料三组分别给出，available_products 为三组并集
    /// 物料出库: 三组均为空，候选产品（BOM 中按张计量的物料 + NVL 按张计量产品）只在 available_products 中给出
    ///
    /// # 返回
    /// - Ok(None): 生产指令不存在
    /// - Err(UnsupportedOrderType): 类型标签无法识别
    pub fn get_production_order_info(&self, order_id: i64) -> ApiResult<Option<ProductionOrderInfo>> {
        let sheet_uom = self.config.load_settings().sheet_uom;
        let conn = self.get_conn()?;

        let order = match ProductionRepository::find_order_by_id_tx(&conn, order_id)? {
            Some(o) => o,
            None => return Ok(None),
        };
        let kind = order.kind().ok_or_else(|| ApiError::UnsupportedOrderType {
            order_id,
            order_type: order.order_type.clone(),
        })?;

        let outputs = ProductionRepository::find_outputs_by_order_tx(&conn, order_id)?;
        let planned: HashSet<i64> = outputs.iter().map(|o| o.product_id).collect();
        let sheet_products = ProductRepository::list_by_uom_tx(&conn, &sheet_uom)?;

        let (raw_materials, semi_finished, glass_offcuts, export_candidates) = match kind.strategy() {
            SlipStrategy::CutGlass => {
                let raw: Vec<Product> = sheet_products
                    .iter()
                    .filter(|p| p.is_raw_material_type() && !planned.contains(&p.id))
                    .cloned()
                    .collect();
                let offcuts: Vec<Product> = sheet_products
                    .iter()
                    .filter(|p| p.product_type.as_deref() == Some("NVL") && !planned.contains(&p.id))
                    .cloned()
                    .collect();
                let semi = semi_finished_products(&conn, &outputs)?;
                (raw, semi, offcuts, Vec::new())
            }
            SlipStrategy::MaterialExport => {
                let materials = ProductionRepository::find_materials_by_order_tx(&conn, order_id)?;
                let material_ids: Vec<i64> = materials.iter().map(|m| m.product_id).collect();
                let by_id = ProductRepository::find_by_ids_tx(&conn, &material_ids)?;

                let mut seen = HashSet::new();
                let mut candidates = Vec::new();
                for pid in &material_ids {
                    if let Some(p) = by_id.get(pid) {
                        if p.has_uom(&sheet_uom) && seen.insert(p.id) {
                            candidates.push(p.clone());
                        }
                    }
                }
                for p in &sheet_products {
                    if p.product_type.as_deref() == Some("NVL") && seen.insert(p.id) {
                        candidates.push(p.clone());
                    }
                }
                (Vec::new(), Vec::new(), Vec::new(), candidates)
            }
        };

        let mut seen = HashSet::new();
        let available_products = export_candidates
            .iter()
            .chain(raw_materials.iter())
            .chain(semi_finished.iter())
            .chain(glass_offcuts.iter())
            .filter(|p| seen.insert(p.id))
            .cloned()
            .collect();

        Ok(Some(ProductionOrderInfo {
            id: order.id,
            production_order_code: order.production_order_code,
            order_type: order.order_type,
            description: order.description,
            status: order.status,
            planned_outputs: outputs,
            raw_materials,
            semi_finished,
            glass_offcuts,
            available_products,
        }))
    }

    /// 查询计划产出的 BOM 物料行
    pub fn materials_by_output(&self, output_id: i64) -> ApiResult<Vec<ProductionMaterialView>> {
        let conn = self.get_conn()?;

        if ProductionRepository::find_output_by_id_tx(&conn, output_id)?.is_none() {
            return Err(ApiError::NotFound(format!("计划产出(id={})不存在", output_id)));
        }

        let materials = ProductionRepository::find_materials_by_output_tx(&conn, output_id)?;
        let ids: Vec<i64> = materials.iter().map(|m| m.product_id).collect();
        let products = ProductRepository::find_by_ids_tx(&conn, &ids)?;

        Ok(materials
            .into_iter()
            .map(|m| {
                let product = products.get(&m.product_id);
                ProductionMaterialView {
                    product_code: product.map(|p| p.product_code.clone()),
                    product_name: product.map(|p| p.product_name.clone()),
                    material: m,
                }
            })
            .collect())
    }
}

/// 计划产出对应的半成品（按产出顺序去重）
fn semi_finished_products(conn: &Connection, outputs: &[ProductionOutput]) -> ApiResult<Vec<Product>> {
    let ids: Vec<i64> = outputs.iter().map(|o| o.product_id).collect();
    let products = ProductRepository::find_by_ids_tx(conn, &ids)?;

    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for output in outputs {
        if !seen.insert(output.product_id) {
            continue;
        }
        let product = products.get(&output.product_id);
        result.push(Product {
            id: output.product_id,
            product_code: product.map(|p| p.product_code.clone()).unwrap_or_default(),
            product_name: output
                .product_name
                .clone()
                .or_else(|| product.map(|p| p.product_name.clone()))
                .unwrap_or_default(),
            product_type: Some(SEMI_FINISHED_TYPE.to_string()),
            uom: product.and_then(|p| p.uom.clone()),
            unit_price: product.and_then(|p| p.unit_price),
        });
    }
    Ok(result)
}
