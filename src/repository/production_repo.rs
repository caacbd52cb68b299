// ==========================================
// 玻璃生产出入库单据 - 生产指令仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 生产指令/计划产出/BOM 由外部模块维护；
//       本仓储只提供读取 + 完成量原子累加 + 状态写回
// ==========================================

use crate::domain::production::{ProductionMaterial, ProductionOrder, ProductionOutput};
use crate::domain::types::ProductionStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const ORDER_COLUMNS: &str = "id, production_order_code, order_type, description, status";
const OUTPUT_COLUMNS: &str = "id, production_order_id, product_id, product_name, uom, amount, \
     COALESCE(finished, 0), COALESCE(defected, 0)";
const MATERIAL_COLUMNS: &str = "id, production_output_id, product_id, uom, COALESCE(amount, 0)";

// ==========================================
// ProductionRepository - 生产指令/计划产出/BOM 仓储
// ==========================================
pub struct ProductionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ===== 写入（外部模块数据准备） =====

    /// 新建生产指令（忽略 order.id）
    pub fn create_order(&self, order: &ProductionOrder) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_orders (production_order_code, order_type, description, status)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                order.production_order_code,
                order.order_type,
                order.description,
                order.status.to_db_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 新建计划产出（忽略 output.id）
    pub fn create_output(&self, output: &ProductionOutput) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_outputs (
                production_order_id, product_id, product_name, uom, amount, finished, defected
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                output.production_order_id,
                output.product_id,
                output.product_name,
                output.uom,
                output.amount,
                output.finished,
                output.defected,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 新建 BOM 物料行（忽略 material.id）
    pub fn create_material(&self, material: &ProductionMaterial) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_materials (production_output_id, product_id, uom, amount)
            VALUES (?1, ?2, ?3, ?4)
            "#,
            params![
                material.production_output_id,
                material.product_id,
                material.uom,
                material.amount,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    // ===== 读取 =====

    pub fn find_order_by_id(&self, id: i64) -> RepositoryResult<Option<ProductionOrder>> {
        let conn = self.get_conn()?;
        Self::find_order_by_id_tx(&conn, id)
    }

    pub fn find_output_by_id(&self, id: i64) -> RepositoryResult<Option<ProductionOutput>> {
        let conn = self.get_conn()?;
        Self::find_output_by_id_tx(&conn, id)
    }

    pub fn find_outputs_by_order(&self, order_id: i64) -> RepositoryResult<Vec<ProductionOutput>> {
        let conn = self.get_conn()?;
        Self::find_outputs_by_order_tx(&conn, order_id)
    }

    /// 完成量原子累加
    ///
    /// # 返回
    /// - Ok(true): 已累加
    /// - Ok(false): 计划产出不存在
    pub fn increment_finished(&self, output_id: i64, amount: f64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Ok(Self::increment_finished_tx(&conn, output_id, amount)? > 0)
    }

    /// 写回生产指令状态
    pub fn set_order_status(&self, order_id: i64, status: ProductionStatus) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        Ok(Self::set_order_status_tx(&conn, order_id, status)? > 0)
    }

    // ==========================================
    // 连接级函数（调用方持有连接或事务）
    // ==========================================

    pub fn find_order_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<ProductionOrder>> {
        let sql = format!("SELECT {} FROM production_orders WHERE id = ?1", ORDER_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_order_row).optional()?)
    }

    pub fn find_output_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<ProductionOutput>> {
        let sql = format!("SELECT {} FROM production_outputs WHERE id = ?1", OUTPUT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_output_row).optional()?)
    }

    /// 查询生产指令的计划产出（按 id 升序）
    pub fn find_outputs_by_order_tx(
        conn: &Connection,
        order_id: i64,
    ) -> RepositoryResult<Vec<ProductionOutput>> {
        let sql = format!(
            "SELECT {} FROM production_outputs WHERE production_order_id = ?1 ORDER BY id",
            OUTPUT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![order_id], map_output_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn find_materials_by_output_tx(
        conn: &Connection,
        output_id: i64,
    ) -> RepositoryResult<Vec<ProductionMaterial>> {
        let sql = format!(
            "SELECT {} FROM production_materials WHERE production_output_id = ?1 ORDER BY id",
            MATERIAL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![output_id], map_material_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 查询生产指令下所有计划产出的 BOM 物料行
    pub fn find_materials_by_order_tx(
        conn: &Connection,
        order_id: i64,
    ) -> RepositoryResult<Vec<ProductionMaterial>> {
        let mut stmt = conn.prepare(
            r#"
            SELECT m.id, m.production_output_id, m.product_id, m.uom, COALESCE(m.amount, 0)
            FROM production_materials m
            JOIN production_outputs o ON o.id = m.production_output_id
            WHERE o.production_order_id = ?1
            ORDER BY m.id
            "#,
        )?;
        let rows = stmt.query_map(params![order_id], map_material_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 完成量原子累加（单条 UPDATE，无读-改-写竞态）
    pub fn increment_finished_tx(conn: &Connection, output_id: i64, amount: f64) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "UPDATE production_outputs SET finished = COALESCE(finished, 0) + ?2 WHERE id = ?1",
            params![output_id, amount],
        )?;
        Ok(affected)
    }

    pub fn set_order_status_tx(
        conn: &Connection,
        order_id: i64,
        status: ProductionStatus,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "UPDATE production_orders SET status = ?2 WHERE id = ?1",
            params![order_id, status.to_db_str()],
        )?;
        Ok(affected)
    }
}

fn map_order_row(row: &Row) -> rusqlite::Result<ProductionOrder> {
    Ok(ProductionOrder {
        id: row.get(0)?,
        production_order_code: row.get(1)?,
        order_type: row.get(2)?,
        description: row.get(3)?,
        status: ProductionStatus::from_str(&row.get::<_, String>(4)?),
    })
}

fn map_output_row(row: &Row) -> rusqlite::Result<ProductionOutput> {
    Ok(ProductionOutput {
        id: row.get(0)?,
        production_order_id: row.get(1)?,
        product_id: row.get(2)?,
        product_name: row.get(3)?,
        uom: row.get(4)?,
        amount: row.get(5)?,
        finished: row.get(6)?,
        defected: row.get(7)?,
    })
}

fn map_material_row(row: &Row) -> rusqlite::Result<ProductionMaterial> {
    Ok(ProductionMaterial {
        id: row.get(0)?,
        production_output_id: row.get(1)?,
        product_id: row.get(2)?,
        uom: row.get(3)?,
        amount: row.get(4)?,
    })
}
