// ==========================================
// 玻璃生产出入库单据 - 单据仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 写入函数均为 *_tx 形式，由编排层在同一事务内组合调用
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::slip::{InventorySlip, InventorySlipDetail};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const SLIP_COLUMNS: &str =
    "id, slip_code, description, production_order_id, created_by, created_at, updated_at, is_finalized";
const DETAIL_COLUMNS: &str = "id, inventory_slip_id, product_id, production_output_id, quantity, \
     note, sort_order, created_at, updated_at";

// ==========================================
// InventorySlipRepository - 单据/明细仓储
// ==========================================
pub struct InventorySlipRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventorySlipRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部单据（新建在前）
    pub fn list_all(&self) -> RepositoryResult<Vec<InventorySlip>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM inventory_slips ORDER BY created_at DESC, id DESC",
            SLIP_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_slip_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 查询生产指令的单据（新建在前）
    pub fn list_by_order(&self, order_id: i64) -> RepositoryResult<Vec<InventorySlip>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM inventory_slips WHERE production_order_id = ?1 \
             ORDER BY created_at DESC, id DESC",
            SLIP_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![order_id], map_slip_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    // ==========================================
    // 连接级函数（调用方持有连接或事务）
    // ==========================================

    /// 插入单据头（忽略 slip.id）
    ///
    /// slip_code 冲突时返回 UniqueConstraintViolation
    pub fn insert_slip_tx(conn: &Connection, slip: &InventorySlip) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO inventory_slips (
                slip_code, description, production_order_id, created_by,
                created_at, updated_at, is_finalized
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                slip.slip_code,
                slip.description,
                slip.production_order_id,
                slip.created_by,
                format_datetime(&slip.created_at),
                format_datetime(&slip.updated_at),
                slip.is_finalized,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 插入单据明细（忽略 detail.id）
    pub fn insert_detail_tx(conn: &Connection, detail: &InventorySlipDetail) -> RepositoryResult<i64> {
        conn.execute(
            r#"
            INSERT INTO inventory_slip_details (
                inventory_slip_id, product_id, production_output_id, quantity,
                note, sort_order, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                detail.inventory_slip_id,
                detail.product_id,
                detail.production_output_id,
                detail.quantity,
                detail.note,
                detail.sort_order,
                format_datetime(&detail.created_at),
                format_datetime(&detail.updated_at),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 统计生产指令已有单据数
    pub fn count_by_order_tx(conn: &Connection, order_id: i64) -> RepositoryResult<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM inventory_slips WHERE production_order_id = ?1",
            params![order_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn find_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<InventorySlip>> {
        let sql = format!("SELECT {} FROM inventory_slips WHERE id = ?1", SLIP_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_slip_row).optional()?)
    }

    /// 查询单据明细（按 sort_order, id）
    pub fn find_details_by_slip_tx(
        conn: &Connection,
        slip_id: i64,
    ) -> RepositoryResult<Vec<InventorySlipDetail>> {
        let sql = format!(
            "SELECT {} FROM inventory_slip_details WHERE inventory_slip_id = ?1 \
             ORDER BY sort_order, id",
            DETAIL_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![slip_id], map_detail_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 历史重复单据编号改写（一次性迁移步骤）
    ///
    /// 每个 slip_code 保留 id 最小的一行，其余改写为 "{slip_code}-{id}"
    ///
    /// # 返回
    /// - Ok(usize): 改写的单据数
    pub fn dedupe_legacy_codes(conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            UPDATE inventory_slips
            SET slip_code = slip_code || '-' || id
            WHERE id NOT IN (
                SELECT MIN(id) FROM inventory_slips GROUP BY slip_code
            )
            "#,
            [],
        )
    }

    /// 更新单据头描述与更新时间
    pub fn update_header_tx(
        conn: &Connection,
        slip_id: i64,
        description: Option<&str>,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "UPDATE inventory_slips SET description = ?2, updated_at = ?3 WHERE id = ?1",
            params![slip_id, description, format_datetime(updated_at)],
        )?;
        Ok(affected)
    }

    /// 设置终审标记
    pub fn set_finalized_tx(
        conn: &Connection,
        slip_id: i64,
        updated_at: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "UPDATE inventory_slips SET is_finalized = 1, updated_at = ?2 WHERE id = ?1",
            params![slip_id, format_datetime(updated_at)],
        )?;
        Ok(affected)
    }

    pub fn delete_details_tx(conn: &Connection, slip_id: i64) -> RepositoryResult<usize> {
        let affected = conn.execute(
            "DELETE FROM inventory_slip_details WHERE inventory_slip_id = ?1",
            params![slip_id],
        )?;
        Ok(affected)
    }

    pub fn delete_slip_tx(conn: &Connection, slip_id: i64) -> RepositoryResult<usize> {
        let affected = conn.execute("DELETE FROM inventory_slips WHERE id = ?1", params![slip_id])?;
        Ok(affected)
    }
}

fn map_slip_row(row: &Row) -> rusqlite::Result<InventorySlip> {
    Ok(InventorySlip {
        id: row.get(0)?,
        slip_code: row.get(1)?,
        description: row.get(2)?,
        production_order_id: row.get(3)?,
        created_by: row.get(4)?,
        created_at: parse_datetime(&row.get::<_, String>(5)?),
        updated_at: parse_datetime(&row.get::<_, String>(6)?),
        is_finalized: row.get(7)?,
    })
}

fn map_detail_row(row: &Row) -> rusqlite::Result<InventorySlipDetail> {
    Ok(InventorySlipDetail {
        id: row.get(0)?,
        inventory_slip_id: row.get(1)?,
        product_id: row.get(2)?,
        production_output_id: row.get(3)?,
        quantity: row.get(4)?,
        note: row.get(5)?,
        sort_order: row.get(6)?,
        created_at: parse_datetime(&row.get::<_, String>(7)?),
        updated_at: parse_datetime(&row.get::<_, String>(8)?),
    })
}
