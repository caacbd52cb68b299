// ==========================================
// 玻璃生产出入库单据 - 物料→产出映射图仓储
// ==========================================
// 红线:
// - 边的两端明细必须属于同一单据（应用层校验，无外键可表达）
// - (input_detail_id, output_detail_id) 唯一（唯一索引 + INSERT OR IGNORE）
// - 删除任一端明细时删除边
// ==========================================

use crate::db::{format_datetime, parse_datetime};
use crate::domain::slip::MaterialOutputMapping;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const MAPPING_COLUMNS: &str = "m.id, m.input_detail_id, m.output_detail_id, m.note, m.created_at, m.updated_at";

// ==========================================
// MaterialOutputMappingRepository
// ==========================================
pub struct MaterialOutputMappingRepository {
    conn: Arc<Mutex<Connection>>,
}

impl MaterialOutputMappingRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 出边: 该物料变成了什么
    pub fn find_outgoing(&self, detail_id: i64) -> RepositoryResult<Vec<MaterialOutputMapping>> {
        let conn = self.get_conn()?;
        Self::find_outgoing_tx(&conn, detail_id)
    }

    /// 入边: 该产品由什么制成
    pub fn find_incoming(&self, detail_id: i64) -> RepositoryResult<Vec<MaterialOutputMapping>> {
        let conn = self.get_conn()?;
        Self::find_incoming_tx(&conn, detail_id)
    }

    // ==========================================
    // 连接级函数（调用方持有连接或事务）
    // ==========================================

    /// 批量插入映射边
    ///
    /// # 参数
    /// - slip_id: 目标单据
    /// - edges: (input_detail_id, output_detail_id) 列表
    /// - now: 创建时间
    ///
    /// # 返回
    /// - Ok(usize): 实际新增的边数（批内重复与已存在的边被折叠）
    /// - Err(MappingDetailNotInSlip): 任一端明细不存在或不属于该单据，整批拒绝
    /// - Err(ValidationError): 自环边
    pub fn insert_edges_tx(
        conn: &Connection,
        slip_id: i64,
        edges: &[(i64, i64)],
        now: &NaiveDateTime,
    ) -> RepositoryResult<usize> {
        // 先整批校验，再写入
        let mut owner_stmt =
            conn.prepare("SELECT inventory_slip_id FROM inventory_slip_details WHERE id = ?1")?;
        for &(input_id, output_id) in edges {
            if input_id == output_id {
                return Err(RepositoryError::ValidationError(format!(
                    "映射边两端不能为同一明细: detail_id={}",
                    input_id
                )));
            }
            for detail_id in [input_id, output_id] {
                let owner: Option<i64> = owner_stmt
                    .query_row(params![detail_id], |row| row.get(0))
                    .optional()?;
                if owner != Some(slip_id) {
                    return Err(RepositoryError::MappingDetailNotInSlip { slip_id, detail_id });
                }
            }
        }

        let ts = format_datetime(now);
        let mut insert_stmt = conn.prepare(
            r#"
            INSERT OR IGNORE INTO material_output_mappings (
                input_detail_id, output_detail_id, note, created_at, updated_at
            ) VALUES (?1, ?2, NULL, ?3, ?3)
            "#,
        )?;

        let mut seen = HashSet::with_capacity(edges.len());
        let mut inserted = 0;
        for &edge in edges {
            if !seen.insert(edge) {
                continue;
            }
            inserted += insert_stmt.execute(params![edge.0, edge.1, ts])?;
        }

        Ok(inserted)
    }

    pub fn find_outgoing_tx(conn: &Connection, detail_id: i64) -> RepositoryResult<Vec<MaterialOutputMapping>> {
        let sql = format!(
            "SELECT {} FROM material_output_mappings m WHERE m.input_detail_id = ?1 ORDER BY m.id",
            MAPPING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![detail_id], map_mapping_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    pub fn find_incoming_tx(conn: &Connection, detail_id: i64) -> RepositoryResult<Vec<MaterialOutputMapping>> {
        let sql = format!(
            "SELECT {} FROM material_output_mappings m WHERE m.output_detail_id = ?1 ORDER BY m.id",
            MAPPING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![detail_id], map_mapping_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 查询单据内全部映射边（以输入端归属判定）
    pub fn find_by_slip_tx(conn: &Connection, slip_id: i64) -> RepositoryResult<Vec<MaterialOutputMapping>> {
        let sql = format!(
            "SELECT {} FROM material_output_mappings m \
             JOIN inventory_slip_details d ON d.id = m.input_detail_id \
             WHERE d.inventory_slip_id = ?1 ORDER BY m.id",
            MAPPING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![slip_id], map_mapping_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// 删除触及单据任一明细的映射边
    ///
    /// 明细集合由子查询给出，绑定参数个数与明细行数无关
    ///
    /// # 返回
    /// - Ok(usize): 删除的边数
    pub fn delete_touching_tx(conn: &Connection, slip_id: i64) -> RepositoryResult<usize> {
        let affected = conn.execute(
            r#"
            DELETE FROM material_output_mappings
            WHERE input_detail_id IN (
                SELECT id FROM inventory_slip_details WHERE inventory_slip_id = ?1
            )
               OR output_detail_id IN (
                SELECT id FROM inventory_slip_details WHERE inventory_slip_id = ?1
            )
            "#,
            params![slip_id],
        )?;
        Ok(affected)
    }

    /// 历史重复映射去重（一次性迁移步骤）
    ///
    /// 每个 (input_detail_id, output_detail_id) 保留 id 最小的一行
    ///
    /// # 返回
    /// - Ok(usize): 删除的重复行数
    pub fn dedupe_legacy_pairs(conn: &Connection) -> rusqlite::Result<usize> {
        conn.execute(
            r#"
            DELETE FROM material_output_mappings
            WHERE id NOT IN (
                SELECT MIN(id) FROM material_output_mappings
                GROUP BY input_detail_id, output_detail_id
            )
            "#,
            [],
        )
    }
}

fn map_mapping_row(row: &Row) -> rusqlite::Result<MaterialOutputMapping> {
    Ok(MaterialOutputMapping {
        id: row.get(0)?,
        input_detail_id: row.get(1)?,
        output_detail_id: row.get(2)?,
        note: row.get(3)?,
        created_at: parse_datetime(&row.get::<_, String>(4)?),
        updated_at: parse_datetime(&row.get::<_, String>(5)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts() -> NaiveDateTime {
        crate::db::parse_datetime("2025-03-01 08:00:00")
    }

    /// 两张单据，各两条明细: slip 1 → (1, 2)，slip 2 → (3, 4)
    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::apply_schema(&conn).unwrap();
        conn.execute_batch(
            r#"
            INSERT INTO production_orders (id, production_order_code, order_type) VALUES (1, 'LSX01', 'Cắt kính');
            INSERT INTO inventory_slips (id, slip_code, production_order_id, created_by, created_at, updated_at)
                VALUES (1, 'PH-LSX01-20250301-001', 1, 1, '2025-03-01 08:00:00', '2025-03-01 08:00:00'),
                       (2, 'PH-LSX01-20250301-002', 1, 1, '2025-03-01 08:00:00', '2025-03-01 08:00:00');
            INSERT INTO inventory_slip_details (id, inventory_slip_id, quantity, created_at, updated_at)
                VALUES (1, 1, 1, '', ''), (2, 1, 1, '', ''), (3, 2, 1, '', ''), (4, 2, 1, '', '');
            "#,
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_insert_edges_collapses_duplicates() {
        let conn = setup();
        let inserted =
            MaterialOutputMappingRepository::insert_edges_tx(&conn, 1, &[(1, 2), (1, 2)], &ts()).unwrap();
        assert_eq!(inserted, 1);

        // 与已存在的边重复
        let inserted =
            MaterialOutputMappingRepository::insert_edges_tx(&conn, 1, &[(1, 2), (2, 1)], &ts()).unwrap();
        assert_eq!(inserted, 1);

        assert_eq!(MaterialOutputMappingRepository::find_by_slip_tx(&conn, 1).unwrap().len(), 2);
        assert_eq!(MaterialOutputMappingRepository::find_outgoing_tx(&conn, 1).unwrap().len(), 1);
        assert_eq!(MaterialOutputMappingRepository::find_incoming_tx(&conn, 1).unwrap().len(), 1);
    }

    #[test]
    fn test_insert_edges_rejects_cross_slip_batch() {
        let conn = setup();
        let err =
            MaterialOutputMappingRepository::insert_edges_tx(&conn, 1, &[(1, 2), (1, 3)], &ts()).unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::MappingDetailNotInSlip { slip_id: 1, detail_id: 3 }
        ));
        // 整批拒绝: 合法的第一条也未写入
        assert!(MaterialOutputMappingRepository::find_by_slip_tx(&conn, 1).unwrap().is_empty());

        let err =
            MaterialOutputMappingRepository::insert_edges_tx(&conn, 1, &[(1, 99)], &ts()).unwrap_err();
        assert!(matches!(err, RepositoryError::MappingDetailNotInSlip { detail_id: 99, .. }));

        let err = MaterialOutputMappingRepository::insert_edges_tx(&conn, 1, &[(2, 2)], &ts()).unwrap_err();
        assert!(matches!(err, RepositoryError::ValidationError(_)));
    }

    #[test]
    fn test_delete_touching_both_directions() {
        let conn = setup();
        MaterialOutputMappingRepository::insert_edges_tx(&conn, 1, &[(1, 2), (2, 1)], &ts()).unwrap();
        MaterialOutputMappingRepository::insert_edges_tx(&conn, 2, &[(3, 4)], &ts()).unwrap();

        let removed = MaterialOutputMappingRepository::delete_touching_tx(&conn, 1).unwrap();
        assert_eq!(removed, 2);
        assert_eq!(MaterialOutputMappingRepository::delete_touching_tx(&conn, 1).unwrap(), 0);
        assert_eq!(MaterialOutputMappingRepository::delete_touching_tx(&conn, 99).unwrap(), 0);
        assert_eq!(MaterialOutputMappingRepository::find_by_slip_tx(&conn, 2).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_touching_slip_with_many_details() {
        let mut conn = setup();
        // 超过 SQLite 默认绑定参数上限 (32766 / 2)
        let lines: i64 = 20_000;
        let tx = conn.transaction().unwrap();
        {
            let mut stmt = tx
                .prepare(
                    "INSERT INTO inventory_slip_details (id, inventory_slip_id, quantity, created_at, updated_at) \
                     VALUES (?1, 1, 1, '', '')",
                )
                .unwrap();
            for id in 100..100 + lines {
                stmt.execute(params![id]).unwrap();
            }
        }
        let edges: Vec<(i64, i64)> = (100..100 + lines).step_by(2).map(|id| (id, id + 1)).collect();
        MaterialOutputMappingRepository::insert_edges_tx(&tx, 1, &edges, &ts()).unwrap();
        MaterialOutputMappingRepository::insert_edges_tx(&tx, 2, &[(3, 4)], &ts()).unwrap();
        tx.commit().unwrap();

        let removed = MaterialOutputMappingRepository::delete_touching_tx(&conn, 1).unwrap();
        assert_eq!(removed, edges.len());
        assert!(MaterialOutputMappingRepository::find_by_slip_tx(&conn, 1).unwrap().is_empty());
        assert_eq!(MaterialOutputMappingRepository::find_by_slip_tx(&conn, 2).unwrap().len(), 1);
    }
}
