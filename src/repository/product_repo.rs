// ==========================================
// 玻璃生产出入库单据 - 产品目录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 说明: 计量单位比较在内存中进行（SQLite LOWER 不处理非 ASCII 字符）
// ==========================================

use crate::domain::production::Product;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

const PRODUCT_COLUMNS: &str = "id, product_code, product_name, product_type, uom, unit_price";

// ==========================================
// ProductRepository - 产品目录仓储
// ==========================================
pub struct ProductRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 新建产品（忽略 product.id）
    ///
    /// # 返回
    /// - Ok(i64): 新产品 id
    pub fn create(&self, product: &Product) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO products (product_code, product_name, product_type, uom, unit_price)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                product.product_code,
                product.product_name,
                product.product_type,
                product.uom,
                product.unit_price,
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// 按 id 查询产品
    pub fn find_by_id(&self, id: i64) -> RepositoryResult<Option<Product>> {
        let conn = self.get_conn()?;
        Self::find_by_id_tx(&conn, id)
    }

    /// 查询目录原材料（类型为 NVL 且计量单位为片）
    pub fn list_catalog_raw_materials(&self, sheet_uom: &str) -> RepositoryResult<Vec<Product>> {
        let conn = self.get_conn()?;
        Ok(Self::list_by_uom_tx(&conn, sheet_uom)?
            .into_iter()
            .filter(|p| p.is_raw_material_type())
            .collect())
    }

    // ==========================================
    // 连接级函数（调用方持有连接或事务）
    // ==========================================

    pub fn find_by_id_tx(conn: &Connection, id: i64) -> RepositoryResult<Option<Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        Ok(conn.query_row(&sql, params![id], map_product_row).optional()?)
    }

    /// 批量查询产品（不存在的 id 不出现在结果中）
    pub fn find_by_ids_tx(conn: &Connection, ids: &[i64]) -> RepositoryResult<HashMap<i64, Product>> {
        let sql = format!("SELECT {} FROM products WHERE id = ?1", PRODUCT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let mut result = HashMap::with_capacity(ids.len());
        for id in ids {
            if result.contains_key(id) {
                continue;
            }
            if let Some(product) = stmt.query_row(params![id], map_product_row).optional()? {
                result.insert(*id, product);
            }
        }
        Ok(result)
    }

    /// 查询计量单位匹配的产品（忽略大小写）
    pub fn list_by_uom_tx(conn: &Connection, uom: &str) -> RepositoryResult<Vec<Product>> {
        let sql = format!(
            "SELECT {} FROM products WHERE uom IS NOT NULL ORDER BY id",
            PRODUCT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], map_product_row)?;

        let mut products = Vec::new();
        for row in rows {
            let product = row?;
            if product.has_uom(uom) {
                products.push(product);
            }
        }
        Ok(products)
    }
}

fn map_product_row(row: &Row) -> rusqlite::Result<Product> {
    Ok(Product {
        id: row.get(0)?,
        product_code: row.get(1)?,
        product_name: row.get(2)?,
        product_type: row.get(3)?,
        uom: row.get(4)?,
        unit_price: row.get(5)?,
    })
}
