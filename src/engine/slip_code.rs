// ==========================================
// 玻璃生产出入库单据 - 单据编号生成器
// ==========================================
// 格式: <前缀>-<生产指令编号>-<yyyyMMdd>-<序号:3位>
// 序号: 该生产指令已有单据数 + 1（在创建事务内统计）
// 并发: slip_code 唯一索引 + IMMEDIATE 事务；
//       仍冲突时序号递增重试，最多 MAX_CODE_ATTEMPTS 次
// ==========================================

use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::slip_repo::InventorySlipRepository;
use chrono::NaiveDate;
use rusqlite::Connection;

/// 编号冲突最大重试次数
pub const MAX_CODE_ATTEMPTS: u32 = 5;

/// slip_code 列名（用于识别唯一约束冲突）
const SLIP_CODE_COLUMN: &str = "inventory_slips.slip_code";

/// 格式化单据编号
pub fn format_slip_code(prefix: &str, order_code: &str, date: NaiveDate, seq: i64) -> String {
    format!("{}-{}-{}-{:03}", prefix, order_code, date.format("%Y%m%d"), seq)
}

// ==========================================
// SlipCodeGenerator
// ==========================================
#[derive(Debug, Clone)]
pub struct SlipCodeGenerator {
    prefix: String,
}

impl SlipCodeGenerator {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// 生成编号并插入单据头（事务内调用）
    ///
    /// # 参数
    /// - conn: 创建事务
    /// - order_id / order_code: 生产指令
    /// - date: 编号日期
    /// - insert: 以候选编号插入单据头，返回新单据 id
    ///
    /// # 返回
    /// - Ok((slip_code, slip_id))
    /// - Err(UniqueConstraintViolation): 重试次数用尽
    pub fn insert_with_code<F>(
        &self,
        conn: &Connection,
        order_id: i64,
        order_code: &str,
        date: NaiveDate,
        mut insert: F,
    ) -> RepositoryResult<(String, i64)>
    where
        F: FnMut(&str) -> RepositoryResult<i64>,
    {
        let existing = InventorySlipRepository::count_by_order_tx(conn, order_id)?;

        let mut last_err = None;
        for attempt in 0..MAX_CODE_ATTEMPTS {
            let seq = existing + 1 + i64::from(attempt);
            let code = format_slip_code(&self.prefix, order_code, date, seq);

            match insert(&code) {
                Ok(slip_id) => return Ok((code, slip_id)),
                Err(e) if e.is_unique_violation_on(SLIP_CODE_COLUMN) => {
                    tracing::warn!(code = %code, attempt, "单据编号冲突，序号递增重试");
                    last_err = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_err.unwrap_or_else(|| {
            RepositoryError::InternalError("单据编号生成失败".to_string())
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_slip_code() {
        let date = NaiveDate::from_ymd_opt(2025, 8, 19).unwrap();
        assert_eq!(
            format_slip_code("PH", "LSX-0001", date, 1),
            "PH-LSX-0001-20250819-001"
        );
        assert_eq!(format_slip_code("PX", "A", date, 1234), "PX-A-20250819-1234");
    }

    #[test]
    fn test_insert_with_code_retries_on_unique_violation() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::apply_schema(&conn).unwrap();
        conn.execute(
            "INSERT INTO production_orders (id, production_order_code, order_type) VALUES (1, 'LSX01', 'Cắt kính')",
            [],
        )
        .unwrap();

        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        // 占用 -001，但不属于该生产指令（模拟并发写入/历史数据）
        conn.execute(
            "INSERT INTO production_orders (id, production_order_code, order_type) VALUES (2, 'X', 'Cắt kính')",
            [],
        )
        .unwrap();
        conn.execute(
            "INSERT INTO inventory_slips (slip_code, production_order_id, created_by, created_at, updated_at)
             VALUES ('PH-LSX01-20250301-001', 2, 1, '', '')",
            [],
        )
        .unwrap();

        let generator = SlipCodeGenerator::new("PH");
        let (code, _) = generator
            .insert_with_code(&conn, 1, "LSX01", date, |code| {
                conn.execute(
                    "INSERT INTO inventory_slips (slip_code, production_order_id, created_by, created_at, updated_at)
                     VALUES (?1, 1, 1, '', '')",
                    [code],
                )?;
                Ok(conn.last_insert_rowid())
            })
            .unwrap();

        assert_eq!(code, "PH-LSX01-20250301-002");
    }

    #[test]
    fn test_insert_with_code_propagates_other_errors() {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::apply_schema(&conn).unwrap();

        let generator = SlipCodeGenerator::new("PH");
        let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let mut calls = 0;
        let err = generator
            .insert_with_code(&conn, 1, "LSX01", date, |_| {
                calls += 1;
                Err(RepositoryError::ValidationError("x".to_string()))
            })
            .unwrap_err();

        assert!(matches!(err, RepositoryError::ValidationError(_)));
        assert_eq!(calls, 1);
    }
}
