// ==========================================
// 生产指令服务 - SQLite 实现
// ==========================================
// 完工判定: 所有计划产出 finished >= amount → 状态置为 COMPLETED
// 无计划产出的生产指令不视为完工
// ==========================================

use crate::domain::types::ProductionStatus;
use crate::engine::collaborators::{CollaboratorResult, ProductionOrderService};
use crate::repository::production_repo::ProductionRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct SqliteProductionOrderService {
    repo: ProductionRepository,
}

impl SqliteProductionOrderService {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: ProductionRepository::from_connection(conn),
        }
    }
}

impl ProductionOrderService for SqliteProductionOrderService {
    fn check_and_update_completion(&self, order_id: i64) -> CollaboratorResult<bool> {
        let outputs = self.repo.find_outputs_by_order(order_id)?;
        if outputs.is_empty() || !outputs.iter().all(|o| o.is_completed()) {
            return Ok(false);
        }

        let updated = self.repo.set_order_status(order_id, ProductionStatus::Completed)?;
        if updated {
            tracing::info!(order_id, "生产指令已完工");
        }
        Ok(updated)
    }
}
