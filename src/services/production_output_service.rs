// ==========================================
// 计划产出服务 - SQLite 实现
// ==========================================

use crate::engine::collaborators::{CollaboratorResult, ProductionOutputService};
use crate::repository::production_repo::ProductionRepository;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

pub struct SqliteProductionOutputService {
    repo: ProductionRepository,
}

impl SqliteProductionOutputService {
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self {
            repo: ProductionRepository::from_connection(conn),
        }
    }
}

impl ProductionOutputService for SqliteProductionOutputService {
    fn update_finished_quantity(&self, output_id: i64, amount: f64) -> CollaboratorResult<bool> {
        if amount <= 0.0 {
            return Ok(false);
        }
        Ok(self.repo.increment_finished(output_id, amount)?)
    }
}
