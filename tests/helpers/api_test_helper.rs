// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 装配测试环境 + 预置切玻璃/物料出库场景
// ==========================================

#[path = "../test_helpers.rs"]
mod test_helpers;

use std::sync::{Arc, Mutex};

use glass_slip_engine::app::AppState;
use glass_slip_engine::config::ConfigManager;
use glass_slip_engine::db::{apply_schema, open_sqlite_connection};
use glass_slip_engine::domain::types::ProductionOrderType;
use glass_slip_engine::domain::ProductionMaterial;
use glass_slip_engine::engine::{ProductionOrderService, ProductionOutputService};
use glass_slip_engine::repository::{ProductRepository, ProductionRepository};
use tempfile::NamedTempFile;

use super::test_data_builder::{order, output, ProductBuilder};

pub use test_helpers::count_rows;

// ==========================================
// 测试环境
// ==========================================
pub struct SlipTestEnv {
    pub state: AppState,
    pub product_repo: ProductRepository,
    pub production_repo: ProductionRepository,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl SlipTestEnv {
    /// 默认环境（SQLite 协作服务）
    pub fn new() -> Result<Self, Box<dyn std::error::Error>> {
        let (temp_file, db_path) = test_helpers::create_test_db()?;
        let state = AppState::new(db_path)?;
        Ok(Self::assemble(state, temp_file))
    }

    /// 替换完成量回写协作服务
    pub fn with_services(
        output_service: Arc<dyn ProductionOutputService>,
        order_service: Arc<dyn ProductionOrderService>,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let (temp_file, db_path) = test_helpers::create_test_db()?;
        let conn = open_sqlite_connection(&db_path)?;
        apply_schema(&conn)?;
        let conn = Arc::new(Mutex::new(conn));

        let config_manager = Arc::new(ConfigManager::from_connection(conn.clone()).map_err(|e| e.to_string())?);
        let state = AppState::with_services(conn, config_manager, output_service, order_service);
        Ok(Self::assemble(state, temp_file))
    }

    fn assemble(state: AppState, temp_file: NamedTempFile) -> Self {
        glass_slip_engine::logging::init_test();
        Self {
            product_repo: ProductRepository::from_connection(state.conn.clone()),
            production_repo: ProductionRepository::from_connection(state.conn.clone()),
            state,
            _temp_file: temp_file,
        }
    }

    /// 统计表行数
    pub fn count(&self, table: &str) -> i64 {
        let conn = self.state.conn.lock().unwrap();
        count_rows(&conn, table)
    }

    pub fn finished_of(&self, output_id: i64) -> f64 {
        self.production_repo
            .find_output_by_id(output_id)
            .unwrap()
            .unwrap()
            .finished
    }

    // ==========================================
    // 场景: 切玻璃
    // ==========================================

    /// 生产指令 LSX001（切玻璃）
    /// - A: 原片玻璃（NVL, tấm）
    /// - B: 半成品（计划产出，计划 10）
    /// - C: 余料玻璃（NVL, tấm）
    /// - D: 另一种原片（NVL, tấm）
    pub fn seed_cut_glass(&self) -> CutGlassFixture {
        let raw_a = self
            .product_repo
            .create(&ProductBuilder::new("K-A", "Kính trắng 8mm").build())
            .unwrap();
        let semi_b = self
            .product_repo
            .create(
                &ProductBuilder::new("K-B", "Kính cắt 500x800")
                    .product_type("Bán thành phẩm")
                    .build(),
            )
            .unwrap();
        let offcut_c = self
            .product_repo
            .create(&ProductBuilder::new("K-C", "Kính dư 8mm").build())
            .unwrap();
        let raw_d = self
            .product_repo
            .create(&ProductBuilder::new("K-D", "Kính trắng 10mm").build())
            .unwrap();

        let order_id = self
            .production_repo
            .create_order(&order("LSX001", ProductionOrderType::CutGlass))
            .unwrap();
        let output_id = self
            .production_repo
            .create_output(&output(order_id, semi_b, "Kính cắt 500x800", 10.0))
            .unwrap();

        CutGlassFixture {
            order_id,
            output_id,
            raw_a,
            semi_b,
            offcut_c,
            raw_d,
        }
    }

    // ==========================================
    // 场景: 物料出库（合片）
    // ==========================================

    /// 生产指令 LSX002（合片）
    /// - 计划产出 E: 计划 50
    /// - BOM: 原片 G（tấm）+ 丁基胶 H（kg）
    pub fn seed_material_export(&self) -> MaterialExportFixture {
        let glass_g = self
            .product_repo
            .create(
                &ProductBuilder::new("K-G", "Kính cường lực 5mm")
                    .product_type("Kính")
                    .build(),
            )
            .unwrap();
        let glue_h = self
            .product_repo
            .create(
                &ProductBuilder::new("KEO-H", "Keo butyl")
                    .product_type("NVL")
                    .uom("kg")
                    .build(),
            )
            .unwrap();
        let product_e = self
            .product_repo
            .create(
                &ProductBuilder::new("K-E", "Kính hộp 5-9-5")
                    .product_type("Thành phẩm")
                    .build(),
            )
            .unwrap();

        let order_id = self
            .production_repo
            .create_order(&order("LSX002", ProductionOrderType::GlueLamination))
            .unwrap();
        let output_id = self
            .production_repo
            .create_output(&output(order_id, product_e, "Kính hộp 5-9-5", 50.0))
            .unwrap();
        for (product_id, uom, amount) in [(glass_g, "tấm", 2.0), (glue_h, "kg", 0.5)] {
            self.production_repo
                .create_material(&ProductionMaterial {
                    id: 0,
                    production_output_id: output_id,
                    product_id,
                    uom: Some(uom.to_string()),
                    amount,
                })
                .unwrap();
        }

        MaterialExportFixture {
            order_id,
            output_id,
            glass_g,
            glue_h,
            product_e,
        }
    }
}

pub struct CutGlassFixture {
    pub order_id: i64,
    pub output_id: i64,
    pub raw_a: i64,
    pub semi_b: i64,
    pub offcut_c: i64,
    pub raw_d: i64,
}

pub struct MaterialExportFixture {
    pub order_id: i64,
    pub output_id: i64,
    pub glass_g: i64,
    pub glue_h: i64,
    pub product_e: i64,
}
