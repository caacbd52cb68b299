// ==========================================
// 玻璃生产出入库单据 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: *_tx 关联函数接收 &Connection（Transaction 可自动解引用），
//       由编排层在持有连接锁期间组合调用
// ==========================================

pub mod error;
pub mod mapping_repo;
pub mod product_repo;
pub mod production_repo;
pub mod slip_repo;

// 重导出核心仓储
pub use error::{RepositoryError, RepositoryResult};
pub use mapping_repo::MaterialOutputMappingRepository;
pub use product_repo::ProductRepository;
pub use production_repo::ProductionRepository;
pub use slip_repo::InventorySlipRepository;
