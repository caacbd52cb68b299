// ==========================================
// 玻璃生产 - 出入库单据引擎 - 核心库
// ==========================================
// 范围: 生产指令的出入库单据、物料→产出映射、完成量回写
// 技术栈: Rust + SQLite
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 分类/单号/回写规则
pub mod engine;

// 外部协作服务的默认实现
pub mod services;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/建表/迁移）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 共享状态装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{DetailRole, ProductionOrderType, ProductionStatus, SlipStrategy};

// 领域实体
pub use domain::{
    InventorySlip, InventorySlipDetail, MaterialOutputMapping, Product, ProductionMaterial,
    ProductionOrder, ProductionOutput,
};

// 引擎
pub use engine::{
    classify, ClassificationContext, ProductionOrderService, ProductionOutputService,
    QuantityReconciler, SlipCodeGenerator,
};

// API
pub use api::{ApiError, ApiResult, InventorySlipApi, ProductionOrderApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "玻璃生产出入库单据引擎";
