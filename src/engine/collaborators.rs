// ==========================================
// 玻璃生产出入库单据 - 外部协作方接口
// ==========================================
// 职责: 定义完成量回写所需的外部服务 trait，实现依赖倒置
// 说明: Engine 层定义 trait，services 层提供 SQLite 默认实现，
//       测试中可替换为失败/计数用的替身
// ==========================================

use std::error::Error;

/// 协作方调用结果
pub type CollaboratorResult<T> = Result<T, Box<dyn Error + Send + Sync>>;

/// 计划产出服务
pub trait ProductionOutputService: Send + Sync {
    /// 累加计划产出完成量
    ///
    /// # 返回
    /// - Ok(true): 已累加
    /// - Ok(false): 数量非正或计划产出不存在
    /// - Err: 服务故障
    fn update_finished_quantity(&self, output_id: i64, amount: f64) -> CollaboratorResult<bool>;
}

/// 生产指令服务
pub trait ProductionOrderService: Send + Sync {
    /// 重新评估生产指令是否完成（可重复调用）
    ///
    /// # 返回
    /// - Ok(true): 所有计划产出已达成，状态已置为完成
    /// - Ok(false): 未完成或生产指令不存在
    fn check_and_update_completion(&self, order_id: i64) -> CollaboratorResult<bool>;
}
