// ==========================================
// 玻璃生产出入库单据 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，转换Repository错误为用户友好的错误消息
// 约定: 每个错误都带稳定的 code()，供传输层映射
// ==========================================

use crate::repository::error::RepositoryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 单据创建/维护错误
    // ==========================================
    #[error("生产指令不存在: id={0}")]
    OrderNotFound(i64),

    #[error("不支持的生产指令类型: order_id={order_id}, type={order_type}")]
    UnsupportedOrderType { order_id: i64, order_type: String },

    #[error("请求校验失败: {reason}")]
    ValidationFailed {
        reason: String,
        violations: Vec<ValidationViolation>,
    },

    #[error("映射明细不属于单据: slip_id={slip_id}, detail_id={detail_id}")]
    MappingDetailNotInSlip { slip_id: i64, detail_id: i64 },

    #[error("单据不存在: id={0}")]
    SlipNotFound(i64),

    #[error("单据已终审，不允许修改: id={0}")]
    SlipFinalized(i64),

    #[error("单据无法终审: slip_id={slip_id}, 未映射的原材料明细={unmapped_detail_ids:?}")]
    FinalizeBlocked {
        slip_id: i64,
        unmapped_detail_ids: Vec<i64>,
    },

    /// 事务写入阶段的意外错误（已整体回滚）
    #[error("单据事务失败（已回滚）: {0}")]
    TransactionFailure(String),

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    /// 单条原因的校验失败
    pub fn validation(reason: impl Into<String>) -> Self {
        ApiError::ValidationFailed {
            reason: reason.into(),
            violations: Vec::new(),
        }
    }

    /// 稳定错误代码
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::OrderNotFound(_) => "ORDER_NOT_FOUND",
            ApiError::UnsupportedOrderType { .. } => "UNSUPPORTED_ORDER_TYPE",
            ApiError::ValidationFailed { .. } => "VALIDATION_FAILED",
            ApiError::MappingDetailNotInSlip { .. } => "MAPPING_DETAIL_NOT_IN_SLIP",
            ApiError::SlipNotFound(_) => "SLIP_NOT_FOUND",
            ApiError::SlipFinalized(_) => "SLIP_FINALIZED",
            ApiError::FinalizeBlocked { .. } => "FINALIZE_BLOCKED",
            ApiError::TransactionFailure(_) => "TRANSACTION_FAILURE",
            ApiError::NotFound(_) => "NOT_FOUND",
            ApiError::DatabaseError(_) => "DATABASE_ERROR",
            ApiError::DatabaseConnectionError(_) => "DATABASE_CONNECTION_ERROR",
            ApiError::InternalError(_) => "INTERNAL_ERROR",
            ApiError::Other(_) => "OTHER_ERROR",
        }
    }

    /// 转换为传输层错误响应
    pub fn to_response(&self) -> ErrorResponse {
        let details = match self {
            ApiError::ValidationFailed { violations, .. } if !violations.is_empty() => {
                Some(serde_json::json!({ "violations": violations }))
            }
            ApiError::MappingDetailNotInSlip { slip_id, detail_id } => Some(serde_json::json!({
                "slip_id": slip_id,
                "detail_id": detail_id,
            })),
            ApiError::FinalizeBlocked {
                slip_id,
                unmapped_detail_ids,
            } => Some(serde_json::json!({
                "slip_id": slip_id,
                "unmapped_detail_ids": unmapped_detail_ids,
            })),
            _ => None,
        };

        ErrorResponse {
            code: self.code().to_string(),
            message: self.to_string(),
            details,
        }
    }

    /// 事务写入阶段的仓储错误映射
    ///
    /// 业务约束类错误保留原语义，其余存储错误归为 TransactionFailure
    pub(crate) fn from_transaction(err: RepositoryError) -> Self {
        match err {
            RepositoryError::MappingDetailNotInSlip { .. } | RepositoryError::ValidationError(_) => {
                err.into()
            }
            other => ApiError::TransactionFailure(other.to_string()),
        }
    }
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::UniqueConstraintViolation(msg) => {
                ApiError::DatabaseError(format!("唯一约束违反: {}", msg))
            }
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::DatabaseError(format!("外键约束违反: {}", msg))
            }
            RepositoryError::MappingDetailNotInSlip { slip_id, detail_id } => {
                ApiError::MappingDetailNotInSlip { slip_id, detail_id }
            }
            RepositoryError::ValidationError(msg) => ApiError::validation(msg),
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;

// ==========================================
// 校验违规详情
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationViolation {
    /// 违规类型（EMPTY_LINES / NON_POSITIVE_QUANTITY / ...）
    pub violation_type: String,
    /// 请求中的行/边/目标下标
    pub index: Option<usize>,
    /// 违规原因
    pub reason: String,
}

/// 错误响应（传输层）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub message: String,
    pub details: Option<serde_json::Value>,
}
