//! 应用层错误定义
//!
//! 统一的命令/查询错误类型，覆盖规约的错误分类

use thiserror::Error;

use crate::domain::job::JobStatus;

/// 应用层错误
#[derive(Debug, Error)]
pub enum ApplicationError {
    /// 缺失或无效身份
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// 身份有效但无资源权限
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// 资源未找到
    #[error("{resource_type} not found: {id}")]
    NotFound {
        resource_type: &'static str,
        id: String,
    },

    /// 启动/更新参数非法
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// 控制命令对当前任务状态非法
    #[error("Invalid transition: {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    /// 重试预算耗尽仍未达质量阈值
    #[error("Quality threshold unreachable at chapter {chapter} after {attempts} attempts")]
    QualityThresholdUnreachable { chapter: u32, attempts: u32 },

    /// 外部生成服务失败（已重试后上浮）
    #[error("Generation service error: {0}")]
    GenerationServiceError(String),

    /// 外部评分服务失败（已重试后上浮）
    #[error("Scoring service error: {0}")]
    ScoringServiceError(String),

    /// 并发编辑版本冲突
    #[error("Version conflict: {0}")]
    VersionConflict(String),

    /// 仓储错误
    #[error("Repository error: {0}")]
    RepositoryError(String),

    /// 内部错误
    #[error("Internal error: {0}")]
    InternalError(String),
}

impl ApplicationError {
    /// 创建 NotFound 错误
    pub fn not_found(resource_type: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            resource_type,
            id: id.to_string(),
        }
    }

    /// 创建 Forbidden 错误
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// 创建参数校验错误
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidParameters(message.into())
    }

    /// 创建内部错误
    pub fn internal(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }
}

impl From<crate::application::ports::RepositoryError> for ApplicationError {
    fn from(err: crate::application::ports::RepositoryError) -> Self {
        use crate::application::ports::RepositoryError;
        match err {
            RepositoryError::NotFound(msg) => ApplicationError::NotFound {
                resource_type: "Entity",
                id: msg,
            },
            RepositoryError::Conflict(msg) => ApplicationError::VersionConflict(msg),
            other => ApplicationError::RepositoryError(other.to_string()),
        }
    }
}

impl From<crate::domain::job::JobError> for ApplicationError {
    fn from(err: crate::domain::job::JobError) -> Self {
        use crate::domain::job::JobError;
        match err {
            JobError::InvalidParameters(msg) => ApplicationError::InvalidParameters(msg),
        }
    }
}
