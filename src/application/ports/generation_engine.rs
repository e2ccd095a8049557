//! Generation Engine Port - 章节生成引擎
//!
//! 定义外部文本生成服务的抽象接口，具体实现在 infrastructure/adapters 层

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

/// 生成引擎错误
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Generation service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl GenerationError {
    /// 是否值得重试（瞬时故障）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            GenerationError::Timeout
                | GenerationError::NetworkError(_)
                | GenerationError::ServiceError(_)
        )
    }
}

/// 章节生成请求
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub project_id: Uuid,
    pub chapter_number: u32,
    /// 由叙事上下文渲染出的完整提示词
    pub prompt: String,
    /// 单章目标字数
    pub target_words: u32,
}

/// 章节生成响应
#[derive(Debug, Clone)]
pub struct GenerationResponse {
    pub title: String,
    pub content: String,
    /// 生成端明示的叙事完结信号
    pub is_ending: bool,
    /// 实际使用的模型名（可选，仅做日志）
    pub model: Option<String>,
}

/// Generation Engine Port
#[async_trait]
pub trait GenerationEnginePort: Send + Sync {
    /// 生成一章候选内容
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, GenerationError>;

    /// 健康检查
    async fn health_check(&self) -> bool;
}
