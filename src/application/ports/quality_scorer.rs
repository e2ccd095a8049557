//! Quality Scorer Port - 章节质量评分
//!
//! 对一章候选文本做质量评判；评分是概率性的咨询值，不保证可复现。
//! 契约: 空白/截断文本必须直接判 0 分（fail closed），不得调用外部评委

use async_trait::async_trait;
use thiserror::Error;

use crate::domain::narrative::NarrativeContext;

/// 评分错误
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Scoring request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Scoring service error: {0}")]
    ServiceError(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ScoringError {
    /// 是否值得重试（瞬时故障）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ScoringError::Timeout
                | ScoringError::NetworkError(_)
                | ScoringError::ServiceError(_)
        )
    }
}

/// 质量评估结果
#[derive(Debug, Clone)]
pub struct QualityAssessment {
    /// 评分 [0, 10]
    pub score: f64,
    /// 结构化反馈（弱项说明，供重试注入）
    pub feedback: Option<String>,
}

impl QualityAssessment {
    /// 空白文本的 fail-closed 评估
    pub fn rejected_empty() -> Self {
        Self {
            score: 0.0,
            feedback: Some("Chapter text is empty or truncated".to_string()),
        }
    }
}

/// Quality Scorer Port
#[async_trait]
pub trait QualityScorerPort: Send + Sync {
    /// 对章节文本评分
    ///
    /// 无副作用；除外部评委调用外是输入的纯函数
    async fn score(
        &self,
        chapter_text: &str,
        context: &NarrativeContext,
    ) -> Result<QualityAssessment, ScoringError>;
}
