//! Scripted Scorer - 用于测试的评分器
//!
//! 按调用顺序返回预置评分，不访问外部服务

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{QualityAssessment, QualityScorerPort, ScoringError};
use crate::domain::narrative::NarrativeContext;

/// 预置的一次评分结果
#[derive(Debug, Clone)]
pub enum ScriptedScore {
    /// 返回指定分数
    Score(f64),
    /// 返回分数和反馈
    ScoreWithFeedback(f64, String),
    /// 返回指定错误
    Fail(String),
}

/// Scripted Scorer
///
/// 脚本耗尽后重复返回最后一项；空白文本仍然 fail closed
pub struct ScriptedScorer {
    script: Mutex<Vec<ScriptedScore>>,
    cursor: AtomicUsize,
}

impl ScriptedScorer {
    pub fn new(script: Vec<ScriptedScore>) -> Self {
        Self {
            script: Mutex::new(script),
            cursor: AtomicUsize::new(0),
        }
    }

    /// 所有调用返回同一分数
    pub fn constant(score: f64) -> Self {
        Self::new(vec![ScriptedScore::Score(score)])
    }

    /// 已消费的调用次数
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<ScriptedScore> {
        let script = self.script.lock().ok()?;
        if script.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        Some(script[index.min(script.len() - 1)].clone())
    }
}

#[async_trait]
impl QualityScorerPort for ScriptedScorer {
    async fn score(
        &self,
        chapter_text: &str,
        _context: &NarrativeContext,
    ) -> Result<QualityAssessment, ScoringError> {
        if chapter_text.trim().is_empty() {
            return Ok(QualityAssessment::rejected_empty());
        }

        match self.next_step() {
            Some(ScriptedScore::Score(score)) => Ok(QualityAssessment {
                score,
                feedback: None,
            }),
            Some(ScriptedScore::ScoreWithFeedback(score, feedback)) => Ok(QualityAssessment {
                score,
                feedback: Some(feedback),
            }),
            Some(ScriptedScore::Fail(message)) => Err(ScoringError::ServiceError(message)),
            None => Err(ScoringError::ServiceError("script is empty".to_string())),
        }
    }
}
