//! Job Context - Value Objects

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 任务唯一标识
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(Uuid);

impl JobId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 任务状态
///
/// 状态图封闭:
/// - pending   → running | cancelled
/// - running   → paused | completed | failed | cancelled
/// - paused    → running | cancelled
/// - 终态（completed/failed/cancelled）不接受任何迁移
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// 已创建，等待 worker 领取
    Pending,
    /// 生成循环运行中
    Running,
    /// 已暂停（章节边界处挂起）
    Paused,
    /// 正常完成
    Completed,
    /// 失败（error_message 带原因）
    Failed,
    /// 已取消
    Cancelled,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Running => "running",
            JobStatus::Paused => "paused",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Cancelled => "cancelled",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(JobStatus::Pending),
            "running" => Some(JobStatus::Running),
            "paused" => Some(JobStatus::Paused),
            "completed" => Some(JobStatus::Completed),
            "failed" => Some(JobStatus::Failed),
            "cancelled" => Some(JobStatus::Cancelled),
            _ => None,
        }
    }

    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled
        )
    }

    /// 状态迁移是否合法
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Pending, Running)
                | (Pending, Cancelled)
                | (Running, Paused)
                | (Running, Completed)
                | (Running, Failed)
                | (Running, Cancelled)
                | (Paused, Running)
                | (Paused, Cancelled)
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// 质量阈值
///
/// 章节被提交前必须达到的最低评分，取值范围 [0, 10]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QualityThreshold(f64);

impl QualityThreshold {
    pub fn new(value: f64) -> Result<Self, &'static str> {
        if !value.is_finite() || !(0.0..=10.0).contains(&value) {
            return Err("质量阈值必须在 [0, 10] 区间内");
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> f64 {
        self.0
    }

    /// 评分是否达标
    pub fn accepts(&self, score: f64) -> bool {
        score >= self.0
    }
}

/// 单次评分记录
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreRecord {
    /// 章节编号
    pub chapter_number: u32,
    /// 第几次尝试（从 1 开始）
    pub attempt: u32,
    /// 评分 [0, 10]
    pub score: f64,
    /// 评委反馈（弱项说明，重试时注入上下文）
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_roundtrip() {
        for status in [
            JobStatus::Pending,
            JobStatus::Running,
            JobStatus::Paused,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Cancelled,
        ] {
            assert_eq!(JobStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(JobStatus::from_str("unknown"), None);
    }

    #[test]
    fn test_transition_graph_is_closed() {
        use JobStatus::*;
        let all = [Pending, Running, Paused, Completed, Failed, Cancelled];

        // 终态不接受任何迁移
        for terminal in [Completed, Failed, Cancelled] {
            for next in all {
                assert!(!terminal.can_transition_to(next));
            }
        }

        // pending 只能到 running / cancelled
        assert!(Pending.can_transition_to(Running));
        assert!(Pending.can_transition_to(Cancelled));
        assert!(!Pending.can_transition_to(Paused));
        assert!(!Pending.can_transition_to(Completed));

        // paused 只能到 running / cancelled
        assert!(Paused.can_transition_to(Running));
        assert!(Paused.can_transition_to(Cancelled));
        assert!(!Paused.can_transition_to(Failed));
    }

    #[test]
    fn test_threshold_validation() {
        assert!(QualityThreshold::new(8.0).is_ok());
        assert!(QualityThreshold::new(0.0).is_ok());
        assert!(QualityThreshold::new(10.0).is_ok());
        assert!(QualityThreshold::new(-0.1).is_err());
        assert!(QualityThreshold::new(10.1).is_err());
        assert!(QualityThreshold::new(f64::NAN).is_err());
    }

    #[test]
    fn test_threshold_accepts() {
        let threshold = QualityThreshold::new(8.0).unwrap();
        assert!(threshold.accepts(8.0));
        assert!(threshold.accepts(9.5));
        assert!(!threshold.accepts(7.9));
    }
}
