//! Auto-Complete Job Queries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::application::ports::{JobRecord, JobScoreRecord};
use crate::domain::job::JobStatus;

/// 获取任务快照（仅任务 owner）
#[derive(Debug, Clone)]
pub struct GetJobStatusQuery {
    pub user_id: String,
    pub job_id: Uuid,
}

/// 列出调用者的任务
#[derive(Debug, Clone)]
pub struct ListJobsQuery {
    pub user_id: String,
}

/// 评分记录快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub chapter_number: u32,
    pub attempt: u32,
    pub score: f64,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&JobScoreRecord> for ScoreEntry {
    fn from(record: &JobScoreRecord) -> Self {
        Self {
            chapter_number: record.chapter_number,
            attempt: record.attempt,
            score: record.score,
            feedback: record.feedback.clone(),
            created_at: record.created_at,
        }
    }
}

/// 任务快照
///
/// status 端点与进度推送共用同一结构；
/// 推送事件为缩减快照（scores 为空），完整评分以 status 端点为准
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobSnapshot {
    pub job_id: Uuid,
    pub project_id: Uuid,
    pub status: JobStatus,
    pub current_chapter: u32,
    pub target_chapters: u32,
    pub quality_threshold: f64,
    pub total_words: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub scores: Vec<ScoreEntry>,
}

impl JobSnapshot {
    /// 从持久化记录构建快照
    pub fn from_record(record: &JobRecord, scores: &[JobScoreRecord]) -> Self {
        Self {
            job_id: record.id,
            project_id: record.project_id,
            status: record.status,
            current_chapter: record.current_chapter,
            target_chapters: record.target_chapters,
            quality_threshold: record.quality_threshold,
            total_words: record.total_words,
            error_message: record.error_message.clone(),
            created_at: record.created_at,
            updated_at: record.updated_at,
            completed_at: record.completed_at,
            scores: scores.iter().map(ScoreEntry::from).collect(),
        }
    }
}
