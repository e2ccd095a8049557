//! Job Context - Aggregate Root

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{JobError, JobId, JobStatus, QualityThreshold};
use crate::domain::project::ProjectId;

/// 自动补全任务聚合根
///
/// 一次章节自动生成流程的执行实例。聚合负责启动参数校验；
/// 运行期状态迁移的权威在存储层 CAS，合法性由
/// JobStatus::can_transition_to 定义
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    id: JobId,
    project_id: ProjectId,
    owner_id: String,
    status: JobStatus,
    /// 已提交的最后一章编号（0 表示尚未提交任何章节）
    current_chapter: u32,
    target_chapters: u32,
    quality_threshold: QualityThreshold,
    /// 已提交章节字数合计
    total_words: u64,
    error_message: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// 创建新任务
    ///
    /// 参数校验: target_chapters > 0，阈值在 [0, 10]
    pub fn new(
        project_id: ProjectId,
        owner_id: impl Into<String>,
        target_chapters: u32,
        quality_threshold: f64,
    ) -> Result<Self, JobError> {
        if target_chapters == 0 {
            return Err(JobError::InvalidParameters(
                "target_chapters 必须大于 0".to_string(),
            ));
        }
        let quality_threshold = QualityThreshold::new(quality_threshold)
            .map_err(|e| JobError::InvalidParameters(e.to_string()))?;

        let now = Utc::now();
        Ok(Self {
            id: JobId::new(),
            project_id,
            owner_id: owner_id.into(),
            status: JobStatus::Pending,
            current_chapter: 0,
            target_chapters,
            quality_threshold,
            total_words: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        })
    }

    // Getters
    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn owner_id(&self) -> &str {
        &self.owner_id
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn current_chapter(&self) -> u32 {
        self.current_chapter
    }

    pub fn target_chapters(&self) -> u32 {
        self.target_chapters
    }

    pub fn quality_threshold(&self) -> QualityThreshold {
        self.quality_threshold
    }

    pub fn total_words(&self) -> u64 {
        self.total_words
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }
}
