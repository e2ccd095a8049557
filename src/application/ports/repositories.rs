//! Repository Ports - 出站端口
//!
//! 定义数据持久化的抽象接口
//! 具体实现在 infrastructure 层（SQLite）

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::job::JobStatus;

/// Repository 错误
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Duplicate entity: {0}")]
    Duplicate(String),

    #[error("Version conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// ============================================================================
// Project Repository
// ============================================================================

/// 项目实体（用于持久化）
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    /// 项目设置（JSON 序列化存储）
    pub settings_json: String,
    pub bible_content: Option<String>,
    pub bible_version: u32,
    pub bible_ai_expanded: bool,
    pub bible_updated_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project Repository Port
#[async_trait]
pub trait ProjectRepositoryPort: Send + Sync {
    /// 保存项目（upsert）
    async fn save(&self, project: &ProjectRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找项目
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepositoryError>;

    /// 列出用户可见的项目（owner 或 collaborator）
    async fn find_by_member(&self, user_id: &str) -> Result<Vec<ProjectRecord>, RepositoryError>;

    /// 删除项目（级联删除章节/笔记/任务由外键处理）
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 获取协作者列表
    async fn collaborators(&self, project_id: Uuid) -> Result<Vec<String>, RepositoryError>;

    /// 添加协作者（幂等）
    async fn add_collaborator(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> Result<(), RepositoryError>;

    /// 移除协作者
    async fn remove_collaborator(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> Result<(), RepositoryError>;

    /// 更新圣经内容（CAS on bible_version）
    ///
    /// expected_version 不匹配时返回 Conflict
    async fn update_bible(
        &self,
        project_id: Uuid,
        content: &str,
        expected_version: u32,
        ai_expanded: bool,
    ) -> Result<u32, RepositoryError>;
}

// ============================================================================
// Chapter Repository
// ============================================================================

/// 章节实体（用于持久化）
#[derive(Debug, Clone)]
pub struct ChapterRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub chapter_number: u32,
    pub title: String,
    pub content: String,
    pub word_count: u64,
    pub creator_id: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 章节历史版本快照
#[derive(Debug, Clone)]
pub struct ChapterVersionRecord {
    pub id: Uuid,
    pub chapter_id: Uuid,
    /// 快照对应的版本号（被替换时的 version）
    pub version: u32,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Chapter Repository Port
#[async_trait]
pub trait ChapterRepositoryPort: Send + Sync {
    /// 保存章节（upsert，编号在项目内唯一）
    async fn save(&self, chapter: &ChapterRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找章节
    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepositoryError>;

    /// 获取项目的所有章节（按编号升序）
    async fn find_by_project(&self, project_id: Uuid)
        -> Result<Vec<ChapterRecord>, RepositoryError>;

    /// 根据编号查找章节
    async fn find_by_number(
        &self,
        project_id: Uuid,
        number: u32,
    ) -> Result<Option<ChapterRecord>, RepositoryError>;

    /// 项目内已有的最大章节编号（无章节时为 0）
    async fn max_chapter_number(&self, project_id: Uuid) -> Result<u32, RepositoryError>;

    /// 删除章节
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;

    /// 追加历史版本快照
    async fn append_version(&self, version: &ChapterVersionRecord) -> Result<(), RepositoryError>;

    /// 获取章节的历史版本（按版本号升序）
    async fn versions(&self, chapter_id: Uuid)
        -> Result<Vec<ChapterVersionRecord>, RepositoryError>;
}

// ============================================================================
// Note Repository
// ============================================================================

/// 导演笔记实体（用于持久化）
#[derive(Debug, Clone)]
pub struct NoteRecord {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub project_id: Uuid,
    pub content: String,
    pub position: Option<u32>,
    pub creator_id: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Note Repository Port
#[async_trait]
pub trait NoteRepositoryPort: Send + Sync {
    /// 新建笔记
    async fn insert(&self, note: &NoteRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找笔记
    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, RepositoryError>;

    /// 获取章节的所有笔记（按创建时间升序）
    async fn find_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<NoteRecord>, RepositoryError>;

    /// 更新笔记（CAS on version）
    ///
    /// expected_version 不匹配时返回 Conflict，防止并发编辑丢失更新
    async fn update(&self, note: &NoteRecord, expected_version: u32)
        -> Result<(), RepositoryError>;

    /// 删除笔记
    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError>;
}

// ============================================================================
// Job Repository
// ============================================================================

/// 任务实体（用于持久化）
#[derive(Debug, Clone)]
pub struct JobRecord {
    pub id: Uuid,
    pub project_id: Uuid,
    pub owner_id: String,
    pub status: JobStatus,
    pub current_chapter: u32,
    pub target_chapters: u32,
    pub quality_threshold: f64,
    pub total_words: u64,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// 任务评分记录（用于持久化）
#[derive(Debug, Clone)]
pub struct JobScoreRecord {
    pub job_id: Uuid,
    pub chapter_number: u32,
    pub attempt: u32,
    pub score: f64,
    pub feedback: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Job Repository Port
///
/// 任务状态是控制并发的唯一权威字段：
/// 所有状态迁移通过 update_status_cas 以 compare-and-swap 语义落库
#[async_trait]
pub trait JobRepositoryPort: Send + Sync {
    /// 新建任务
    async fn insert(&self, job: &JobRecord) -> Result<(), RepositoryError>;

    /// 根据 ID 查找任务
    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobRecord>, RepositoryError>;

    /// 列出用户的任务（按创建时间降序）
    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<JobRecord>, RepositoryError>;

    /// 查找项目的活跃任务（pending/running/paused）
    async fn find_active_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Option<JobRecord>, RepositoryError>;

    /// 按状态查找任务（进程重启恢复用）
    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, RepositoryError>;

    /// 状态迁移（CAS）
    ///
    /// 仅当当前状态等于 expected 时落库，返回是否生效；
    /// error_message 仅在迁移生效时写入
    async fn update_status_cas(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, RepositoryError>;

    /// 更新进度字段
    async fn update_progress(
        &self,
        id: Uuid,
        current_chapter: u32,
        total_words: u64,
    ) -> Result<(), RepositoryError>;

    /// 追加评分记录
    async fn append_score(&self, score: &JobScoreRecord) -> Result<(), RepositoryError>;

    /// 获取任务的评分记录（按章节/尝试升序）
    async fn scores(&self, job_id: Uuid) -> Result<Vec<JobScoreRecord>, RepositoryError>;
}
