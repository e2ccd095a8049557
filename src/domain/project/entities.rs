//! Project Context - Entities
//!
//! Chapter（章节）与 DirectorsNote（导演笔记）实体

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ProjectError, ProjectId};

/// 统计正文字数
///
/// 以空白分词计数；对于 CJK 文本近似为句段数，生成侧以同样口径统计，
/// 保证 total_words 累加口径一致
pub fn count_words(content: &str) -> u64 {
    content.split_whitespace().count() as u64
}

/// 章节实体
///
/// 不变量:
/// - chapter_number 在项目内唯一，从 1 开始
/// - content 不可为空
/// - 更新不覆盖历史，旧内容进入版本快照
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chapter {
    id: Uuid,
    project_id: ProjectId,
    number: u32,
    title: String,
    content: String,
    word_count: u64,
    creator_id: String,
    /// 内容版本号（每次 update +1）
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Chapter {
    pub fn new(
        project_id: ProjectId,
        number: u32,
        title: impl Into<String>,
        content: impl Into<String>,
        creator_id: impl Into<String>,
    ) -> Result<Self, ProjectError> {
        let content = content.into();
        if number == 0 {
            return Err(ProjectError::InvalidChapterNumber(number));
        }
        if content.trim().is_empty() {
            return Err(ProjectError::EmptyContent);
        }

        let now = Utc::now();
        let word_count = count_words(&content);
        Ok(Self {
            id: Uuid::new_v4(),
            project_id,
            number,
            title: title.into(),
            content,
            word_count,
            creator_id: creator_id.into(),
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// 从持久化字段重建
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        project_id: ProjectId,
        number: u32,
        title: String,
        content: String,
        word_count: u64,
        creator_id: String,
        version: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            project_id,
            number,
            title,
            content,
            word_count,
            creator_id,
            version,
            created_at,
            updated_at,
        }
    }

    /// 更新章节内容，返回被替换的旧内容（供版本快照持久化）
    pub fn revise(
        &mut self,
        title: Option<String>,
        content: String,
    ) -> Result<String, ProjectError> {
        if content.trim().is_empty() {
            return Err(ProjectError::EmptyContent);
        }

        let previous = std::mem::replace(&mut self.content, content);
        if let Some(title) = title {
            self.title = title;
        }
        self.word_count = count_words(&self.content);
        self.version += 1;
        self.updated_at = Utc::now();
        Ok(previous)
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn word_count(&self) -> u64 {
        self.word_count
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// 导演笔记实体
///
/// 用户对章节的批注，独立于生成管线
///
/// 不变量:
/// - 仅创建者可修改/删除
/// - version 用于乐观并发控制（防止并发编辑丢失更新）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectorsNote {
    id: Uuid,
    chapter_id: Uuid,
    project_id: ProjectId,
    content: String,
    /// 章节内字符偏移（可选锚点）
    position: Option<u32>,
    creator_id: String,
    resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    version: u32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl DirectorsNote {
    pub fn new(
        chapter_id: Uuid,
        project_id: ProjectId,
        content: impl Into<String>,
        position: Option<u32>,
        creator_id: impl Into<String>,
    ) -> Result<Self, ProjectError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(ProjectError::EmptyContent);
        }

        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            chapter_id,
            project_id,
            content,
            position,
            creator_id: creator_id.into(),
            resolved: false,
            resolved_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// 从持久化字段重建
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: Uuid,
        chapter_id: Uuid,
        project_id: ProjectId,
        content: String,
        position: Option<u32>,
        creator_id: String,
        resolved: bool,
        resolved_at: Option<DateTime<Utc>>,
        version: u32,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            chapter_id,
            project_id,
            content,
            position,
            creator_id,
            resolved,
            resolved_at,
            version,
            created_at,
            updated_at,
        }
    }

    /// 编辑笔记内容
    pub fn edit(&mut self, content: String) -> Result<(), ProjectError> {
        if content.trim().is_empty() {
            return Err(ProjectError::EmptyContent);
        }
        self.content = content;
        self.version += 1;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// 标记为已解决
    pub fn resolve(&mut self) {
        if !self.resolved {
            self.resolved = true;
            self.resolved_at = Some(Utc::now());
            self.version += 1;
            self.updated_at = Utc::now();
        }
    }

    // Getters
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn chapter_id(&self) -> Uuid {
        self.chapter_id
    }

    pub fn project_id(&self) -> &ProjectId {
        &self.project_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn position(&self) -> Option<u32> {
        self.position
    }

    pub fn creator_id(&self) -> &str {
        &self.creator_id
    }

    pub fn resolved(&self) -> bool {
        self.resolved
    }

    pub fn resolved_at(&self) -> Option<DateTime<Utc>> {
        self.resolved_at
    }

    pub fn version(&self) -> u32 {
        self.version
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chapter_creation() {
        let chapter = Chapter::new(
            ProjectId::new(),
            1,
            "第一章",
            "夜色笼罩着车站 列车迟迟未到",
            "user-1",
        )
        .unwrap();

        assert_eq!(chapter.number(), 1);
        assert_eq!(chapter.version(), 1);
        assert_eq!(chapter.word_count(), 2);
    }

    #[test]
    fn test_chapter_rejects_invalid() {
        assert!(Chapter::new(ProjectId::new(), 0, "t", "content", "u").is_err());
        assert!(Chapter::new(ProjectId::new(), 1, "t", "   ", "u").is_err());
    }

    #[test]
    fn test_chapter_revise_keeps_previous() {
        let mut chapter =
            Chapter::new(ProjectId::new(), 1, "第一章", "初稿内容", "user-1").unwrap();

        let previous = chapter
            .revise(Some("第一章（修订）".to_string()), "二稿内容".to_string())
            .unwrap();

        assert_eq!(previous, "初稿内容");
        assert_eq!(chapter.content(), "二稿内容");
        assert_eq!(chapter.version(), 2);
    }

    #[test]
    fn test_note_resolve_is_idempotent() {
        let mut note = DirectorsNote::new(
            Uuid::new_v4(),
            ProjectId::new(),
            "这里节奏太慢",
            Some(120),
            "user-1",
        )
        .unwrap();

        note.resolve();
        let first_resolved_at = note.resolved_at();
        let first_version = note.version();

        note.resolve();
        assert_eq!(note.resolved_at(), first_resolved_at);
        assert_eq!(note.version(), first_version);
    }
}
