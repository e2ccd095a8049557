//! Chapter Queries

use uuid::Uuid;

/// 获取章节详情（成员可读）
#[derive(Debug, Clone)]
pub struct GetChapterQuery {
    pub user_id: String,
    pub chapter_id: Uuid,
}

/// 列出项目章节（成员可读，按编号升序）
#[derive(Debug, Clone)]
pub struct ListChaptersQuery {
    pub user_id: String,
    pub project_id: Uuid,
}

/// 获取章节历史版本（成员可读）
#[derive(Debug, Clone)]
pub struct GetChapterVersionsQuery {
    pub user_id: String,
    pub chapter_id: Uuid,
}
