//! Chapter Commands

use uuid::Uuid;

/// 创建章节（成员可写；编号缺省为当前最大编号 + 1）
#[derive(Debug, Clone)]
pub struct CreateChapterCommand {
    pub user_id: String,
    pub project_id: Uuid,
    pub title: String,
    pub content: String,
    pub chapter_number: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CreateChapterResponse {
    pub chapter_id: Uuid,
    pub chapter_number: u32,
    pub word_count: u64,
}

/// 更新章节内容（成员可写；旧内容进入版本快照）
#[derive(Debug, Clone)]
pub struct UpdateChapterCommand {
    pub user_id: String,
    pub chapter_id: Uuid,
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Clone)]
pub struct UpdateChapterResponse {
    pub chapter_id: Uuid,
    pub version: u32,
    pub word_count: u64,
}

/// 删除章节（成员可写）
#[derive(Debug, Clone)]
pub struct DeleteChapterCommand {
    pub user_id: String,
    pub chapter_id: Uuid,
}
