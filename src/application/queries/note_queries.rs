//! Director's Note Queries

use uuid::Uuid;

/// 列出章节的笔记（成员可读，按创建时间升序）
#[derive(Debug, Clone)]
pub struct ListNotesQuery {
    pub user_id: String,
    pub chapter_id: Uuid,
}
