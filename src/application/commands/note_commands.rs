//! Director's Note Commands

use uuid::Uuid;

/// 创建笔记（成员可写）
#[derive(Debug, Clone)]
pub struct CreateNoteCommand {
    pub user_id: String,
    pub chapter_id: Uuid,
    pub content: String,
    pub position: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct CreateNoteResponse {
    pub note_id: Uuid,
}

/// 编辑笔记内容（仅创建者，CAS on version）
#[derive(Debug, Clone)]
pub struct UpdateNoteCommand {
    pub user_id: String,
    pub note_id: Uuid,
    pub content: String,
    pub expected_version: u32,
}

/// 标记笔记已解决（仅创建者，CAS on version）
#[derive(Debug, Clone)]
pub struct ResolveNoteCommand {
    pub user_id: String,
    pub note_id: Uuid,
    pub expected_version: u32,
}

#[derive(Debug, Clone)]
pub struct NoteMutationResponse {
    pub note_id: Uuid,
    pub version: u32,
    pub resolved: bool,
}

/// 删除笔记（仅创建者）
#[derive(Debug, Clone)]
pub struct DeleteNoteCommand {
    pub user_id: String,
    pub note_id: Uuid,
}
