//! Project Context - Errors

use thiserror::Error;

use super::ProjectId;

#[derive(Debug, Error)]
pub enum ProjectError {
    #[error("项目不存在: {0}")]
    NotFound(ProjectId),

    #[error("无效的标题: {0}")]
    InvalidTitle(String),

    #[error("无效的章节编号: {0}")]
    InvalidChapterNumber(u32),

    #[error("内容不能为空")]
    EmptyContent,

    #[error("无效的协作者: {0}")]
    InvalidCollaborator(String),

    #[error("圣经版本冲突: expected {expected}, actual {actual}")]
    BibleVersionConflict { expected: u32, actual: u32 },
}
