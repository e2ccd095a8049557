//! Project Commands

use uuid::Uuid;

use crate::domain::project::ProjectSettings;

/// 创建项目
#[derive(Debug, Clone)]
pub struct CreateProjectCommand {
    pub user_id: String,
    pub title: String,
    pub settings: Option<ProjectSettings>,
}

#[derive(Debug, Clone)]
pub struct CreateProjectResponse {
    pub project_id: Uuid,
    pub title: String,
}

/// 更新项目设置（owner 专属）
#[derive(Debug, Clone)]
pub struct UpdateSettingsCommand {
    pub user_id: String,
    pub project_id: Uuid,
    pub settings: ProjectSettings,
}

/// 删除项目（owner 专属）
#[derive(Debug, Clone)]
pub struct DeleteProjectCommand {
    pub user_id: String,
    pub project_id: Uuid,
}

/// 添加协作者（owner 专属）
#[derive(Debug, Clone)]
pub struct AddCollaboratorCommand {
    pub user_id: String,
    pub project_id: Uuid,
    pub collaborator_id: String,
}

/// 移除协作者（owner 专属）
#[derive(Debug, Clone)]
pub struct RemoveCollaboratorCommand {
    pub user_id: String,
    pub project_id: Uuid,
    pub collaborator_id: String,
}

/// 更新书籍圣经（成员可写，CAS on version）
#[derive(Debug, Clone)]
pub struct UpdateBibleCommand {
    pub user_id: String,
    pub project_id: Uuid,
    pub content: String,
    pub expected_version: u32,
    pub ai_expanded: bool,
}

#[derive(Debug, Clone)]
pub struct UpdateBibleResponse {
    pub project_id: Uuid,
    pub version: u32,
}
