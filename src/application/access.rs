//! 授权检查
//!
//! 把声明式的所有权/协作者规则落为显式检查，所有 handler 在执行前调用:
//! - owner 专属: 修改设置、删除项目、管理协作者
//! - owner + collaborator: 内容读写（章节、笔记、圣经内容、任务）
//!
//! 统一返回 Forbidden / NotFound，避免各 handler 自行拼逻辑

use std::sync::Arc;
use uuid::Uuid;

use crate::application::error::ApplicationError;
use crate::application::ports::{ProjectRecord, ProjectRepositoryPort};

/// 加载项目，不存在则 NotFound
pub async fn require_project(
    project_repo: &Arc<dyn ProjectRepositoryPort>,
    project_id: Uuid,
) -> Result<ProjectRecord, ApplicationError> {
    project_repo
        .find_by_id(project_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Project", project_id))
}

/// 加载项目并要求调用者为成员（owner 或 collaborator）
pub async fn require_member(
    project_repo: &Arc<dyn ProjectRepositoryPort>,
    project_id: Uuid,
    user_id: &str,
) -> Result<ProjectRecord, ApplicationError> {
    let project = require_project(project_repo, project_id).await?;
    if project.owner_id == user_id {
        return Ok(project);
    }

    let collaborators = project_repo.collaborators(project_id).await?;
    if collaborators.iter().any(|c| c == user_id) {
        return Ok(project);
    }

    Err(ApplicationError::forbidden(format!(
        "user {} is not a member of project {}",
        user_id, project_id
    )))
}

/// 加载项目并要求调用者为 owner
pub async fn require_owner(
    project_repo: &Arc<dyn ProjectRepositoryPort>,
    project_id: Uuid,
    user_id: &str,
) -> Result<ProjectRecord, ApplicationError> {
    let project = require_project(project_repo, project_id).await?;
    if project.owner_id != user_id {
        return Err(ApplicationError::forbidden(format!(
            "user {} is not the owner of project {}",
            user_id, project_id
        )));
    }
    Ok(project)
}
