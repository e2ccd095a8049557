//! Project Command Handlers

use std::sync::Arc;

use crate::application::access::{require_member, require_owner};
use crate::application::commands::project_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{ProjectRecord, ProjectRepositoryPort};
use crate::domain::project::{Project, ProjectTitle};

fn settings_to_json(
    settings: &crate::domain::project::ProjectSettings,
) -> Result<String, ApplicationError> {
    serde_json::to_string(settings).map_err(|e| ApplicationError::internal(e.to_string()))
}

/// CreateProject Handler
pub struct CreateProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl CreateProjectHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(
        &self,
        cmd: CreateProjectCommand,
    ) -> Result<CreateProjectResponse, ApplicationError> {
        let title = ProjectTitle::new(cmd.title)
            .map_err(|e| ApplicationError::invalid(e.to_string()))?;

        let mut project = Project::new(cmd.user_id.clone(), title);
        if let Some(settings) = cmd.settings {
            project.update_settings(settings);
        }

        let record = ProjectRecord {
            id: *project.id().as_uuid(),
            owner_id: project.owner_id().to_string(),
            title: project.title().as_str().to_string(),
            settings_json: settings_to_json(project.settings())?,
            bible_content: None,
            bible_version: 0,
            bible_ai_expanded: false,
            bible_updated_at: None,
            created_at: project.created_at(),
            updated_at: project.updated_at(),
        };
        self.project_repo.save(&record).await?;

        tracing::info!(
            project_id = %record.id,
            owner_id = %record.owner_id,
            "Project created"
        );

        Ok(CreateProjectResponse {
            project_id: record.id,
            title: record.title,
        })
    }
}

/// UpdateSettings Handler - owner 专属
pub struct UpdateSettingsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl UpdateSettingsHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, cmd: UpdateSettingsCommand) -> Result<(), ApplicationError> {
        let mut record = require_owner(&self.project_repo, cmd.project_id, &cmd.user_id).await?;

        record.settings_json = settings_to_json(&cmd.settings)?;
        record.updated_at = chrono::Utc::now();
        self.project_repo.save(&record).await?;

        tracing::info!(project_id = %cmd.project_id, "Project settings updated");
        Ok(())
    }
}

/// DeleteProject Handler - owner 专属
pub struct DeleteProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl DeleteProjectHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, cmd: DeleteProjectCommand) -> Result<(), ApplicationError> {
        require_owner(&self.project_repo, cmd.project_id, &cmd.user_id).await?;
        self.project_repo.delete(cmd.project_id).await?;

        tracing::info!(project_id = %cmd.project_id, "Project deleted");
        Ok(())
    }
}

/// AddCollaborator Handler - owner 专属
pub struct AddCollaboratorHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl AddCollaboratorHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, cmd: AddCollaboratorCommand) -> Result<(), ApplicationError> {
        let record = require_owner(&self.project_repo, cmd.project_id, &cmd.user_id).await?;

        // owner 自身不允许加入协作者列表
        if cmd.collaborator_id == record.owner_id {
            return Err(ApplicationError::invalid(
                "owner cannot be added as collaborator",
            ));
        }
        if cmd.collaborator_id.trim().is_empty() {
            return Err(ApplicationError::invalid("collaborator_id cannot be empty"));
        }

        self.project_repo
            .add_collaborator(cmd.project_id, &cmd.collaborator_id)
            .await?;

        tracing::info!(
            project_id = %cmd.project_id,
            collaborator_id = %cmd.collaborator_id,
            "Collaborator added"
        );
        Ok(())
    }
}

/// RemoveCollaborator Handler - owner 专属
pub struct RemoveCollaboratorHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl RemoveCollaboratorHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, cmd: RemoveCollaboratorCommand) -> Result<(), ApplicationError> {
        require_owner(&self.project_repo, cmd.project_id, &cmd.user_id).await?;
        self.project_repo
            .remove_collaborator(cmd.project_id, &cmd.collaborator_id)
            .await?;

        tracing::info!(
            project_id = %cmd.project_id,
            collaborator_id = %cmd.collaborator_id,
            "Collaborator removed"
        );
        Ok(())
    }
}

/// UpdateBible Handler - 成员可写，CAS on version
pub struct UpdateBibleHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl UpdateBibleHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(
        &self,
        cmd: UpdateBibleCommand,
    ) -> Result<UpdateBibleResponse, ApplicationError> {
        require_member(&self.project_repo, cmd.project_id, &cmd.user_id).await?;

        if cmd.content.trim().is_empty() {
            return Err(ApplicationError::invalid("bible content cannot be empty"));
        }

        let version = self
            .project_repo
            .update_bible(
                cmd.project_id,
                &cmd.content,
                cmd.expected_version,
                cmd.ai_expanded,
            )
            .await?;

        tracing::info!(
            project_id = %cmd.project_id,
            bible_version = version,
            ai_expanded = cmd.ai_expanded,
            "Book bible updated"
        );

        Ok(UpdateBibleResponse {
            project_id: cmd.project_id,
            version,
        })
    }
}

/// 辅助: 解析 settings JSON（查询侧共用）
pub fn parse_settings(
    settings_json: &str,
) -> Result<crate::domain::project::ProjectSettings, ApplicationError> {
    serde_json::from_str(settings_json).map_err(|e| ApplicationError::internal(e.to_string()))
}
