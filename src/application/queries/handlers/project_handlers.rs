//! Project Query Handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::access::require_member;
use crate::application::commands::handlers::parse_settings;
use crate::application::error::ApplicationError;
use crate::application::ports::{ProjectRecord, ProjectRepositoryPort};
use crate::application::queries::{GetBibleQuery, GetProjectQuery, ListProjectsQuery};
use crate::domain::project::ProjectSettings;

// ============================================================================
// Response DTOs
// ============================================================================

/// 项目详情响应
#[derive(Debug, Clone, Serialize)]
pub struct ProjectResponse {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub settings: ProjectSettings,
    pub collaborators: Vec<String>,
    pub bible_version: u32,
    pub has_bible: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// 项目列表条目
#[derive(Debug, Clone, Serialize)]
pub struct ProjectSummary {
    pub id: Uuid,
    pub owner_id: String,
    pub title: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ProjectRecord> for ProjectSummary {
    fn from(record: ProjectRecord) -> Self {
        Self {
            id: record.id,
            owner_id: record.owner_id,
            title: record.title,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// 书籍圣经响应
#[derive(Debug, Clone, Serialize)]
pub struct BibleResponse {
    pub project_id: Uuid,
    pub content: String,
    pub version: u32,
    pub ai_expanded: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

// ============================================================================
// Handlers
// ============================================================================

/// GetProject Handler
pub struct GetProjectHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl GetProjectHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, query: GetProjectQuery) -> Result<ProjectResponse, ApplicationError> {
        let project =
            require_member(&self.project_repo, query.project_id, &query.user_id).await?;
        let collaborators = self.project_repo.collaborators(query.project_id).await?;

        Ok(ProjectResponse {
            id: project.id,
            owner_id: project.owner_id,
            title: project.title,
            settings: parse_settings(&project.settings_json)?,
            collaborators,
            bible_version: project.bible_version,
            has_bible: project.bible_content.is_some(),
            created_at: project.created_at,
            updated_at: project.updated_at,
        })
    }
}

/// ListProjects Handler
pub struct ListProjectsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl ListProjectsHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(
        &self,
        query: ListProjectsQuery,
    ) -> Result<Vec<ProjectSummary>, ApplicationError> {
        let projects = self.project_repo.find_by_member(&query.user_id).await?;
        Ok(projects.into_iter().map(ProjectSummary::from).collect())
    }
}

/// GetBible Handler
pub struct GetBibleHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
}

impl GetBibleHandler {
    pub fn new(project_repo: Arc<dyn ProjectRepositoryPort>) -> Self {
        Self { project_repo }
    }

    pub async fn handle(&self, query: GetBibleQuery) -> Result<BibleResponse, ApplicationError> {
        let project =
            require_member(&self.project_repo, query.project_id, &query.user_id).await?;

        let content = project
            .bible_content
            .ok_or_else(|| ApplicationError::not_found("Bible", query.project_id))?;

        Ok(BibleResponse {
            project_id: project.id,
            content,
            version: project.bible_version,
            ai_expanded: project.bible_ai_expanded,
            updated_at: project.bible_updated_at,
        })
    }
}
