//! Project HTTP Handlers

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::{
    AddCollaboratorCommand, BibleResponse, CreateProjectCommand, DeleteProjectCommand,
    GetBibleQuery, GetProjectQuery, ListProjectsQuery, ProjectResponse, ProjectSummary,
    RemoveCollaboratorCommand, UpdateBibleCommand, UpdateSettingsCommand,
};
use crate::application::ports::Identity;
use crate::domain::project::ProjectSettings;
use crate::infrastructure::http::dto::{ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub title: String,
    #[serde(default)]
    pub settings: Option<ProjectSettings>,
}

#[derive(Debug, Serialize)]
pub struct CreateProjectResponseDto {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct GetProjectRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub id: Uuid,
    pub settings: ProjectSettings,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProjectRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct CollaboratorRequest {
    pub id: Uuid,
    pub collaborator_id: String,
}

#[derive(Debug, Deserialize)]
pub struct GetBibleRequest {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateBibleRequest {
    pub project_id: Uuid,
    pub content: String,
    pub expected_version: u32,
    #[serde(default)]
    pub ai_expanded: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateBibleResponseDto {
    pub project_id: Uuid,
    pub version: u32,
}

// ============================================================================
// Handlers
// ============================================================================

/// 创建项目
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateProjectRequest>,
) -> Result<Json<ApiResponse<CreateProjectResponseDto>>, ApiError> {
    let response = state
        .create_project_handler
        .handle(CreateProjectCommand {
            user_id: identity.user_id,
            title: req.title,
            settings: req.settings,
        })
        .await?;

    Ok(Json(ApiResponse::success(CreateProjectResponseDto {
        id: response.project_id,
        title: response.title,
    })))
}

/// 获取项目详情
pub async fn get_project(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<GetProjectRequest>,
) -> Result<Json<ApiResponse<ProjectResponse>>, ApiError> {
    let response = state
        .get_project_handler
        .handle(GetProjectQuery {
            user_id: identity.user_id,
            project_id: req.id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 列出调用者可见的项目
pub async fn list_projects(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<Vec<ProjectSummary>>>, ApiError> {
    let response = state
        .list_projects_handler
        .handle(ListProjectsQuery {
            user_id: identity.user_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 更新项目设置
pub async fn update_settings(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateSettingsRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .update_settings_handler
        .handle(UpdateSettingsCommand {
            user_id: identity.user_id,
            project_id: req.id,
            settings: req.settings,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 删除项目
pub async fn delete_project(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<DeleteProjectRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_project_handler
        .handle(DeleteProjectCommand {
            user_id: identity.user_id,
            project_id: req.id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 添加协作者
pub async fn add_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CollaboratorRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .add_collaborator_handler
        .handle(AddCollaboratorCommand {
            user_id: identity.user_id,
            project_id: req.id,
            collaborator_id: req.collaborator_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 移除协作者
pub async fn remove_collaborator(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CollaboratorRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .remove_collaborator_handler
        .handle(RemoveCollaboratorCommand {
            user_id: identity.user_id,
            project_id: req.id,
            collaborator_id: req.collaborator_id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 获取书籍圣经
pub async fn get_bible(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<GetBibleRequest>,
) -> Result<Json<ApiResponse<BibleResponse>>, ApiError> {
    let response = state
        .get_bible_handler
        .handle(GetBibleQuery {
            user_id: identity.user_id,
            project_id: req.project_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 更新书籍圣经（乐观并发控制）
pub async fn update_bible(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateBibleRequest>,
) -> Result<Json<ApiResponse<UpdateBibleResponseDto>>, ApiError> {
    let response = state
        .update_bible_handler
        .handle(UpdateBibleCommand {
            user_id: identity.user_id,
            project_id: req.project_id,
            content: req.content,
            expected_version: req.expected_version,
            ai_expanded: req.ai_expanded,
        })
        .await?;

    Ok(Json(ApiResponse::success(UpdateBibleResponseDto {
        project_id: response.project_id,
        version: response.version,
    })))
}
