//! Chapter HTTP Handlers

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::Identity;
use crate::application::{
    ChapterResponse, ChapterSummary, ChapterVersionResponse, CreateChapterCommand,
    DeleteChapterCommand, GetChapterQuery, GetChapterVersionsQuery, ListChaptersQuery,
    UpdateChapterCommand,
};
use crate::infrastructure::http::dto::{ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateChapterRequest {
    pub project_id: Uuid,
    pub title: String,
    pub content: String,
    /// 缺省时追加到末尾
    #[serde(default)]
    pub chapter_number: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateChapterResponseDto {
    pub id: Uuid,
    pub chapter_number: u32,
    pub word_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct GetChapterRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChapterRequest {
    pub id: Uuid,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct UpdateChapterResponseDto {
    pub id: Uuid,
    pub version: u32,
    pub word_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct DeleteChapterRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListChaptersRequest {
    pub project_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GetChapterVersionsRequest {
    pub id: Uuid,
}

// ============================================================================
// Handlers
// ============================================================================

/// 手写新章节
pub async fn create_chapter(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateChapterRequest>,
) -> Result<Json<ApiResponse<CreateChapterResponseDto>>, ApiError> {
    let response = state
        .create_chapter_handler
        .handle(CreateChapterCommand {
            user_id: identity.user_id,
            project_id: req.project_id,
            title: req.title,
            content: req.content,
            chapter_number: req.chapter_number,
        })
        .await?;

    Ok(Json(ApiResponse::success(CreateChapterResponseDto {
        id: response.chapter_id,
        chapter_number: response.chapter_number,
        word_count: response.word_count,
    })))
}

/// 获取章节详情（含正文）
pub async fn get_chapter(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<GetChapterRequest>,
) -> Result<Json<ApiResponse<ChapterResponse>>, ApiError> {
    let response = state
        .get_chapter_handler
        .handle(GetChapterQuery {
            user_id: identity.user_id,
            chapter_id: req.id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 编辑章节（旧内容进版本历史）
pub async fn update_chapter(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateChapterRequest>,
) -> Result<Json<ApiResponse<UpdateChapterResponseDto>>, ApiError> {
    let response = state
        .update_chapter_handler
        .handle(UpdateChapterCommand {
            user_id: identity.user_id,
            chapter_id: req.id,
            title: req.title,
            content: req.content,
        })
        .await?;

    Ok(Json(ApiResponse::success(UpdateChapterResponseDto {
        id: response.chapter_id,
        version: response.version,
        word_count: response.word_count,
    })))
}

/// 删除章节
pub async fn delete_chapter(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<DeleteChapterRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_chapter_handler
        .handle(DeleteChapterCommand {
            user_id: identity.user_id,
            chapter_id: req.id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 按序号列出项目章节（不含正文）
pub async fn list_chapters(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ListChaptersRequest>,
) -> Result<Json<ApiResponse<Vec<ChapterSummary>>>, ApiError> {
    let response = state
        .list_chapters_handler
        .handle(ListChaptersQuery {
            user_id: identity.user_id,
            project_id: req.project_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 章节版本历史
pub async fn get_chapter_versions(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<GetChapterVersionsRequest>,
) -> Result<Json<ApiResponse<Vec<ChapterVersionResponse>>>, ApiError> {
    let response = state
        .get_chapter_versions_handler
        .handle(GetChapterVersionsQuery {
            user_id: identity.user_id,
            chapter_id: req.id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}
