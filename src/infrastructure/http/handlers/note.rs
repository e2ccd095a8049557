//! Director's Note HTTP Handlers

use axum::{extract::State, Extension, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::Identity;
use crate::application::{
    CreateNoteCommand, DeleteNoteCommand, ListNotesQuery, NoteResponse, ResolveNoteCommand,
    UpdateNoteCommand,
};
use crate::infrastructure::http::dto::{ApiResponse, Empty};
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub chapter_id: Uuid,
    pub content: String,
    #[serde(default)]
    pub position: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct CreateNoteResponseDto {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub id: Uuid,
    pub content: String,
    pub expected_version: u32,
}

#[derive(Debug, Deserialize)]
pub struct ResolveNoteRequest {
    pub id: Uuid,
    pub expected_version: u32,
}

#[derive(Debug, Serialize)]
pub struct NoteMutationResponseDto {
    pub id: Uuid,
    pub version: u32,
    pub resolved: bool,
}

#[derive(Debug, Deserialize)]
pub struct DeleteNoteRequest {
    pub id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct ListNotesRequest {
    pub chapter_id: Uuid,
}

// ============================================================================
// Handlers
// ============================================================================

/// 创建导演笔记
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<CreateNoteRequest>,
) -> Result<Json<ApiResponse<CreateNoteResponseDto>>, ApiError> {
    let response = state
        .create_note_handler
        .handle(CreateNoteCommand {
            user_id: identity.user_id,
            chapter_id: req.chapter_id,
            content: req.content,
            position: req.position,
        })
        .await?;

    Ok(Json(ApiResponse::success(CreateNoteResponseDto {
        id: response.note_id,
    })))
}

/// 编辑笔记（CAS 版本校验）
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<UpdateNoteRequest>,
) -> Result<Json<ApiResponse<NoteMutationResponseDto>>, ApiError> {
    let response = state
        .update_note_handler
        .handle(UpdateNoteCommand {
            user_id: identity.user_id,
            note_id: req.id,
            content: req.content,
            expected_version: req.expected_version,
        })
        .await?;

    Ok(Json(ApiResponse::success(NoteMutationResponseDto {
        id: response.note_id,
        version: response.version,
        resolved: response.resolved,
    })))
}

/// 标记笔记已处理
pub async fn resolve_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ResolveNoteRequest>,
) -> Result<Json<ApiResponse<NoteMutationResponseDto>>, ApiError> {
    let response = state
        .resolve_note_handler
        .handle(ResolveNoteCommand {
            user_id: identity.user_id,
            note_id: req.id,
            expected_version: req.expected_version,
        })
        .await?;

    Ok(Json(ApiResponse::success(NoteMutationResponseDto {
        id: response.note_id,
        version: response.version,
        resolved: response.resolved,
    })))
}

/// 删除笔记
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<DeleteNoteRequest>,
) -> Result<Json<ApiResponse<Empty>>, ApiError> {
    state
        .delete_note_handler
        .handle(DeleteNoteCommand {
            user_id: identity.user_id,
            note_id: req.id,
        })
        .await?;

    Ok(Json(ApiResponse::ok()))
}

/// 列出章节下的笔记
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<ListNotesRequest>,
) -> Result<Json<ApiResponse<Vec<NoteResponse>>>, ApiError> {
    let response = state
        .list_notes_handler
        .handle(ListNotesQuery {
            user_id: identity.user_id,
            chapter_id: req.chapter_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}
