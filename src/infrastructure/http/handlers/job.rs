//! Auto-Complete Job HTTP Handlers

use axum::{
    extract::{Path, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::Identity;
use crate::application::{
    ControlAction, ControlJobCommand, GetJobStatusQuery, JobSnapshot, ListJobsQuery,
    StartAutoCompleteCommand,
};
use crate::infrastructure::http::dto::ApiResponse;
use crate::infrastructure::http::error::ApiError;
use crate::infrastructure::http::state::AppState;

// ============================================================================
// DTOs
// ============================================================================

fn default_quality_threshold() -> f64 {
    7.0
}

#[derive(Debug, Deserialize)]
pub struct StartAutoCompleteRequest {
    pub project_id: Uuid,
    pub target_chapters: u32,
    #[serde(default = "default_quality_threshold")]
    pub quality_threshold: f64,
}

#[derive(Debug, Serialize)]
pub struct StartAutoCompleteResponseDto {
    pub job_id: Uuid,
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct ControlJobRequest {
    pub action: ControlAction,
}

// ============================================================================
// Handlers
// ============================================================================

/// 启动自动续写任务
pub async fn start_auto_complete(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Json(req): Json<StartAutoCompleteRequest>,
) -> Result<Json<ApiResponse<StartAutoCompleteResponseDto>>, ApiError> {
    let response = state
        .start_auto_complete_handler
        .handle(StartAutoCompleteCommand {
            user_id: identity.user_id,
            project_id: req.project_id,
            target_chapters: req.target_chapters,
            quality_threshold: req.quality_threshold,
        })
        .await?;

    Ok(Json(ApiResponse::success(StartAutoCompleteResponseDto {
        job_id: response.job_id,
        status: response.status.as_str().to_string(),
    })))
}

/// 查询任务状态（含评分历史）
pub async fn get_job_status(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(job_id): Path<Uuid>,
) -> Result<Json<ApiResponse<JobSnapshot>>, ApiError> {
    let response = state
        .get_job_status_handler
        .handle(GetJobStatusQuery {
            user_id: identity.user_id,
            job_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 任务控制：pause / resume / cancel
pub async fn control_job(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
    Path(job_id): Path<Uuid>,
    Json(req): Json<ControlJobRequest>,
) -> Result<Json<ApiResponse<JobSnapshot>>, ApiError> {
    let response = state
        .control_job_handler
        .handle(ControlJobCommand {
            user_id: identity.user_id,
            job_id,
            action: req.action,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}

/// 列出调用者的任务
pub async fn list_jobs(
    State(state): State<Arc<AppState>>,
    Extension(identity): Extension<Identity>,
) -> Result<Json<ApiResponse<Vec<JobSnapshot>>>, ApiError> {
    let response = state
        .list_jobs_handler
        .handle(ListJobsQuery {
            user_id: identity.user_id,
        })
        .await?;

    Ok(Json(ApiResponse::success(response)))
}
