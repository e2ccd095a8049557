//! HTTP Routes
//!
//! API Endpoints:
//! - /api/ping                                GET   健康检查（免认证）
//! - /api/project/create                      POST  创建项目
//! - /api/project/get                         POST  项目详情
//! - /api/project/list                        GET   列出可见项目
//! - /api/project/update_settings             POST  更新设置
//! - /api/project/delete                      POST  删除项目
//! - /api/project/add_collaborator            POST  添加协作者
//! - /api/project/remove_collaborator         POST  移除协作者
//! - /api/project/bible/get                   POST  获取书籍圣经
//! - /api/project/bible/update                POST  更新书籍圣经（CAS）
//! - /api/chapter/create                      POST  手写新章节
//! - /api/chapter/get                         POST  章节详情
//! - /api/chapter/update                      POST  编辑章节
//! - /api/chapter/delete                      POST  删除章节
//! - /api/chapter/list                        POST  项目章节列表
//! - /api/chapter/versions                    POST  章节版本历史
//! - /api/note/create                         POST  创建导演笔记
//! - /api/note/update                         POST  编辑笔记（CAS）
//! - /api/note/resolve                        POST  标记已处理（CAS）
//! - /api/note/delete                         POST  删除笔记
//! - /api/note/list                           POST  章节笔记列表
//! - /api/auto-complete/start                 POST  启动自动续写任务
//! - /api/auto-complete/:job_id/status        GET   任务状态（含评分历史）
//! - /api/auto-complete/:job_id/control       POST  pause / resume / cancel
//! - /api/auto-complete/:job_id/progress      WS    任务进度推送
//! - /api/auto-complete/list                  GET   调用者任务列表

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

/// 创建所有路由
pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new().nest("/api", api_routes())
}

/// API 路由
fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/ping", get(handlers::ping))
        .nest("/project", project_routes())
        .nest("/chapter", chapter_routes())
        .nest("/note", note_routes())
        .nest("/auto-complete", job_routes())
}

/// Project 路由
fn project_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_project))
        .route("/get", post(handlers::get_project))
        .route("/list", get(handlers::list_projects))
        .route("/update_settings", post(handlers::update_settings))
        .route("/delete", post(handlers::delete_project))
        .route("/add_collaborator", post(handlers::add_collaborator))
        .route("/remove_collaborator", post(handlers::remove_collaborator))
        .route("/bible/get", post(handlers::get_bible))
        .route("/bible/update", post(handlers::update_bible))
}

/// Chapter 路由
fn chapter_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_chapter))
        .route("/get", post(handlers::get_chapter))
        .route("/update", post(handlers::update_chapter))
        .route("/delete", post(handlers::delete_chapter))
        .route("/list", post(handlers::list_chapters))
        .route("/versions", post(handlers::get_chapter_versions))
}

/// Note 路由
fn note_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/create", post(handlers::create_note))
        .route("/update", post(handlers::update_note))
        .route("/resolve", post(handlers::resolve_note))
        .route("/delete", post(handlers::delete_note))
        .route("/list", post(handlers::list_notes))
}

/// Auto-Complete 任务路由
fn job_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/start", post(handlers::start_auto_complete))
        .route("/list", get(handlers::list_jobs))
        .route("/:job_id/status", get(handlers::get_job_status))
        .route("/:job_id/control", post(handlers::control_job))
        .route("/:job_id/progress", get(handlers::job_progress_handler))
}
