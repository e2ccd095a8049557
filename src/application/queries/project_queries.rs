//! Project Queries

use uuid::Uuid;

/// 获取项目详情（成员可读）
#[derive(Debug, Clone)]
pub struct GetProjectQuery {
    pub user_id: String,
    pub project_id: Uuid,
}

/// 列出调用者可见的项目
#[derive(Debug, Clone)]
pub struct ListProjectsQuery {
    pub user_id: String,
}

/// 获取书籍圣经（成员可读）
#[derive(Debug, Clone)]
pub struct GetBibleQuery {
    pub user_id: String,
    pub project_id: Uuid,
}
