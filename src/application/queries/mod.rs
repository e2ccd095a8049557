//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：处理所有读操作

mod chapter_queries;
mod job_queries;
mod note_queries;
mod project_queries;

pub mod handlers;

pub use chapter_queries::*;
pub use job_queries::*;
pub use note_queries::*;
pub use project_queries::*;
