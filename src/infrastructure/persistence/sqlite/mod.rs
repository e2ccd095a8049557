//! SQLite Persistence - SQLite 数据库持久化实现

mod chapter_repo;
mod database;
mod job_repo;
mod note_repo;
mod project_repo;

pub use chapter_repo::*;
pub use database::*;
pub use job_repo::*;
pub use note_repo::*;
pub use project_repo::*;
