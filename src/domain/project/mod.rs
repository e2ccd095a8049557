//! Project Context - 写作项目限界上下文
//!
//! 职责:
//! - 项目聚合管理（设置、圣经、协作者与权限）
//! - 章节实体与版本历史
//! - 导演笔记实体

mod aggregate;
mod entities;
mod errors;
mod value_objects;

pub use aggregate::Project;
pub use entities::{count_words, Chapter, DirectorsNote};
pub use errors::ProjectError;
pub use value_objects::{BookBible, ProjectId, ProjectSettings, ProjectTitle};
