//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Project Context: 写作项目管理（项目、章节、导演笔记）
//! - Job Context: 自动补全任务与状态机

pub mod job;
pub mod project;

// 共享的叙事上下文构建器
pub mod narrative;
