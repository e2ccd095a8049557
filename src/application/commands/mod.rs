//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：处理所有写操作

mod chapter_commands;
mod job_commands;
mod note_commands;
mod project_commands;

pub mod handlers;

pub use chapter_commands::*;
pub use job_commands::*;
pub use note_commands::*;
pub use project_commands::*;
