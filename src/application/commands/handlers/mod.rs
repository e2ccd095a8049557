//! Command Handlers 实现
//!
//! 所有 CommandHandler 的具体实现

mod chapter_handlers;
mod job_command_handlers;
mod note_handlers;
mod project_handlers;

pub use chapter_handlers::*;
pub use job_command_handlers::*;
pub use note_handlers::*;
pub use project_handlers::*;
