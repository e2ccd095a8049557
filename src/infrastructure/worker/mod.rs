//! Worker - 后台任务处理

mod job_worker;

pub use job_worker::*;
