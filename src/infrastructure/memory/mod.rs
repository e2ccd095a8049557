//! 内存实现

mod job_control;

pub use job_control::InMemoryJobControl;
