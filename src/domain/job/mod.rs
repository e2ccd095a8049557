//! Job Context - 自动补全任务限界上下文
//!
//! 职责:
//! - 任务聚合与封闭的状态机
//! - 质量阈值与评分记录

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::Job;
pub use errors::JobError;
pub use value_objects::{JobId, JobStatus, QualityThreshold, ScoreRecord};
