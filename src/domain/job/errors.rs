//! Job Context - Errors

use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("无效的启动参数: {0}")]
    InvalidParameters(String),
}
