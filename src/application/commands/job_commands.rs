//! Auto-Complete Job Commands

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::job::JobStatus;

/// 启动自动补全任务（成员可写）
#[derive(Debug, Clone)]
pub struct StartAutoCompleteCommand {
    pub user_id: String,
    pub project_id: Uuid,
    pub target_chapters: u32,
    pub quality_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct StartAutoCompleteResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// 任务控制动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlAction {
    Pause,
    Resume,
    Cancel,
}

impl ControlAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            ControlAction::Pause => "pause",
            ControlAction::Resume => "resume",
            ControlAction::Cancel => "cancel",
        }
    }
}

/// 任务控制命令（仅任务 owner）
#[derive(Debug, Clone)]
pub struct ControlJobCommand {
    pub user_id: String,
    pub job_id: Uuid,
    pub action: ControlAction,
}
