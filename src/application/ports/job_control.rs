//! Job Control Port - 任务队列与运行期控制
//!
//! 任务状态的权威在数据库（CAS 迁移），本端口只负责两件事:
//! 1. 把待执行任务投递给 worker 队列
//! 2. 向正在运行的编排循环传递期望运行状态（pause/resume/cancel），
//!    避免循环轮询数据库
//!
//! 具体实现在 infrastructure/memory 层

use thiserror::Error;
use tokio::sync::watch;
use uuid::Uuid;

/// Job Control 错误
#[derive(Debug, Error)]
pub enum JobControlError {
    #[error("Job queue is full or closed: {0}")]
    QueueUnavailable(String),

    #[error("Job is not live: {0}")]
    NotLive(Uuid),
}

/// 期望运行状态（通过 watch 通道传递给编排循环）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunSignal {
    /// 正常推进
    Run,
    /// 在章节边界挂起
    Pause,
    /// 停止，不再调度后续尝试
    Cancel,
}

/// Job Control Port
pub trait JobControlPort: Send + Sync {
    /// 投递任务到 worker 队列
    fn enqueue(&self, job_id: Uuid) -> Result<(), JobControlError>;

    /// 注册运行中任务，返回控制信号接收端（worker 调用）
    fn register(&self, job_id: Uuid) -> watch::Receiver<RunSignal>;

    /// 向运行中任务发送控制信号，任务不在运行则返回 false
    fn signal(&self, job_id: Uuid, signal: RunSignal) -> bool;

    /// 注销运行中任务（worker 循环退出时调用）
    fn unregister(&self, job_id: Uuid);

    /// 任务的编排循环是否存活
    fn is_live(&self, job_id: Uuid) -> bool;
}
