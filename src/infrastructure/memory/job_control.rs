//! In-Memory Job Control Implementation
//!
//! 队列投递 + 运行期控制信号。任务状态的权威始终在数据库，
//! 这里只维护进程内的 worker 队列和 watch 通道

use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::application::ports::{JobControlError, JobControlPort, RunSignal};

/// 内存任务控制器
pub struct InMemoryJobControl {
    /// 任务队列发送端（worker 持有接收端）
    queue_sender: mpsc::Sender<Uuid>,
    /// job_id -> 控制信号发送端（仅运行中的编排循环）
    live_jobs: DashMap<Uuid, watch::Sender<RunSignal>>,
}

impl InMemoryJobControl {
    pub fn new(queue_sender: mpsc::Sender<Uuid>) -> Self {
        Self {
            queue_sender,
            live_jobs: DashMap::new(),
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }
}

impl JobControlPort for InMemoryJobControl {
    fn enqueue(&self, job_id: Uuid) -> Result<(), JobControlError> {
        self.queue_sender
            .try_send(job_id)
            .map_err(|e| JobControlError::QueueUnavailable(e.to_string()))?;

        tracing::debug!(job_id = %job_id, "Job enqueued");
        Ok(())
    }

    fn register(&self, job_id: Uuid) -> watch::Receiver<RunSignal> {
        let (tx, rx) = watch::channel(RunSignal::Run);
        self.live_jobs.insert(job_id, tx);
        rx
    }

    fn signal(&self, job_id: Uuid, signal: RunSignal) -> bool {
        match self.live_jobs.get(&job_id) {
            Some(tx) => tx.send(signal).is_ok(),
            None => false,
        }
    }

    fn unregister(&self, job_id: Uuid) {
        self.live_jobs.remove(&job_id);
    }

    fn is_live(&self, job_id: Uuid) -> bool {
        self.live_jobs.contains_key(&job_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_enqueue_delivers_to_receiver() {
        let (tx, mut rx) = mpsc::channel(8);
        let control = InMemoryJobControl::new(tx);
        let job_id = Uuid::new_v4();

        control.enqueue(job_id).unwrap();
        assert_eq!(rx.recv().await, Some(job_id));
    }

    #[tokio::test]
    async fn test_signal_reaches_registered_loop() {
        let (tx, _rx) = mpsc::channel(8);
        let control = InMemoryJobControl::new(tx);
        let job_id = Uuid::new_v4();

        let mut signal_rx = control.register(job_id);
        assert!(control.is_live(job_id));

        assert!(control.signal(job_id, RunSignal::Pause));
        signal_rx.changed().await.unwrap();
        assert_eq!(*signal_rx.borrow(), RunSignal::Pause);

        control.unregister(job_id);
        assert!(!control.is_live(job_id));
        assert!(!control.signal(job_id, RunSignal::Cancel));
    }

    #[tokio::test]
    async fn test_enqueue_fails_when_queue_full() {
        let (tx, _rx) = mpsc::channel(1);
        let control = InMemoryJobControl::new(tx);

        control.enqueue(Uuid::new_v4()).unwrap();
        let err = control.enqueue(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, JobControlError::QueueUnavailable(_)));
    }
}
