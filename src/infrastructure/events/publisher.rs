//! Event Publisher Implementation
//!
//! WebSocket 进度推送实现
//!
//! 推送是尽力而为的有损通道：channel 满时旧事件被挤掉，
//! 客户端以 status 端点的快照为权威补偿

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::application::queries::JobSnapshot;

/// WebSocket 事件类型
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum WsEvent {
    /// 任务状态变更（缩减快照，scores 为空）
    JobStatusChanged { job: JobSnapshot },
    /// 一章被接受提交
    ChapterCommitted {
        job_id: Uuid,
        chapter_number: u32,
        title: String,
        word_count: u64,
        total_words: u64,
    },
    /// 一次评分完成（接受或拒绝）
    ChapterScored {
        job_id: Uuid,
        chapter_number: u32,
        attempt: u32,
        score: f64,
        accepted: bool,
    },
}

impl WsEvent {
    fn job_id(&self) -> Uuid {
        match self {
            WsEvent::JobStatusChanged { job } => job.job_id,
            WsEvent::ChapterCommitted { job_id, .. } => *job_id,
            WsEvent::ChapterScored { job_id, .. } => *job_id,
        }
    }
}

/// 事件发布器
pub struct EventPublisher {
    /// job_id -> broadcast sender（任务专属进度流）
    job_channels: DashMap<Uuid, broadcast::Sender<WsEvent>>,
    /// 全局广播（运维观察用）
    global_channel: broadcast::Sender<WsEvent>,
}

impl EventPublisher {
    pub fn new() -> Self {
        let (global_tx, _) = broadcast::channel(100);
        Self {
            job_channels: DashMap::new(),
            global_channel: global_tx,
        }
    }

    pub fn arc(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// 订阅全局事件
    pub fn subscribe_global(&self) -> broadcast::Receiver<WsEvent> {
        self.global_channel.subscribe()
    }

    /// 注册任务的进度通道（已存在时直接订阅）
    ///
    /// entry 持锁期间完成订阅，并发注册不会丢失接收端
    pub fn register_job(&self, job_id: Uuid) -> broadcast::Receiver<WsEvent> {
        self.job_channels
            .entry(job_id)
            .or_insert_with(|| broadcast::channel(100).0)
            .subscribe()
    }

    /// 取消注册任务通道
    ///
    /// 仅在最后一个订阅者断开后移除通道，其余订阅者的进度流不受影响
    pub fn unregister_job(&self, job_id: Uuid) {
        self.job_channels
            .remove_if(&job_id, |_, tx| tx.receiver_count() == 0);
    }

    /// 发布任务状态变更事件
    pub fn publish_job_status(&self, snapshot: &JobSnapshot) {
        let mut job = snapshot.clone();
        job.scores = Vec::new();
        self.publish(WsEvent::JobStatusChanged { job });
    }

    /// 发布章节提交事件
    pub fn publish_chapter_committed(
        &self,
        job_id: Uuid,
        chapter_number: u32,
        title: &str,
        word_count: u64,
        total_words: u64,
    ) {
        self.publish(WsEvent::ChapterCommitted {
            job_id,
            chapter_number,
            title: title.to_string(),
            word_count,
            total_words,
        });
    }

    /// 发布评分事件
    pub fn publish_chapter_scored(
        &self,
        job_id: Uuid,
        chapter_number: u32,
        attempt: u32,
        score: f64,
        accepted: bool,
    ) {
        self.publish(WsEvent::ChapterScored {
            job_id,
            chapter_number,
            attempt,
            score,
            accepted,
        });
    }

    fn publish(&self, event: WsEvent) {
        let job_id = event.job_id();

        if let Some(sender) = self.job_channels.get(&job_id) {
            // send 失败说明没有接收者，推送丢弃
            let _ = sender.send(event.clone());
        }

        if let Err(e) = self.global_channel.send(event) {
            tracing::debug!(
                job_id = %job_id,
                error = %e,
                "Failed to publish event (no receivers)"
            );
        }
    }
}

impl Default for EventPublisher {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_job_channel_delivery() {
        let publisher = EventPublisher::new();
        let job_id = Uuid::new_v4();
        let mut rx = publisher.register_job(job_id);

        publisher.publish_chapter_committed(job_id, 1, "第一章", 1800, 1800);

        let event = rx.recv().await.unwrap();
        match event {
            WsEvent::ChapterCommitted {
                chapter_number,
                word_count,
                ..
            } => {
                assert_eq!(chapter_number, 1);
                assert_eq!(word_count, 1800);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_publish_without_subscribers_is_noop() {
        let publisher = EventPublisher::new();
        // 没有订阅者时发布不 panic，事件被丢弃
        publisher.publish_chapter_scored(Uuid::new_v4(), 1, 1, 7.5, false);
    }

    #[tokio::test]
    async fn test_second_subscriber_survives_first_disconnect() {
        let publisher = EventPublisher::new();
        let job_id = Uuid::new_v4();
        let rx_a = publisher.register_job(job_id);
        let mut rx_b = publisher.register_job(job_id);

        // 第一个客户端断开，另一个订阅者继续收到事件
        drop(rx_a);
        publisher.unregister_job(job_id);
        publisher.publish_chapter_scored(job_id, 2, 1, 9.0, true);

        match rx_b.try_recv() {
            Ok(WsEvent::ChapterScored { chapter_number, .. }) => assert_eq!(chapter_number, 2),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_channel_removed_after_last_subscriber() {
        let publisher = EventPublisher::new();
        let job_id = Uuid::new_v4();
        let rx = publisher.register_job(job_id);

        drop(rx);
        publisher.unregister_job(job_id);

        assert!(!publisher.job_channels.contains_key(&job_id));
    }
}
