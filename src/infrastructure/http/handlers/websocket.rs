//! WebSocket Handler
//!
//! 任务进度推送。尽力而为：慢速消费者被 broadcast 通道挤掉的事件
//! 不补发，客户端通过 status 接口拉取权威状态

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::IntoResponse,
    Extension,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use uuid::Uuid;

use crate::application::ports::{Identity, JobRepositoryPort};
use crate::infrastructure::http::state::AppState;

/// 任务进度 WebSocket 连接
pub async fn job_progress_handler(
    ws: WebSocketUpgrade,
    Path(job_id): Path<Uuid>,
    Extension(identity): Extension<Identity>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_job_socket(socket, job_id, identity, state))
}

async fn handle_job_socket(
    socket: WebSocket,
    job_id: Uuid,
    identity: Identity,
    state: Arc<AppState>,
) {
    let (mut sender, mut receiver) = socket.split();

    // 任务必须存在且属于调用者
    let authorized = match state.job_repo.find_by_id(job_id).await {
        Ok(Some(job)) => job.owner_id == identity.user_id,
        Ok(None) => false,
        Err(e) => {
            tracing::error!(job_id = %job_id, error = %e, "Failed to load job for WebSocket");
            false
        }
    };
    if !authorized {
        tracing::warn!(job_id = %job_id, user_id = %identity.user_id, "WebSocket connection rejected");
        let _ = sender.close().await;
        return;
    }

    let mut event_rx = state.event_publisher.register_job(job_id);

    tracing::info!(job_id = %job_id, "WebSocket connected");

    // 事件转发任务
    let mut forward_task = tokio::spawn(async move {
        loop {
            match event_rx.recv().await {
                Ok(event) => {
                    let msg = match serde_json::to_string(&event) {
                        Ok(json) => Message::Text(json),
                        Err(e) => {
                            tracing::error!(error = %e, "Failed to serialize event");
                            continue;
                        }
                    };
                    if let Err(e) = sender.send(msg).await {
                        tracing::debug!(job_id = %job_id, error = %e, "Failed to send WebSocket message");
                        break;
                    }
                }
                // 慢速消费者: 丢弃挤掉的事件，继续收新事件
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(job_id = %job_id, skipped, "WebSocket consumer lagged");
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    // 接收客户端消息（心跳/关闭）
    let mut receive_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => {
                    tracing::info!(job_id = %job_id, "WebSocket closed by client");
                    break;
                }
                Err(e) => {
                    tracing::debug!(job_id = %job_id, error = %e, "WebSocket error");
                    break;
                }
                // Ping 由 axum 自动回应
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut forward_task => {
            receive_task.abort();
        }
        _ = &mut receive_task => {
            // 转发任务持有事件接收端，先回收再取消注册，
            // 否则存活的接收端会让通道无法按引用计数清理
            forward_task.abort();
            let _ = forward_task.await;
        }
    }

    // 清理（仍有其他订阅者时通道保留）
    state.event_publisher.unregister_job(job_id);
    tracing::info!(job_id = %job_id, "WebSocket disconnected");
}
