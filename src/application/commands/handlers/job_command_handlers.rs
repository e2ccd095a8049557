//! Auto-Complete Job Command Handlers

use std::sync::Arc;

use crate::application::access::require_member;
use crate::application::commands::job_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    JobControlPort, JobRecord, JobRepositoryPort, ProjectRepositoryPort, RunSignal,
};
use crate::application::queries::JobSnapshot;
use crate::domain::job::{Job, JobStatus};
use crate::domain::project::ProjectId;
use crate::infrastructure::events::EventPublisher;

/// Job 聚合 → 持久化记录
fn job_to_record(job: &Job) -> JobRecord {
    JobRecord {
        id: *job.id().as_uuid(),
        project_id: *job.project_id().as_uuid(),
        owner_id: job.owner_id().to_string(),
        status: job.status(),
        current_chapter: job.current_chapter(),
        target_chapters: job.target_chapters(),
        quality_threshold: job.quality_threshold().value(),
        total_words: job.total_words(),
        error_message: job.error_message().map(String::from),
        created_at: job.created_at(),
        updated_at: job.updated_at(),
        completed_at: job.completed_at(),
    }
}

/// StartAutoComplete Handler - 创建任务并投递给 worker
pub struct StartAutoCompleteHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    job_repo: Arc<dyn JobRepositoryPort>,
    job_control: Arc<dyn JobControlPort>,
}

impl StartAutoCompleteHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        job_repo: Arc<dyn JobRepositoryPort>,
        job_control: Arc<dyn JobControlPort>,
    ) -> Self {
        Self {
            project_repo,
            job_repo,
            job_control,
        }
    }

    pub async fn handle(
        &self,
        cmd: StartAutoCompleteCommand,
    ) -> Result<StartAutoCompleteResponse, ApplicationError> {
        require_member(&self.project_repo, cmd.project_id, &cmd.user_id).await?;

        // 同一项目同时只允许一个活跃任务，保证章节严格顺序生成
        if let Some(active) = self.job_repo.find_active_by_project(cmd.project_id).await? {
            return Err(ApplicationError::invalid(format!(
                "project already has an active job: {} ({})",
                active.id, active.status
            )));
        }

        // 参数校验在聚合构造中完成
        let job = Job::new(
            ProjectId::from_uuid(cmd.project_id),
            cmd.user_id.clone(),
            cmd.target_chapters,
            cmd.quality_threshold,
        )?;

        let record = job_to_record(&job);
        self.job_repo.insert(&record).await?;

        self.job_control
            .enqueue(record.id)
            .map_err(|e| ApplicationError::internal(e.to_string()))?;

        tracing::info!(
            job_id = %record.id,
            project_id = %cmd.project_id,
            target_chapters = cmd.target_chapters,
            quality_threshold = cmd.quality_threshold,
            "Auto-complete job started"
        );

        Ok(StartAutoCompleteResponse {
            job_id: record.id,
            status: record.status,
        })
    }
}

/// ControlJob Handler - pause/resume/cancel
///
/// 状态字段是并发控制的唯一权威：迁移通过 CAS 落库，
/// 竞争失败（如两个并发 cancel）返回 InvalidTransition 而不是破坏状态
pub struct ControlJobHandler {
    job_repo: Arc<dyn JobRepositoryPort>,
    job_control: Arc<dyn JobControlPort>,
    event_publisher: Arc<EventPublisher>,
}

impl ControlJobHandler {
    pub fn new(
        job_repo: Arc<dyn JobRepositoryPort>,
        job_control: Arc<dyn JobControlPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            job_repo,
            job_control,
            event_publisher,
        }
    }

    pub async fn handle(&self, cmd: ControlJobCommand) -> Result<JobSnapshot, ApplicationError> {
        let job = self
            .job_repo
            .find_by_id(cmd.job_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Job", cmd.job_id))?;

        if job.owner_id != cmd.user_id {
            return Err(ApplicationError::forbidden(format!(
                "user {} is not the owner of job {}",
                cmd.user_id, cmd.job_id
            )));
        }

        let (next, signal) = match cmd.action {
            ControlAction::Pause => (JobStatus::Paused, RunSignal::Pause),
            ControlAction::Resume => (JobStatus::Running, RunSignal::Run),
            ControlAction::Cancel => (JobStatus::Cancelled, RunSignal::Cancel),
        };

        if !job.status.can_transition_to(next) {
            return Err(ApplicationError::InvalidTransition {
                from: job.status,
                to: next,
            });
        }

        let applied = self
            .job_repo
            .update_status_cas(cmd.job_id, job.status, next, None)
            .await?;
        if !applied {
            // 与其他控制命令或编排循环竞争失败
            return Err(ApplicationError::InvalidTransition {
                from: job.status,
                to: next,
            });
        }

        // 通知正在运行的编排循环；resume 时循环可能已随进程重启消失，需重新投递
        let delivered = self.job_control.signal(cmd.job_id, signal);
        if cmd.action == ControlAction::Resume && !delivered {
            self.job_control
                .enqueue(cmd.job_id)
                .map_err(|e| ApplicationError::internal(e.to_string()))?;
        }

        let updated = self
            .job_repo
            .find_by_id(cmd.job_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Job", cmd.job_id))?;
        let snapshot = JobSnapshot::from_record(&updated, &[]);
        self.event_publisher.publish_job_status(&snapshot);

        tracing::info!(
            job_id = %cmd.job_id,
            action = cmd.action.as_str(),
            status = %updated.status,
            "Job control applied"
        );

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    use crate::application::ports::ProjectRecord;
    use crate::infrastructure::memory::InMemoryJobControl;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteJobRepository, SqliteProjectRepository,
    };

    struct Fixture {
        start: StartAutoCompleteHandler,
        control: ControlJobHandler,
        job_repo: Arc<SqliteJobRepository>,
        project_id: Uuid,
        // 保持队列接收端存活，避免 enqueue 因通道关闭而失败
        _queue_rx: mpsc::Receiver<Uuid>,
    }

    async fn fixture() -> Fixture {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let job_repo = Arc::new(SqliteJobRepository::new(pool.clone()));

        let now = Utc::now();
        let project_id = Uuid::new_v4();
        project_repo
            .save(&ProjectRecord {
                id: project_id,
                owner_id: "alice".to_string(),
                title: "雾港".to_string(),
                settings_json: "{}".to_string(),
                bible_content: None,
                bible_version: 0,
                bible_ai_expanded: false,
                bible_updated_at: None,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let (queue_tx, queue_rx) = mpsc::channel(16);
        let job_control = InMemoryJobControl::new(queue_tx).arc();

        Fixture {
            start: StartAutoCompleteHandler::new(
                project_repo.clone(),
                job_repo.clone(),
                job_control.clone(),
            ),
            control: ControlJobHandler::new(
                job_repo.clone(),
                job_control,
                EventPublisher::new().arc(),
            ),
            job_repo,
            project_id,
            _queue_rx: queue_rx,
        }
    }

    fn start_cmd(project_id: Uuid, user_id: &str) -> StartAutoCompleteCommand {
        StartAutoCompleteCommand {
            user_id: user_id.to_string(),
            project_id,
            target_chapters: 3,
            quality_threshold: 8.0,
        }
    }

    #[tokio::test]
    async fn test_start_creates_pending_job() {
        let fx = fixture().await;

        let response = fx.start.handle(start_cmd(fx.project_id, "alice")).await.unwrap();
        assert_eq!(response.status, JobStatus::Pending);

        let stored = fx
            .job_repo
            .find_by_id(response.job_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, JobStatus::Pending);
        assert_eq!(stored.target_chapters, 3);
        assert_eq!(stored.current_chapter, 0);
    }

    #[tokio::test]
    async fn test_start_forbidden_for_non_member() {
        let fx = fixture().await;

        let err = fx
            .start
            .handle(start_cmd(fx.project_id, "mallory"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_start_rejects_invalid_parameters() {
        let fx = fixture().await;

        let mut cmd = start_cmd(fx.project_id, "alice");
        cmd.target_chapters = 0;
        let err = fx.start.handle(cmd).await.unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidParameters(_)));

        let mut cmd = start_cmd(fx.project_id, "alice");
        cmd.quality_threshold = 11.0;
        let err = fx.start.handle(cmd).await.unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_start_rejects_second_active_job() {
        let fx = fixture().await;

        fx.start.handle(start_cmd(fx.project_id, "alice")).await.unwrap();
        let err = fx
            .start
            .handle(start_cmd(fx.project_id, "alice"))
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidParameters(_)));
    }

    #[tokio::test]
    async fn test_control_pause_on_pending_is_invalid_transition() {
        let fx = fixture().await;
        let started = fx.start.handle(start_cmd(fx.project_id, "alice")).await.unwrap();

        let err = fx
            .control
            .handle(ControlJobCommand {
                user_id: "alice".to_string(),
                job_id: started.job_id,
                action: ControlAction::Pause,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));
    }

    #[tokio::test]
    async fn test_control_forbidden_for_non_owner() {
        let fx = fixture().await;
        let started = fx.start.handle(start_cmd(fx.project_id, "alice")).await.unwrap();

        let err = fx
            .control
            .handle(ControlJobCommand {
                user_id: "mallory".to_string(),
                job_id: started.job_id,
                action: ControlAction::Cancel,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_cancel_pending_job() {
        let fx = fixture().await;
        let started = fx.start.handle(start_cmd(fx.project_id, "alice")).await.unwrap();

        let snapshot = fx
            .control
            .handle(ControlJobCommand {
                user_id: "alice".to_string(),
                job_id: started.job_id,
                action: ControlAction::Cancel,
            })
            .await
            .unwrap();
        assert_eq!(snapshot.status, JobStatus::Cancelled);
        assert!(snapshot.completed_at.is_some());

        // 终态后任何控制命令都是非法迁移
        let err = fx
            .control
            .handle(ControlJobCommand {
                user_id: "alice".to_string(),
                job_id: started.job_id,
                action: ControlAction::Resume,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidTransition { .. }));
    }
}
