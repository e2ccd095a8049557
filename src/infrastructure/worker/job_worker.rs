//! Job Worker - Background Chapter Generation Processor
//!
//! 从队列消费任务并驱动顺序章节生成循环:
//! 构建上下文 → 生成 → 评分 → 达标提交 / 未达标带反馈重试。
//! 状态权威在数据库，所有迁移走 CAS；控制信号（pause/resume/cancel）
//! 通过 watch 通道在章节与尝试边界生效

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::{mpsc, watch};
use uuid::Uuid;

use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, GenerationEnginePort, GenerationRequest,
    GenerationResponse, JobControlPort, JobRecord, JobRepositoryPort, JobScoreRecord,
    ProjectRepositoryPort, QualityAssessment, QualityScorerPort, RunSignal,
};
use crate::application::queries::JobSnapshot;
use crate::domain::job::{JobStatus, QualityThreshold};
use crate::domain::narrative::{
    detect_ending, ContextBuilder, NarrativeConfig, NarrativeContext, ProjectBrief,
};
use crate::domain::project::{count_words, ProjectSettings};
use crate::infrastructure::events::EventPublisher;

/// Worker 配置
#[derive(Debug, Clone)]
pub struct JobWorkerConfig {
    /// 最大并发任务数
    pub max_concurrent_jobs: usize,
    /// 单章质量重试上限（含首次尝试）
    pub max_quality_retries: u32,
    /// 外部服务瞬时故障重试上限
    pub max_service_retries: u32,
    /// 服务重试退避起始值（毫秒，指数翻倍）
    pub retry_backoff_ms: u64,
    /// 服务重试退避上限（毫秒）
    pub retry_backoff_cap_ms: u64,
    /// 叙事上下文配置
    pub narrative: NarrativeConfig,
}

impl Default for JobWorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_quality_retries: 3,
            max_service_retries: 3,
            retry_backoff_ms: 500,
            retry_backoff_cap_ms: 30_000,
            narrative: NarrativeConfig::default(),
        }
    }
}

/// 章节边界控制信号处理的结果
enum RunDecision {
    /// 继续推进
    Proceed,
    /// 循环退出（取消或控制端消失）
    Stop,
}

/// 任务 Worker
///
/// 后台任务处理器，从队列消费任务并执行章节生成编排
pub struct JobWorker {
    config: JobWorkerConfig,
    queue_receiver: mpsc::Receiver<Uuid>,
    runner: JobRunner,
}

/// 单任务编排器（worker 每任务克隆一份进 spawn）
#[derive(Clone)]
struct JobRunner {
    config: JobWorkerConfig,
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
    job_repo: Arc<dyn JobRepositoryPort>,
    generation_engine: Arc<dyn GenerationEnginePort>,
    quality_scorer: Arc<dyn QualityScorerPort>,
    job_control: Arc<dyn JobControlPort>,
    event_publisher: Arc<EventPublisher>,
}

impl JobWorker {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: JobWorkerConfig,
        queue_receiver: mpsc::Receiver<Uuid>,
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
        job_repo: Arc<dyn JobRepositoryPort>,
        generation_engine: Arc<dyn GenerationEnginePort>,
        quality_scorer: Arc<dyn QualityScorerPort>,
        job_control: Arc<dyn JobControlPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        let runner = JobRunner {
            config: config.clone(),
            project_repo,
            chapter_repo,
            job_repo,
            generation_engine,
            quality_scorer,
            job_control,
            event_publisher,
        };
        Self {
            config,
            queue_receiver,
            runner,
        }
    }

    /// 启动 Worker
    pub async fn run(mut self) {
        tracing::info!(
            max_concurrent = self.config.max_concurrent_jobs,
            "JobWorker started"
        );

        // 使用 semaphore 控制并发
        let semaphore = Arc::new(tokio::sync::Semaphore::new(self.config.max_concurrent_jobs));

        while let Some(job_id) = self.queue_receiver.recv().await {
            let permit = match semaphore.clone().acquire_owned().await {
                Ok(p) => p,
                Err(_) => {
                    tracing::error!("Failed to acquire semaphore permit");
                    continue;
                }
            };

            let runner = self.runner.clone();
            tokio::spawn(async move {
                let _permit = permit; // 持有 permit 直到任务结束
                runner.run_job(job_id).await;
            });
        }

        tracing::info!("JobWorker stopped");
    }
}

impl JobRunner {
    /// 处理单个任务
    async fn run_job(&self, job_id: Uuid) {
        let job = match self.job_repo.find_by_id(job_id).await {
            Ok(Some(job)) => job,
            Ok(None) => {
                tracing::warn!(job_id = %job_id, "Job not found, skipping");
                return;
            }
            Err(e) => {
                tracing::error!(job_id = %job_id, error = %e, "Failed to load job");
                return;
            }
        };

        match job.status {
            JobStatus::Pending => {
                // CAS 认领，竞争失败说明任务已被别处处理
                match self
                    .job_repo
                    .update_status_cas(job_id, JobStatus::Pending, JobStatus::Running, None)
                    .await
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(job_id = %job_id, "Job claimed elsewhere, skipping");
                        return;
                    }
                    Err(e) => {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to claim job");
                        return;
                    }
                }
            }
            // resume 或进程重启恢复，状态已是 running
            JobStatus::Running => {}
            status => {
                tracing::debug!(job_id = %job_id, status = %status, "Job not runnable, skipping");
                return;
            }
        }

        let mut signal_rx = self.job_control.register(job_id);
        self.publish_status(job_id).await;

        tracing::info!(
            job_id = %job_id,
            project_id = %job.project_id,
            target_chapters = job.target_chapters,
            "Job orchestration started"
        );

        self.drive(job, &mut signal_rx).await;
        self.job_control.unregister(job_id);
    }

    /// 主编排循环
    async fn drive(&self, job: JobRecord, signal_rx: &mut watch::Receiver<RunSignal>) {
        let job_id = job.id;

        let project = match self.project_repo.find_by_id(job.project_id).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.fail_job(job_id, "InvalidParameters: project no longer exists")
                    .await;
                return;
            }
            Err(e) => {
                self.fail_job(job_id, &format!("InternalError: {e}")).await;
                return;
            }
        };

        let settings: ProjectSettings =
            serde_json::from_str(&project.settings_json).unwrap_or_default();
        let brief = ProjectBrief {
            title: project.title.clone(),
            genre: settings.genre.clone(),
            style_guide: settings.style_guide.clone(),
            bible: project.bible_content.clone(),
            target_chapter_words: settings.target_chapter_words,
        };

        let threshold = match QualityThreshold::new(job.quality_threshold) {
            Ok(t) => t,
            Err(e) => {
                self.fail_job(job_id, &format!("InvalidParameters: {e}")).await;
                return;
            }
        };

        // 已有章节进入上下文（手写章节和恢复场景都走这里）
        let mut builder = ContextBuilder::new(self.config.narrative.clone());
        let existing = match self.chapter_repo.find_by_project(job.project_id).await {
            Ok(chapters) => chapters,
            Err(e) => {
                self.fail_job(job_id, &format!("InternalError: {e}")).await;
                return;
            }
        };
        for chapter in &existing {
            builder.record_chapter(chapter.chapter_number, &chapter.title, &chapter.content);
        }

        let mut current_chapter = job.current_chapter;
        let mut total_words = job.total_words;

        while current_chapter < job.target_chapters {
            // 章节边界：处理 pause/cancel
            match self.wait_for_run(job_id, signal_rx).await {
                RunDecision::Proceed => {}
                RunDecision::Stop => return,
            }

            let next_chapter = current_chapter + 1;
            match self
                .produce_chapter(&job, &brief, &builder, threshold, next_chapter, signal_rx)
                .await
            {
                ChapterOutcome::Accepted(response) => {
                    let word_count = count_words(&response.content);
                    let now = Utc::now();
                    let record = ChapterRecord {
                        id: Uuid::new_v4(),
                        project_id: job.project_id,
                        chapter_number: next_chapter,
                        title: response.title.clone(),
                        content: response.content.clone(),
                        word_count,
                        creator_id: job.owner_id.clone(),
                        version: 1,
                        created_at: now,
                        updated_at: now,
                    };
                    if let Err(e) = self.chapter_repo.save(&record).await {
                        self.fail_job(job_id, &format!("InternalError: {e}")).await;
                        return;
                    }

                    current_chapter = next_chapter;
                    total_words += word_count;
                    if let Err(e) = self
                        .job_repo
                        .update_progress(job_id, current_chapter, total_words)
                        .await
                    {
                        tracing::error!(job_id = %job_id, error = %e, "Failed to persist progress");
                    }

                    builder.record_chapter(next_chapter, &record.title, &record.content);
                    self.event_publisher.publish_chapter_committed(
                        job_id,
                        next_chapter,
                        &record.title,
                        word_count,
                        total_words,
                    );

                    tracing::info!(
                        job_id = %job_id,
                        chapter_number = next_chapter,
                        word_count,
                        "Chapter committed"
                    );

                    // 生成端完结信号或末尾标记: 叙事自然收束，提前完成
                    let ending = response.is_ending
                        || detect_ending(&record.content, &self.config.narrative.ending_markers);
                    if ending {
                        tracing::info!(
                            job_id = %job_id,
                            chapter_number = next_chapter,
                            "Ending signal detected, completing early"
                        );
                        self.complete_job(job_id).await;
                        return;
                    }
                }
                ChapterOutcome::Rejected => {
                    self.fail_job(
                        job_id,
                        &format!(
                            "QualityThresholdUnreachable: chapter {next_chapter} rejected after {} attempts",
                            self.config.max_quality_retries
                        ),
                    )
                    .await;
                    return;
                }
                ChapterOutcome::ServiceFailure(message) => {
                    self.fail_job(job_id, &message).await;
                    return;
                }
                ChapterOutcome::Cancelled => {
                    self.publish_status(job_id).await;
                    return;
                }
            }
        }

        self.complete_job(job_id).await;
    }

    /// 生成一章，带质量重试
    async fn produce_chapter(
        &self,
        job: &JobRecord,
        brief: &ProjectBrief,
        builder: &ContextBuilder,
        threshold: QualityThreshold,
        chapter_number: u32,
        signal_rx: &mut watch::Receiver<RunSignal>,
    ) -> ChapterOutcome {
        let mut feedback: Option<String> = None;

        for attempt in 1..=self.config.max_quality_retries {
            // 尝试边界: cancel 立即生效
            if *signal_rx.borrow() == RunSignal::Cancel {
                return ChapterOutcome::Cancelled;
            }

            let context = builder.build(brief, chapter_number, job.target_chapters, feedback.take());
            let prompt = context.render_prompt(brief);

            let response = match self
                .generate_with_retry(job.project_id, chapter_number, prompt, brief)
                .await
            {
                Ok(r) => r,
                Err(message) => return ChapterOutcome::ServiceFailure(message),
            };

            let assessment = match self.score_with_retry(&response.content, &context).await {
                Ok(a) => a,
                Err(message) => return ChapterOutcome::ServiceFailure(message),
            };

            if let Err(e) = self
                .job_repo
                .append_score(&JobScoreRecord {
                    job_id: job.id,
                    chapter_number,
                    attempt,
                    score: assessment.score,
                    feedback: assessment.feedback.clone(),
                    created_at: Utc::now(),
                })
                .await
            {
                tracing::error!(job_id = %job.id, error = %e, "Failed to persist score");
            }

            let accepted = threshold.accepts(assessment.score);
            self.event_publisher.publish_chapter_scored(
                job.id,
                chapter_number,
                attempt,
                assessment.score,
                accepted,
            );

            if accepted {
                return ChapterOutcome::Accepted(response);
            }

            tracing::info!(
                job_id = %job.id,
                chapter_number,
                attempt,
                score = assessment.score,
                threshold = threshold.value(),
                "Chapter rejected, retrying with feedback"
            );
            feedback = assessment.feedback;
        }

        ChapterOutcome::Rejected
    }

    /// 调用生成引擎，瞬时故障指数退避重试
    async fn generate_with_retry(
        &self,
        project_id: Uuid,
        chapter_number: u32,
        prompt: String,
        brief: &ProjectBrief,
    ) -> Result<GenerationResponse, String> {
        let mut backoff_ms = self.config.retry_backoff_ms;

        for retry in 0..=self.config.max_service_retries {
            let request = GenerationRequest {
                project_id,
                chapter_number,
                prompt: prompt.clone(),
                target_words: brief.target_chapter_words,
            };

            match self.generation_engine.generate(request).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && retry < self.config.max_service_retries => {
                    tracing::warn!(
                        chapter_number,
                        retry,
                        backoff_ms,
                        error = %e,
                        "Generation failed, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(self.config.retry_backoff_cap_ms);
                }
                Err(e) => return Err(format!("GenerationServiceError: {e}")),
            }
        }

        Err("GenerationServiceError: retries exhausted".to_string())
    }

    /// 调用评分服务，瞬时故障指数退避重试
    async fn score_with_retry(
        &self,
        chapter_text: &str,
        context: &NarrativeContext,
    ) -> Result<QualityAssessment, String> {
        let mut backoff_ms = self.config.retry_backoff_ms;

        for retry in 0..=self.config.max_service_retries {
            match self.quality_scorer.score(chapter_text, context).await {
                Ok(assessment) => return Ok(assessment),
                Err(e) if e.is_retryable() && retry < self.config.max_service_retries => {
                    tracing::warn!(
                        retry,
                        backoff_ms,
                        error = %e,
                        "Scoring failed, backing off"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(self.config.retry_backoff_cap_ms);
                }
                Err(e) => return Err(format!("ScoringServiceError: {e}")),
            }
        }

        Err("ScoringServiceError: retries exhausted".to_string())
    }

    /// 章节边界的控制处理：pause 挂起等待，cancel 退出
    ///
    /// 以数据库状态为权威。控制命令先 CAS 落库再发信号，信号可能在
    /// 循环注册通道之前到达而丢失，这里的重查保证丢失的 pause/cancel
    /// 最迟在下一个章节边界生效
    async fn wait_for_run(
        &self,
        job_id: Uuid,
        signal_rx: &mut watch::Receiver<RunSignal>,
    ) -> RunDecision {
        loop {
            signal_rx.mark_unchanged();
            let status = match self.job_repo.find_by_id(job_id).await {
                Ok(Some(job)) => job.status,
                Ok(None) => {
                    tracing::warn!(job_id = %job_id, "Job disappeared, stopping loop");
                    return RunDecision::Stop;
                }
                Err(e) => {
                    tracing::error!(job_id = %job_id, error = %e, "Failed to read job status");
                    return RunDecision::Stop;
                }
            };

            match status {
                JobStatus::Running => return RunDecision::Proceed,
                JobStatus::Cancelled => {
                    tracing::info!(job_id = %job_id, "Job cancelled");
                    self.publish_status(job_id).await;
                    return RunDecision::Stop;
                }
                JobStatus::Paused => {
                    tracing::info!(job_id = %job_id, "Job paused, parking loop");
                    if signal_rx.changed().await.is_err() {
                        // 控制端消失，循环退出；任务留在 paused 等重启恢复
                        return RunDecision::Stop;
                    }
                }
                status => {
                    tracing::warn!(job_id = %job_id, status = %status, "Job no longer runnable");
                    return RunDecision::Stop;
                }
            }
        }
    }

    async fn complete_job(&self, job_id: Uuid) {
        match self
            .job_repo
            .update_status_cas(job_id, JobStatus::Running, JobStatus::Completed, None)
            .await
        {
            Ok(true) => tracing::info!(job_id = %job_id, "Job completed"),
            // CAS 失败说明控制命令抢先迁移（如并发 cancel）
            Ok(false) => tracing::debug!(job_id = %job_id, "Completion superseded"),
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "Failed to complete job"),
        }
        self.publish_status(job_id).await;
    }

    async fn fail_job(&self, job_id: Uuid, reason: &str) {
        tracing::warn!(job_id = %job_id, reason, "Job failed");
        match self
            .job_repo
            .update_status_cas(job_id, JobStatus::Running, JobStatus::Failed, Some(reason))
            .await
        {
            Ok(_) => {}
            Err(e) => tracing::error!(job_id = %job_id, error = %e, "Failed to persist failure"),
        }
        self.publish_status(job_id).await;
    }

    async fn publish_status(&self, job_id: Uuid) {
        match self.job_repo.find_by_id(job_id).await {
            Ok(Some(record)) => {
                let snapshot = JobSnapshot::from_record(&record, &[]);
                self.event_publisher.publish_job_status(&snapshot);
            }
            Ok(None) => {}
            Err(e) => tracing::debug!(job_id = %job_id, error = %e, "Status publish skipped"),
        }
    }
}

/// 单章生成的结果
enum ChapterOutcome {
    Accepted(GenerationResponse),
    Rejected,
    ServiceFailure(String),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::ProjectRecord;
    use crate::infrastructure::adapters::{
        FakeGenerationClient, ScriptedGeneration, ScriptedScore, ScriptedScorer,
    };
    use crate::infrastructure::memory::InMemoryJobControl;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteChapterRepository, SqliteJobRepository,
        SqliteProjectRepository,
    };

    struct Harness {
        chapter_repo: Arc<SqliteChapterRepository>,
        job_repo: Arc<SqliteJobRepository>,
        job_control: Arc<InMemoryJobControl>,
        generation: Arc<FakeGenerationClient>,
        project_id: Uuid,
    }

    async fn start_worker(
        generation: FakeGenerationClient,
        scorer: ScriptedScorer,
        config: JobWorkerConfig,
    ) -> Harness {
        let generation = Arc::new(generation);
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let chapter_repo = Arc::new(SqliteChapterRepository::new(pool.clone()));
        let job_repo = Arc::new(SqliteJobRepository::new(pool.clone()));

        let now = Utc::now();
        let project_id = Uuid::new_v4();
        project_repo
            .save(&ProjectRecord {
                id: project_id,
                owner_id: "alice".to_string(),
                title: "长夜列车".to_string(),
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
        let job_control = Arc::new(InMemoryJobControl::new(queue_tx));

        let worker = JobWorker::new(
            config,
            queue_rx,
            project_repo.clone(),
            chapter_repo.clone(),
            job_repo.clone(),
            generation.clone(),
            Arc::new(scorer),
            job_control.clone(),
            EventPublisher::new().arc(),
        );
        tokio::spawn(worker.run());

        Harness {
            chapter_repo,
            job_repo,
            job_control,
            generation,
            project_id,
        }
    }

    fn pending_job(project_id: Uuid, target_chapters: u32, threshold: f64) -> JobRecord {
        let now = Utc::now();
        JobRecord {
            id: Uuid::new_v4(),
            project_id,
            owner_id: "alice".to_string(),
            status: JobStatus::Pending,
            current_chapter: 0,
            target_chapters,
            quality_threshold: threshold,
            total_words: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    fn fast_config() -> JobWorkerConfig {
        JobWorkerConfig {
            max_service_retries: 1,
            retry_backoff_ms: 1,
            retry_backoff_cap_ms: 2,
            ..Default::default()
        }
    }

    async fn wait_for_terminal(harness: &Harness, job_id: Uuid) -> JobRecord {
        for _ in 0..200 {
            let job = harness.job_repo.find_by_id(job_id).await.unwrap().unwrap();
            if job.status.is_terminal() {
                return job;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("job did not reach a terminal state");
    }

    #[tokio::test]
    async fn test_two_chapter_job_completes() {
        let generation = FakeGenerationClient::new(vec![
            ScriptedGeneration::chapter("第一章", "The detective Mara boarded the night train."),
            ScriptedGeneration::chapter("第二章", "Mara found the conductor dead at dawn."),
        ]);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 2, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.current_chapter, 2);
        assert!(finished.total_words > 0);
        assert!(finished.completed_at.is_some());

        let chapters = harness
            .chapter_repo
            .find_by_project(harness.project_id)
            .await
            .unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].chapter_number, 1);
        assert_eq!(chapters[1].chapter_number, 2);
    }

    #[tokio::test]
    async fn test_rejected_draft_retried_with_feedback_then_accepted() {
        let generation = FakeGenerationClient::new(vec![
            ScriptedGeneration::chapter("初稿", "A slow, meandering opening."),
            ScriptedGeneration::chapter("重写稿", "A sharp, gripping opening."),
        ]);
        let scorer = ScriptedScorer::new(vec![
            ScriptedScore::ScoreWithFeedback(5.0, "pacing too slow".to_string()),
            ScriptedScore::Score(9.1),
        ]);
        let harness = start_worker(generation, scorer, fast_config()).await;

        let job = pending_job(harness.project_id, 1, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);

        // 两次尝试都留下评分记录
        let scores = harness.job_repo.scores(job.id).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].attempt, 1);
        assert_eq!(scores[0].feedback.as_deref(), Some("pacing too slow"));
        assert_eq!(scores[1].attempt, 2);

        // 提交的是重写稿
        let chapters = harness
            .chapter_repo
            .find_by_project(harness.project_id)
            .await
            .unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].title, "重写稿");
    }

    #[tokio::test]
    async fn test_quality_retries_exhausted_fails_job() {
        let generation = FakeGenerationClient::new(vec![ScriptedGeneration::chapter(
            "平庸的一章",
            "Nothing much happens here.",
        )]);
        let config = JobWorkerConfig {
            max_quality_retries: 2,
            ..fast_config()
        };
        let harness = start_worker(generation, ScriptedScorer::constant(3.0), config).await;

        let job = pending_job(harness.project_id, 3, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Failed);
        assert!(finished
            .error_message
            .unwrap()
            .contains("QualityThresholdUnreachable"));

        // 拒稿不提交章节
        assert!(harness
            .chapter_repo
            .find_by_project(harness.project_id)
            .await
            .unwrap()
            .is_empty());
        assert_eq!(harness.job_repo.scores(job.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_generation_failure_exhausts_service_retries() {
        let generation = FakeGenerationClient::new(vec![ScriptedGeneration::Fail(
            "upstream unavailable".to_string(),
        )]);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 1, 5.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Failed);
        assert!(finished
            .error_message
            .unwrap()
            .contains("GenerationServiceError"));
    }

    #[tokio::test]
    async fn test_ending_signal_completes_before_target() {
        let generation = FakeGenerationClient::new(vec![ScriptedGeneration::ending(
            "终章",
            "They stepped off the train together. The End",
        )]);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 10, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.current_chapter, 1);
    }

    #[tokio::test]
    async fn test_cancelled_pending_job_is_skipped() {
        let generation = FakeGenerationClient::new(vec![ScriptedGeneration::chapter(
            "不该出现的章节",
            "Should never be written.",
        )]);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 1, 5.0);
        harness.job_repo.insert(&job).await.unwrap();
        // 入队前被取消（竞争窗口）
        harness
            .job_repo
            .update_status_cas(job.id, JobStatus::Pending, JobStatus::Cancelled, None)
            .await
            .unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        let found = harness.job_repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Cancelled);
        assert!(harness
            .chapter_repo
            .find_by_project(harness.project_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_cancel_mid_run_retains_committed_chapters() {
        let generation = FakeGenerationClient::new(vec![
            ScriptedGeneration::chapter("第一章", "Mara boarded the night train."),
            ScriptedGeneration::chapter("第二章", "Should never be written."),
            ScriptedGeneration::chapter("第三章", "Should never be written either."),
        ])
        .with_delay(50);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 3, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        // 等第一章生成开始，此时循环已越过第一个章节边界
        for _ in 0..200 {
            if harness.generation.calls() >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        assert!(harness.generation.calls() >= 1);

        // 取消: 先 CAS 落库，再向循环发信号
        assert!(harness
            .job_repo
            .update_status_cas(job.id, JobStatus::Running, JobStatus::Cancelled, None)
            .await
            .unwrap());
        assert!(harness.job_control.signal(job.id, RunSignal::Cancel));

        // 在飞的第一章完成并提交，循环在下一个章节边界停下
        for _ in 0..200 {
            let chapters = harness
                .chapter_repo
                .find_by_project(harness.project_id)
                .await
                .unwrap();
            if !chapters.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        tokio::time::sleep(Duration::from_millis(150)).await;

        let finished = harness.job_repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(finished.status, JobStatus::Cancelled);
        assert_eq!(finished.current_chapter, 1);

        // 已提交章节保留，后续章节不再生成
        let chapters = harness
            .chapter_repo
            .find_by_project(harness.project_id)
            .await
            .unwrap();
        assert_eq!(chapters.len(), 1);
        assert_eq!(chapters[0].chapter_number, 1);
    }

    #[tokio::test]
    async fn test_paused_status_parks_loop_even_if_signal_was_lost() {
        let generation = FakeGenerationClient::new(vec![
            ScriptedGeneration::chapter("第一章", "Mara boarded the train."),
            ScriptedGeneration::chapter("第二章", "Mara searched the carriages."),
            ScriptedGeneration::chapter("第三章", "Mara found the answer."),
        ])
        .with_delay(50);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 3, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        for _ in 0..200 {
            let j = harness.job_repo.find_by_id(job.id).await.unwrap().unwrap();
            if j.status == JobStatus::Running {
                break;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }

        // 只落库不发信号，模拟 pause 信号在通道注册前到达而丢失
        assert!(harness
            .job_repo
            .update_status_cas(job.id, JobStatus::Running, JobStatus::Paused, None)
            .await
            .unwrap());

        // 循环在章节边界重查数据库状态并挂起，不再推进
        tokio::time::sleep(Duration::from_millis(250)).await;
        let paused = harness.job_repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(paused.status, JobStatus::Paused);
        assert!(paused.current_chapter <= 1);

        // resume 唤醒挂起的循环，任务继续到完成
        assert!(harness
            .job_repo
            .update_status_cas(job.id, JobStatus::Paused, JobStatus::Running, None)
            .await
            .unwrap());
        assert!(harness.job_control.signal(job.id, RunSignal::Run));

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.current_chapter, 3);
    }

    #[tokio::test]
    async fn test_pause_parks_loop_and_resume_continues() {
        let generation = FakeGenerationClient::new(vec![
            ScriptedGeneration::chapter("第一章", "Mara boarded the train."),
            ScriptedGeneration::chapter("第二章", "Mara reached the last carriage."),
        ])
        .with_delay(30);
        let harness =
            start_worker(generation, ScriptedScorer::constant(9.0), fast_config()).await;

        let job = pending_job(harness.project_id, 2, 8.0);
        harness.job_repo.insert(&job).await.unwrap();
        harness.job_control.enqueue(job.id).unwrap();

        // 等第一章提交
        for _ in 0..200 {
            let j = harness.job_repo.find_by_id(job.id).await.unwrap().unwrap();
            if j.current_chapter >= 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // 控制命令语义: 先 CAS 落库，再向循环发信号
        if harness
            .job_repo
            .update_status_cas(job.id, JobStatus::Running, JobStatus::Paused, None)
            .await
            .unwrap()
        {
            assert!(harness.job_control.signal(job.id, RunSignal::Pause));

            // 挂起期间不再推进
            tokio::time::sleep(Duration::from_millis(150)).await;
            let paused = harness.job_repo.find_by_id(job.id).await.unwrap().unwrap();
            assert_eq!(paused.status, JobStatus::Paused);
            assert_eq!(paused.current_chapter, 1);

            harness
                .job_repo
                .update_status_cas(job.id, JobStatus::Paused, JobStatus::Running, None)
                .await
                .unwrap();
            assert!(harness.job_control.signal(job.id, RunSignal::Run));
        }

        let finished = wait_for_terminal(&harness, job.id).await;
        assert_eq!(finished.status, JobStatus::Completed);
        assert_eq!(finished.current_chapter, 2);
    }
}
