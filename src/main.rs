//! Scribel - 书籍自动续写服务
//!
//! 架构:
//! - Domain: project/, job/, narrative (Bounded Contexts)
//! - Application: commands, queries, ports
//! - Infrastructure: http, memory, worker, persistence, adapters, events

use std::sync::Arc;

use scribel::config::{load_config, print_config};
use scribel::domain::narrative::NarrativeConfig;
use scribel::infrastructure::adapters::{
    FakeGenerationClient, HttpGenerationClient, HttpGenerationClientConfig, HttpTokenVerifier,
    HttpTokenVerifierConfig, LlmScorer, LlmScorerConfig, ScriptedGeneration, ScriptedScorer,
    StaticTokenVerifier,
};
use scribel::application::ports::{
    GenerationEnginePort, JobControlPort, JobRepositoryPort, QualityScorerPort, TokenVerifierPort,
};
use scribel::domain::job::JobStatus;
use scribel::infrastructure::events::EventPublisher;
use scribel::infrastructure::http::{AppState, HttpServer, ServerConfig};
use scribel::infrastructure::memory::InMemoryJobControl;
use scribel::infrastructure::persistence::sqlite::{
    create_pool, run_migrations, DatabaseConfig, SqliteChapterRepository, SqliteJobRepository,
    SqliteNoteRepository, SqliteProjectRepository,
};
use scribel::infrastructure::worker::{JobWorker, JobWorkerConfig};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 加载配置（优先级：环境变量 > 配置文件 > 默认值）
    let config = load_config().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

    // 初始化日志
    let log_filter = format!(
        "{},scribel={},tower_http=debug",
        config.log.level, config.log.level
    );
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_filter)),
        )
        .init();

    tracing::info!("Scribel - 书籍自动续写服务");
    print_config(&config);

    // 确保数据目录存在
    if let Some(path) = config
        .database
        .url
        .strip_prefix("sqlite:")
        .filter(|p| !p.starts_with(":memory:"))
    {
        let path = path.split('?').next().unwrap_or(path);
        if let Some(parent) = std::path::Path::new(path).parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }

    // 初始化数据库
    let db_config = DatabaseConfig {
        database_url: config.database.url.clone(),
        max_connections: config.database.max_connections,
    };
    let pool = create_pool(&db_config).await?;
    run_migrations(&pool).await?;

    // 创建 Repository 适配器
    let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
    let chapter_repo = Arc::new(SqliteChapterRepository::new(pool.clone()));
    let note_repo = Arc::new(SqliteNoteRepository::new(pool.clone()));
    let job_repo = Arc::new(SqliteJobRepository::new(pool.clone()));

    // 创建生成引擎
    let generation_engine: Arc<dyn GenerationEnginePort> = if config.generation.use_fake {
        tracing::warn!("Using scripted fake generation client");
        Arc::new(FakeGenerationClient::new(vec![ScriptedGeneration::chapter(
            "示例章节",
            "This is a scripted chapter used in development environments.",
        )]))
    } else {
        Arc::new(HttpGenerationClient::new(HttpGenerationClientConfig {
            base_url: config.generation.url.clone(),
            model: config.generation.model.clone(),
            api_key: config.generation.api_key.clone(),
            timeout_secs: config.generation.timeout_secs,
            temperature: config.generation.temperature,
            max_tokens: config.generation.max_tokens,
        })?)
    };

    // 创建质量评分器（缺省复用生成服务端点）
    let quality_scorer: Arc<dyn QualityScorerPort> = if config.generation.use_fake {
        Arc::new(ScriptedScorer::constant(8.5))
    } else {
        Arc::new(LlmScorer::new(LlmScorerConfig {
            base_url: config
                .scorer
                .url
                .clone()
                .unwrap_or_else(|| config.generation.url.clone()),
            model: config
                .scorer
                .model
                .clone()
                .unwrap_or_else(|| config.generation.model.clone()),
            api_key: config
                .scorer
                .api_key
                .clone()
                .or_else(|| config.generation.api_key.clone()),
            timeout_secs: config.scorer.timeout_secs,
        })?)
    };

    // 创建 Token 校验器
    let token_verifier: Arc<dyn TokenVerifierPort> = match config.auth.mode.as_str() {
        "http" => {
            let userinfo_url = config
                .auth
                .userinfo_url
                .clone()
                .ok_or_else(|| anyhow::anyhow!("auth.userinfo_url is required"))?;
            Arc::new(HttpTokenVerifier::new(HttpTokenVerifierConfig {
                userinfo_url,
                timeout_secs: config.auth.timeout_secs,
            })?)
        }
        _ => {
            if config.auth.static_tokens.is_empty() {
                tracing::warn!("auth.static_tokens is empty, all requests will be rejected");
            }
            Arc::new(StaticTokenVerifier::new(config.auth.static_tokens.clone()))
        }
    };

    // 创建事件发布器
    let event_publisher = Arc::new(EventPublisher::new());

    // 创建任务队列与控制器
    let (queue_tx, queue_rx) = mpsc::channel(1000);
    let job_control = Arc::new(InMemoryJobControl::new(queue_tx));

    // 创建 JobWorker
    let worker_config = JobWorkerConfig {
        max_concurrent_jobs: config.job.max_concurrent,
        max_quality_retries: config.job.max_quality_retries,
        max_service_retries: config.job.max_service_retries,
        retry_backoff_ms: config.job.retry_backoff_ms,
        retry_backoff_cap_ms: config.job.retry_backoff_cap_ms,
        narrative: NarrativeConfig {
            recent_window: config.narrative.recent_window,
            chapter_excerpt_chars: config.narrative.chapter_excerpt_chars,
            summary_budget_chars: config.narrative.summary_budget_chars,
            ending_markers: config.narrative.ending_markers.clone(),
        },
    };
    let worker = JobWorker::new(
        worker_config,
        queue_rx,
        project_repo.clone(),
        chapter_repo.clone(),
        job_repo.clone(),
        generation_engine,
        quality_scorer,
        job_control.clone(),
        event_publisher.clone(),
    );

    // 启动 Worker
    tokio::spawn(worker.run());

    // 重启恢复: pending/running 任务重新入队，worker 按数据库状态续跑
    for status in [JobStatus::Pending, JobStatus::Running] {
        for job in job_repo.find_by_status(status).await? {
            tracing::info!(job_id = %job.id, status = %status, "Re-enqueueing job after restart");
            if let Err(e) = job_control.enqueue(job.id) {
                tracing::error!(job_id = %job.id, error = %e, "Failed to re-enqueue job");
            }
        }
    }

    // 创建 HTTP 服务器
    let server_config = ServerConfig::new(&config.server.host, config.server.port);
    let state = AppState::new(
        project_repo,
        chapter_repo,
        note_repo,
        job_repo,
        job_control,
        token_verifier,
        event_publisher,
    );

    let server = HttpServer::new(server_config, state);

    tracing::info!("Starting HTTP server...");

    // 启动服务器（带优雅关闭）
    server
        .run_with_shutdown(async {
            tokio::signal::ctrl_c()
                .await
                .expect("Failed to listen for ctrl-c");
            tracing::info!("Received shutdown signal");
        })
        .await?;

    tracing::info!("Server shutdown complete");

    Ok(())
}
