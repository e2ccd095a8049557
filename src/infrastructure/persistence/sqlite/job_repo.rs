//! SQLite Job Repository
//!
//! jobs.status 是任务并发控制的唯一权威：
//! 所有状态迁移走 update_status_cas，竞争者中只有一个能写成功

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{JobRecord, JobRepositoryPort, JobScoreRecord, RepositoryError};
use crate::domain::job::JobStatus;

/// SQLite Job Repository
pub struct SqliteJobRepository {
    pool: DbPool,
}

impl SqliteJobRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

#[derive(FromRow)]
struct JobRow {
    id: String,
    project_id: String,
    owner_id: String,
    status: String,
    current_chapter: i64,
    target_chapters: i64,
    quality_threshold: f64,
    total_words: i64,
    error_message: Option<String>,
    created_at: String,
    updated_at: String,
    completed_at: Option<String>,
}

impl TryFrom<JobRow> for JobRecord {
    type Error = RepositoryError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(JobRecord {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            project_id: Uuid::parse_str(&row.project_id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            owner_id: row.owner_id,
            status: JobStatus::from_str(&row.status).ok_or_else(|| {
                RepositoryError::SerializationError(format!("unknown job status: {}", row.status))
            })?,
            current_chapter: row.current_chapter as u32,
            target_chapters: row.target_chapters as u32,
            quality_threshold: row.quality_threshold,
            total_words: row.total_words as u64,
            error_message: row.error_message,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
            completed_at: row.completed_at.as_deref().map(parse_ts).transpose()?,
        })
    }
}

#[derive(FromRow)]
struct JobScoreRow {
    job_id: String,
    chapter_number: i64,
    attempt: i64,
    score: f64,
    feedback: Option<String>,
    created_at: String,
}

impl TryFrom<JobScoreRow> for JobScoreRecord {
    type Error = RepositoryError;

    fn try_from(row: JobScoreRow) -> Result<Self, Self::Error> {
        Ok(JobScoreRecord {
            job_id: Uuid::parse_str(&row.job_id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            chapter_number: row.chapter_number as u32,
            attempt: row.attempt as u32,
            score: row.score,
            feedback: row.feedback,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

const JOB_COLUMNS: &str = "id, project_id, owner_id, status, current_chapter, target_chapters, \
     quality_threshold, total_words, error_message, created_at, updated_at, completed_at";

#[async_trait]
impl JobRepositoryPort for SqliteJobRepository {
    async fn insert(&self, job: &JobRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO jobs (id, project_id, owner_id, status, current_chapter,
                target_chapters, quality_threshold, total_words, error_message,
                created_at, updated_at, completed_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(job.id.to_string())
        .bind(job.project_id.to_string())
        .bind(&job.owner_id)
        .bind(job.status.as_str())
        .bind(job.current_chapter as i64)
        .bind(job.target_chapters as i64)
        .bind(job.quality_threshold)
        .bind(job.total_words as i64)
        .bind(&job.error_message)
        .bind(job.created_at.to_rfc3339())
        .bind(job.updated_at.to_rfc3339())
        .bind(job.completed_at.map(|dt| dt.to_rfc3339()))
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<JobRecord>, RepositoryError> {
        let row: Option<JobRow> =
            sqlx::query_as(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn find_by_owner(&self, owner_id: &str) -> Result<Vec<JobRecord>, RepositoryError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE owner_id = ? ORDER BY created_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }

    async fn find_active_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Option<JobRecord>, RepositoryError> {
        let row: Option<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs \
             WHERE project_id = ? AND status IN ('pending', 'running', 'paused') \
             ORDER BY created_at DESC LIMIT 1"
        ))
        .bind(project_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(JobRecord::try_from).transpose()
    }

    async fn find_by_status(&self, status: JobStatus) -> Result<Vec<JobRecord>, RepositoryError> {
        let rows: Vec<JobRow> = sqlx::query_as(&format!(
            "SELECT {JOB_COLUMNS} FROM jobs WHERE status = ? ORDER BY created_at"
        ))
        .bind(status.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(JobRecord::try_from).collect()
    }

    async fn update_status_cas(
        &self,
        id: Uuid,
        expected: JobStatus,
        next: JobStatus,
        error_message: Option<&str>,
    ) -> Result<bool, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let completed_at = next.is_terminal().then(|| now.clone());

        let result = sqlx::query(
            r#"
            UPDATE jobs
            SET status = ?, error_message = ?, updated_at = ?,
                completed_at = COALESCE(?, completed_at)
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(next.as_str())
        .bind(error_message)
        .bind(&now)
        .bind(completed_at)
        .bind(id.to_string())
        .bind(expected.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    async fn update_progress(
        &self,
        id: Uuid,
        current_chapter: u32,
        total_words: u64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE jobs SET current_chapter = ?, total_words = ?, updated_at = ? WHERE id = ?",
        )
        .bind(current_chapter as i64)
        .bind(total_words as i64)
        .bind(Utc::now().to_rfc3339())
        .bind(id.to_string())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Job {id}")));
        }
        Ok(())
    }

    async fn append_score(&self, score: &JobScoreRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO job_scores (job_id, chapter_number, attempt, score, feedback, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(score.job_id.to_string())
        .bind(score.chapter_number as i64)
        .bind(score.attempt as i64)
        .bind(score.score)
        .bind(&score.feedback)
        .bind(score.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn scores(&self, job_id: Uuid) -> Result<Vec<JobScoreRecord>, RepositoryError> {
        let rows: Vec<JobScoreRow> = sqlx::query_as(
            "SELECT job_id, chapter_number, attempt, score, feedback, created_at \
             FROM job_scores WHERE job_id = ? ORDER BY chapter_number, attempt",
        )
        .bind(job_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(JobScoreRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{create_pool, run_migrations, DatabaseConfig, SqliteProjectRepository};
    use super::*;
    use crate::application::ports::{ProjectRecord, ProjectRepositoryPort};

    async fn setup() -> (SqliteJobRepository, Uuid) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let now = Utc::now();
        let project_id = Uuid::new_v4();
        SqliteProjectRepository::new(pool.clone())
            .save(&ProjectRecord {
                id: project_id,
                owner_id: "alice".to_string(),
                title: "测试项目".to_string(),
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

        (SqliteJobRepository::new(pool), project_id)
    }

    fn sample_job(project_id: Uuid) -> JobRecord {
        let now = Utc::now();
        JobRecord {
            id: Uuid::new_v4(),
            project_id,
            owner_id: "alice".to_string(),
            status: JobStatus::Pending,
            current_chapter: 0,
            target_chapters: 10,
            quality_threshold: 7.0,
            total_words: 0,
            error_message: None,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    #[tokio::test]
    async fn test_status_cas() {
        let (repo, project_id) = setup().await;
        let job = sample_job(project_id);
        repo.insert(&job).await.unwrap();

        // 第一次 CAS 生效
        assert!(repo
            .update_status_cas(job.id, JobStatus::Pending, JobStatus::Running, None)
            .await
            .unwrap());

        // 期望状态已过期，CAS 失败且状态不变
        assert!(!repo
            .update_status_cas(job.id, JobStatus::Pending, JobStatus::Running, None)
            .await
            .unwrap());

        let found = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Running);
        assert!(found.completed_at.is_none());
    }

    #[tokio::test]
    async fn test_terminal_status_sets_completed_at() {
        let (repo, project_id) = setup().await;
        let job = sample_job(project_id);
        repo.insert(&job).await.unwrap();

        repo.update_status_cas(job.id, JobStatus::Pending, JobStatus::Running, None)
            .await
            .unwrap();
        repo.update_status_cas(
            job.id,
            JobStatus::Running,
            JobStatus::Failed,
            Some("GenerationServiceError: upstream timeout"),
        )
        .await
        .unwrap();

        let found = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(found.status, JobStatus::Failed);
        assert!(found.completed_at.is_some());
        assert!(found.error_message.unwrap().contains("upstream timeout"));
    }

    #[tokio::test]
    async fn test_active_job_lookup() {
        let (repo, project_id) = setup().await;
        let job = sample_job(project_id);
        repo.insert(&job).await.unwrap();

        assert!(repo
            .find_active_by_project(project_id)
            .await
            .unwrap()
            .is_some());

        repo.update_status_cas(job.id, JobStatus::Pending, JobStatus::Cancelled, None)
            .await
            .unwrap();
        assert!(repo
            .find_active_by_project(project_id)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_progress_and_scores() {
        let (repo, project_id) = setup().await;
        let job = sample_job(project_id);
        repo.insert(&job).await.unwrap();

        repo.update_progress(job.id, 2, 4100).await.unwrap();

        repo.append_score(&JobScoreRecord {
            job_id: job.id,
            chapter_number: 1,
            attempt: 1,
            score: 6.5,
            feedback: Some("节奏偏慢".to_string()),
            created_at: Utc::now(),
        })
        .await
        .unwrap();
        repo.append_score(&JobScoreRecord {
            job_id: job.id,
            chapter_number: 1,
            attempt: 2,
            score: 8.2,
            feedback: None,
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let found = repo.find_by_id(job.id).await.unwrap().unwrap();
        assert_eq!(found.current_chapter, 2);
        assert_eq!(found.total_words, 4100);

        let scores = repo.scores(job.id).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].attempt, 1);
        assert_eq!(scores[1].score, 8.2);
    }
}
