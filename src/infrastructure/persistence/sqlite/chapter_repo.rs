//! SQLite Chapter Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, ChapterVersionRecord, RepositoryError,
};

/// SQLite Chapter Repository
pub struct SqliteChapterRepository {
    pool: DbPool,
}

impl SqliteChapterRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn parse_ts(value: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

fn parse_uuid(value: &str) -> Result<Uuid, RepositoryError> {
    Uuid::parse_str(value).map_err(|e| RepositoryError::SerializationError(e.to_string()))
}

#[derive(FromRow)]
struct ChapterRow {
    id: String,
    project_id: String,
    chapter_number: i64,
    title: String,
    content: String,
    word_count: i64,
    creator_id: String,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ChapterRow> for ChapterRecord {
    type Error = RepositoryError;

    fn try_from(row: ChapterRow) -> Result<Self, Self::Error> {
        Ok(ChapterRecord {
            id: parse_uuid(&row.id)?,
            project_id: parse_uuid(&row.project_id)?,
            chapter_number: row.chapter_number as u32,
            title: row.title,
            content: row.content,
            word_count: row.word_count as u64,
            creator_id: row.creator_id,
            version: row.version as u32,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

#[derive(FromRow)]
struct ChapterVersionRow {
    id: String,
    chapter_id: String,
    version: i64,
    title: String,
    content: String,
    created_at: String,
}

impl TryFrom<ChapterVersionRow> for ChapterVersionRecord {
    type Error = RepositoryError;

    fn try_from(row: ChapterVersionRow) -> Result<Self, Self::Error> {
        Ok(ChapterVersionRecord {
            id: parse_uuid(&row.id)?,
            chapter_id: parse_uuid(&row.chapter_id)?,
            version: row.version as u32,
            title: row.title,
            content: row.content,
            created_at: parse_ts(&row.created_at)?,
        })
    }
}

const CHAPTER_COLUMNS: &str = "id, project_id, chapter_number, title, content, word_count, \
     creator_id, version, created_at, updated_at";

#[async_trait]
impl ChapterRepositoryPort for SqliteChapterRepository {
    async fn save(&self, chapter: &ChapterRecord) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO chapters (id, project_id, chapter_number, title, content,
                word_count, creator_id, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                word_count = excluded.word_count,
                version = excluded.version,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(chapter.id.to_string())
        .bind(chapter.project_id.to_string())
        .bind(chapter.chapter_number as i64)
        .bind(&chapter.title)
        .bind(&chapter.content)
        .bind(chapter.word_count as i64)
        .bind(&chapter.creator_id)
        .bind(chapter.version as i64)
        .bind(chapter.created_at.to_rfc3339())
        .bind(chapter.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            // 同项目同编号的并发插入触发唯一约束
            Err(e) if e.to_string().contains("UNIQUE constraint failed") => {
                Err(RepositoryError::Duplicate(format!(
                    "chapter {} already exists in project {}",
                    chapter.chapter_number, chapter.project_id
                )))
            }
            Err(e) => Err(RepositoryError::DatabaseError(e.to_string())),
        }
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ChapterRecord>, RepositoryError> {
        let row: Option<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn find_by_project(
        &self,
        project_id: Uuid,
    ) -> Result<Vec<ChapterRecord>, RepositoryError> {
        let rows: Vec<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE project_id = ? ORDER BY chapter_number"
        ))
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ChapterRecord::try_from).collect()
    }

    async fn find_by_number(
        &self,
        project_id: Uuid,
        number: u32,
    ) -> Result<Option<ChapterRecord>, RepositoryError> {
        let row: Option<ChapterRow> = sqlx::query_as(&format!(
            "SELECT {CHAPTER_COLUMNS} FROM chapters WHERE project_id = ? AND chapter_number = ?"
        ))
        .bind(project_id.to_string())
        .bind(number as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ChapterRecord::try_from).transpose()
    }

    async fn max_chapter_number(&self, project_id: Uuid) -> Result<u32, RepositoryError> {
        let row: (Option<i64>,) =
            sqlx::query_as("SELECT MAX(chapter_number) FROM chapters WHERE project_id = ?")
                .bind(project_id.to_string())
                .fetch_one(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(row.0.unwrap_or(0) as u32)
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM chapters WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Chapter {id}")));
        }
        Ok(())
    }

    async fn append_version(&self, version: &ChapterVersionRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO chapter_versions (id, chapter_id, version, title, content, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(version.id.to_string())
        .bind(version.chapter_id.to_string())
        .bind(version.version as i64)
        .bind(&version.title)
        .bind(&version.content)
        .bind(version.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn versions(
        &self,
        chapter_id: Uuid,
    ) -> Result<Vec<ChapterVersionRecord>, RepositoryError> {
        let rows: Vec<ChapterVersionRow> = sqlx::query_as(
            "SELECT id, chapter_id, version, title, content, created_at \
             FROM chapter_versions WHERE chapter_id = ? ORDER BY version",
        )
        .bind(chapter_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ChapterVersionRecord::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::super::{create_pool, run_migrations, DatabaseConfig, SqliteProjectRepository};
    use super::*;
    use crate::application::ports::{ProjectRecord, ProjectRepositoryPort};

    async fn setup() -> (SqliteChapterRepository, Uuid) {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        // 外键约束要求项目先存在
        let project_repo = SqliteProjectRepository::new(pool.clone());
        let now = Utc::now();
        let project_id = Uuid::new_v4();
        project_repo
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

        (SqliteChapterRepository::new(pool), project_id)
    }

    fn sample_chapter(project_id: Uuid, number: u32) -> ChapterRecord {
        let now = Utc::now();
        ChapterRecord {
            id: Uuid::new_v4(),
            project_id,
            chapter_number: number,
            title: format!("第{number}章"),
            content: "正文内容".to_string(),
            word_count: 2,
            creator_id: "alice".to_string(),
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_ordering() {
        let (repo, project_id) = setup().await;

        repo.save(&sample_chapter(project_id, 2)).await.unwrap();
        repo.save(&sample_chapter(project_id, 1)).await.unwrap();

        let chapters = repo.find_by_project(project_id).await.unwrap();
        assert_eq!(chapters.len(), 2);
        assert_eq!(chapters[0].chapter_number, 1);
        assert_eq!(chapters[1].chapter_number, 2);
        assert_eq!(repo.max_chapter_number(project_id).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_number_rejected() {
        let (repo, project_id) = setup().await;

        repo.save(&sample_chapter(project_id, 1)).await.unwrap();
        let err = repo.save(&sample_chapter(project_id, 1)).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Duplicate(_)));
    }

    #[tokio::test]
    async fn test_version_history() {
        let (repo, project_id) = setup().await;
        let chapter = sample_chapter(project_id, 1);
        repo.save(&chapter).await.unwrap();

        repo.append_version(&ChapterVersionRecord {
            id: Uuid::new_v4(),
            chapter_id: chapter.id,
            version: 1,
            title: chapter.title.clone(),
            content: "旧版正文".to_string(),
            created_at: Utc::now(),
        })
        .await
        .unwrap();

        let versions = repo.versions(chapter.id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].content, "旧版正文");
    }

    #[tokio::test]
    async fn test_max_number_empty_project() {
        let (repo, project_id) = setup().await;
        assert_eq!(repo.max_chapter_number(project_id).await.unwrap(), 0);
    }
}
