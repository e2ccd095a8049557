//! SQLite Note Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{NoteRecord, NoteRepositoryPort, RepositoryError};

/// SQLite Note Repository
pub struct SqliteNoteRepository {
    pool: DbPool,
}

impl SqliteNoteRepository {
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
struct NoteRow {
    id: String,
    chapter_id: String,
    project_id: String,
    content: String,
    position: Option<i64>,
    creator_id: String,
    resolved: i64,
    resolved_at: Option<String>,
    version: i64,
    created_at: String,
    updated_at: String,
}

impl TryFrom<NoteRow> for NoteRecord {
    type Error = RepositoryError;

    fn try_from(row: NoteRow) -> Result<Self, Self::Error> {
        Ok(NoteRecord {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            chapter_id: Uuid::parse_str(&row.chapter_id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            project_id: Uuid::parse_str(&row.project_id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            content: row.content,
            position: row.position.map(|p| p as u32),
            creator_id: row.creator_id,
            resolved: row.resolved != 0,
            resolved_at: row.resolved_at.as_deref().map(parse_ts).transpose()?,
            version: row.version as u32,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

const NOTE_COLUMNS: &str = "id, chapter_id, project_id, content, position, creator_id, \
     resolved, resolved_at, version, created_at, updated_at";

#[async_trait]
impl NoteRepositoryPort for SqliteNoteRepository {
    async fn insert(&self, note: &NoteRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO notes (id, chapter_id, project_id, content, position, creator_id,
                resolved, resolved_at, version, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(note.id.to_string())
        .bind(note.chapter_id.to_string())
        .bind(note.project_id.to_string())
        .bind(&note.content)
        .bind(note.position.map(|p| p as i64))
        .bind(&note.creator_id)
        .bind(note.resolved as i64)
        .bind(note.resolved_at.map(|dt| dt.to_rfc3339()))
        .bind(note.version as i64)
        .bind(note.created_at.to_rfc3339())
        .bind(note.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<NoteRecord>, RepositoryError> {
        let row: Option<NoteRow> =
            sqlx::query_as(&format!("SELECT {NOTE_COLUMNS} FROM notes WHERE id = ?"))
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(NoteRecord::try_from).transpose()
    }

    async fn find_by_chapter(&self, chapter_id: Uuid) -> Result<Vec<NoteRecord>, RepositoryError> {
        let rows: Vec<NoteRow> = sqlx::query_as(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE chapter_id = ? ORDER BY created_at"
        ))
        .bind(chapter_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(NoteRecord::try_from).collect()
    }

    async fn update(
        &self,
        note: &NoteRecord,
        expected_version: u32,
    ) -> Result<(), RepositoryError> {
        // CAS: 版本号不匹配说明有并发编辑，拒绝写入
        let result = sqlx::query(
            r#"
            UPDATE notes
            SET content = ?, position = ?, resolved = ?, resolved_at = ?,
                version = ?, updated_at = ?
            WHERE id = ? AND version = ?
            "#,
        )
        .bind(&note.content)
        .bind(note.position.map(|p| p as i64))
        .bind(note.resolved as i64)
        .bind(note.resolved_at.map(|dt| dt.to_rfc3339()))
        .bind(note.version as i64)
        .bind(note.updated_at.to_rfc3339())
        .bind(note.id.to_string())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "note version mismatch for {} (expected {expected_version})",
                note.id
            )));
        }
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM notes WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Note {id}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::{
        create_pool, run_migrations, DatabaseConfig, SqliteChapterRepository,
        SqliteProjectRepository,
    };
    use super::*;
    use crate::application::ports::{
        ChapterRecord, ChapterRepositoryPort, ProjectRecord, ProjectRepositoryPort,
    };

    async fn setup() -> (SqliteNoteRepository, Uuid, Uuid) {
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

        let chapter_id = Uuid::new_v4();
        SqliteChapterRepository::new(pool.clone())
            .save(&ChapterRecord {
                id: chapter_id,
                project_id,
                chapter_number: 1,
                title: "第一章".to_string(),
                content: "正文".to_string(),
                word_count: 1,
                creator_id: "alice".to_string(),
                version: 1,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        (SqliteNoteRepository::new(pool), project_id, chapter_id)
    }

    fn sample_note(project_id: Uuid, chapter_id: Uuid) -> NoteRecord {
        let now = Utc::now();
        NoteRecord {
            id: Uuid::new_v4(),
            chapter_id,
            project_id,
            content: "这里的节奏太快".to_string(),
            position: Some(120),
            creator_id: "alice".to_string(),
            resolved: false,
            resolved_at: None,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let (repo, project_id, chapter_id) = setup().await;

        repo.insert(&sample_note(project_id, chapter_id)).await.unwrap();
        repo.insert(&sample_note(project_id, chapter_id)).await.unwrap();

        let notes = repo.find_by_chapter(chapter_id).await.unwrap();
        assert_eq!(notes.len(), 2);
    }

    #[tokio::test]
    async fn test_update_cas() {
        let (repo, project_id, chapter_id) = setup().await;
        let mut note = sample_note(project_id, chapter_id);
        repo.insert(&note).await.unwrap();

        note.content = "改写后的笔记".to_string();
        note.version = 2;
        repo.update(&note, 1).await.unwrap();

        // 基于旧版本的更新被拒绝
        note.version = 3;
        let err = repo.update(&note, 1).await.unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let found = repo.find_by_id(note.id).await.unwrap().unwrap();
        assert_eq!(found.content, "改写后的笔记");
        assert_eq!(found.version, 2);
    }
}
