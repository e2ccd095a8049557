//! SQLite Project Repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::DbPool;
use crate::application::ports::{ProjectRecord, ProjectRepositoryPort, RepositoryError};

/// SQLite Project Repository
pub struct SqliteProjectRepository {
    pool: DbPool,
}

impl SqliteProjectRepository {
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
struct ProjectRow {
    id: String,
    owner_id: String,
    title: String,
    settings_json: String,
    bible_content: Option<String>,
    bible_version: i64,
    bible_ai_expanded: i64,
    bible_updated_at: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TryFrom<ProjectRow> for ProjectRecord {
    type Error = RepositoryError;

    fn try_from(row: ProjectRow) -> Result<Self, Self::Error> {
        Ok(ProjectRecord {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RepositoryError::SerializationError(e.to_string()))?,
            owner_id: row.owner_id,
            title: row.title,
            settings_json: row.settings_json,
            bible_content: row.bible_content,
            bible_version: row.bible_version as u32,
            bible_ai_expanded: row.bible_ai_expanded != 0,
            bible_updated_at: row.bible_updated_at.as_deref().map(parse_ts).transpose()?,
            created_at: parse_ts(&row.created_at)?,
            updated_at: parse_ts(&row.updated_at)?,
        })
    }
}

const PROJECT_COLUMNS: &str = "id, owner_id, title, settings_json, bible_content, bible_version, \
     bible_ai_expanded, bible_updated_at, created_at, updated_at";

#[async_trait]
impl ProjectRepositoryPort for SqliteProjectRepository {
    async fn save(&self, project: &ProjectRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO projects (id, owner_id, title, settings_json, bible_content,
                bible_version, bible_ai_expanded, bible_updated_at, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                settings_json = excluded.settings_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(project.id.to_string())
        .bind(&project.owner_id)
        .bind(&project.title)
        .bind(&project.settings_json)
        .bind(&project.bible_content)
        .bind(project.bible_version as i64)
        .bind(project.bible_ai_expanded as i64)
        .bind(project.bible_updated_at.map(|dt| dt.to_rfc3339()))
        .bind(project.created_at.to_rfc3339())
        .bind(project.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<ProjectRecord>, RepositoryError> {
        let row: Option<ProjectRow> = sqlx::query_as(&format!(
            "SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?"
        ))
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        row.map(ProjectRecord::try_from).transpose()
    }

    async fn find_by_member(&self, user_id: &str) -> Result<Vec<ProjectRecord>, RepositoryError> {
        let rows: Vec<ProjectRow> = sqlx::query_as(&format!(
            r#"
            SELECT {PROJECT_COLUMNS} FROM projects
            WHERE owner_id = ?
               OR id IN (SELECT project_id FROM project_collaborators WHERE user_id = ?)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        rows.into_iter().map(ProjectRecord::try_from).collect()
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound(format!("Project {id}")));
        }
        Ok(())
    }

    async fn collaborators(&self, project_id: Uuid) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT user_id FROM project_collaborators WHERE project_id = ? ORDER BY added_at",
        )
        .bind(project_id.to_string())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(rows.into_iter().map(|(user_id,)| user_id).collect())
    }

    async fn add_collaborator(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> Result<(), RepositoryError> {
        // 幂等: 重复添加是 no-op
        sqlx::query(
            r#"
            INSERT INTO project_collaborators (project_id, user_id, added_at)
            VALUES (?, ?, ?)
            ON CONFLICT(project_id, user_id) DO NOTHING
            "#,
        )
        .bind(project_id.to_string())
        .bind(user_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn remove_collaborator(
        &self,
        project_id: Uuid,
        user_id: &str,
    ) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM project_collaborators WHERE project_id = ? AND user_id = ?")
            .bind(project_id.to_string())
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn update_bible(
        &self,
        project_id: Uuid,
        content: &str,
        expected_version: u32,
        ai_expanded: bool,
    ) -> Result<u32, RepositoryError> {
        let now = Utc::now().to_rfc3339();
        let next_version = expected_version + 1;

        // CAS: 仅当版本号匹配时写入
        let result = sqlx::query(
            r#"
            UPDATE projects
            SET bible_content = ?, bible_version = ?, bible_ai_expanded = ?,
                bible_updated_at = ?, updated_at = ?
            WHERE id = ? AND bible_version = ?
            "#,
        )
        .bind(content)
        .bind(next_version as i64)
        .bind(ai_expanded as i64)
        .bind(&now)
        .bind(&now)
        .bind(project_id.to_string())
        .bind(expected_version as i64)
        .execute(&self.pool)
        .await
        .map_err(|e| RepositoryError::DatabaseError(e.to_string()))?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "bible version mismatch for project {project_id} (expected {expected_version})"
            )));
        }

        Ok(next_version)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{create_pool, run_migrations, DatabaseConfig};
    use super::*;

    async fn setup() -> SqliteProjectRepository {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();
        SqliteProjectRepository::new(pool)
    }

    fn sample_record() -> ProjectRecord {
        let now = Utc::now();
        ProjectRecord {
            id: Uuid::new_v4(),
            owner_id: "alice".to_string(),
            title: "星海迷航".to_string(),
            settings_json: "{}".to_string(),
            bible_content: None,
            bible_version: 0,
            bible_ai_expanded: false,
            bible_updated_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_save_and_find() {
        let repo = setup().await;
        let record = sample_record();

        repo.save(&record).await.unwrap();
        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.title, "星海迷航");
        assert_eq!(found.owner_id, "alice");
    }

    #[tokio::test]
    async fn test_member_visibility() {
        let repo = setup().await;
        let record = sample_record();
        repo.save(&record).await.unwrap();

        // owner 可见
        assert_eq!(repo.find_by_member("alice").await.unwrap().len(), 1);
        // 非成员不可见
        assert!(repo.find_by_member("bob").await.unwrap().is_empty());

        repo.add_collaborator(record.id, "bob").await.unwrap();
        assert_eq!(repo.find_by_member("bob").await.unwrap().len(), 1);

        // 幂等添加
        repo.add_collaborator(record.id, "bob").await.unwrap();
        assert_eq!(repo.collaborators(record.id).await.unwrap(), vec!["bob"]);

        repo.remove_collaborator(record.id, "bob").await.unwrap();
        assert!(repo.find_by_member("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_bible_cas() {
        let repo = setup().await;
        let record = sample_record();
        repo.save(&record).await.unwrap();

        let v1 = repo
            .update_bible(record.id, "世界观设定", 0, false)
            .await
            .unwrap();
        assert_eq!(v1, 1);

        // 基于过期版本的写入被拒绝
        let err = repo
            .update_bible(record.id, "过期写入", 0, false)
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::Conflict(_)));

        let v2 = repo
            .update_bible(record.id, "扩写后的设定", 1, true)
            .await
            .unwrap();
        assert_eq!(v2, 2);

        let found = repo.find_by_id(record.id).await.unwrap().unwrap();
        assert_eq!(found.bible_content.as_deref(), Some("扩写后的设定"));
        assert!(found.bible_ai_expanded);
    }
}
