//! Director's Note Command Handlers

use std::sync::Arc;

use crate::application::access::require_member;
use crate::application::commands::note_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRepositoryPort, NoteRecord, NoteRepositoryPort, ProjectRepositoryPort,
};
use crate::domain::project::{DirectorsNote, ProjectId};

fn note_to_record(note: &DirectorsNote) -> NoteRecord {
    NoteRecord {
        id: note.id(),
        chapter_id: note.chapter_id(),
        project_id: *note.project_id().as_uuid(),
        content: note.content().to_string(),
        position: note.position(),
        creator_id: note.creator_id().to_string(),
        resolved: note.resolved(),
        resolved_at: note.resolved_at(),
        version: note.version(),
        created_at: note.created_at(),
        updated_at: note.updated_at(),
    }
}

fn note_from_record(record: &NoteRecord) -> DirectorsNote {
    DirectorsNote::from_parts(
        record.id,
        record.chapter_id,
        ProjectId::from_uuid(record.project_id),
        record.content.clone(),
        record.position,
        record.creator_id.clone(),
        record.resolved,
        record.resolved_at,
        record.version,
        record.created_at,
        record.updated_at,
    )
}

/// CreateNote Handler - 成员可写
pub struct CreateNoteHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
    note_repo: Arc<dyn NoteRepositoryPort>,
}

impl CreateNoteHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
        note_repo: Arc<dyn NoteRepositoryPort>,
    ) -> Self {
        Self {
            project_repo,
            chapter_repo,
            note_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateNoteCommand,
    ) -> Result<CreateNoteResponse, ApplicationError> {
        let chapter = self
            .chapter_repo
            .find_by_id(cmd.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", cmd.chapter_id))?;

        require_member(&self.project_repo, chapter.project_id, &cmd.user_id).await?;

        // 领域实体负责内容校验
        let note = DirectorsNote::new(
            cmd.chapter_id,
            ProjectId::from_uuid(chapter.project_id),
            cmd.content,
            cmd.position,
            cmd.user_id,
        )
        .map_err(|e| ApplicationError::invalid(e.to_string()))?;

        let record = note_to_record(&note);
        self.note_repo.insert(&record).await?;

        tracing::info!(
            note_id = %record.id,
            chapter_id = %cmd.chapter_id,
            "Director's note created"
        );

        Ok(CreateNoteResponse { note_id: record.id })
    }
}

/// 加载笔记并要求调用者为创建者
async fn require_note_creator(
    note_repo: &Arc<dyn NoteRepositoryPort>,
    note_id: uuid::Uuid,
    user_id: &str,
) -> Result<NoteRecord, ApplicationError> {
    let note = note_repo
        .find_by_id(note_id)
        .await?
        .ok_or_else(|| ApplicationError::not_found("Note", note_id))?;

    if note.creator_id != user_id {
        return Err(ApplicationError::forbidden(format!(
            "user {} is not the creator of note {}",
            user_id, note_id
        )));
    }
    Ok(note)
}

/// UpdateNote Handler - 仅创建者，CAS on version
pub struct UpdateNoteHandler {
    note_repo: Arc<dyn NoteRepositoryPort>,
}

impl UpdateNoteHandler {
    pub fn new(note_repo: Arc<dyn NoteRepositoryPort>) -> Self {
        Self { note_repo }
    }

    pub async fn handle(
        &self,
        cmd: UpdateNoteCommand,
    ) -> Result<NoteMutationResponse, ApplicationError> {
        let record = require_note_creator(&self.note_repo, cmd.note_id, &cmd.user_id).await?;

        // 内容校验与版本递增在领域实体内完成
        let mut note = note_from_record(&record);
        note.edit(cmd.content)
            .map_err(|e| ApplicationError::invalid(e.to_string()))?;

        let updated = note_to_record(&note);
        self.note_repo.update(&updated, cmd.expected_version).await?;

        tracing::info!(note_id = %updated.id, version = updated.version, "Note updated");

        Ok(NoteMutationResponse {
            note_id: updated.id,
            version: updated.version,
            resolved: updated.resolved,
        })
    }
}

/// ResolveNote Handler - 仅创建者，CAS on version
pub struct ResolveNoteHandler {
    note_repo: Arc<dyn NoteRepositoryPort>,
}

impl ResolveNoteHandler {
    pub fn new(note_repo: Arc<dyn NoteRepositoryPort>) -> Self {
        Self { note_repo }
    }

    pub async fn handle(
        &self,
        cmd: ResolveNoteCommand,
    ) -> Result<NoteMutationResponse, ApplicationError> {
        let record = require_note_creator(&self.note_repo, cmd.note_id, &cmd.user_id).await?;

        // 实体 resolve 幂等；已解决时不再写库，返回当前快照
        let mut note = note_from_record(&record);
        let already_resolved = note.resolved();
        note.resolve();
        let updated = note_to_record(&note);
        if !already_resolved {
            self.note_repo.update(&updated, cmd.expected_version).await?;
        }

        tracing::info!(note_id = %updated.id, "Note resolved");

        Ok(NoteMutationResponse {
            note_id: updated.id,
            version: updated.version,
            resolved: updated.resolved,
        })
    }
}

/// DeleteNote Handler - 仅创建者
pub struct DeleteNoteHandler {
    note_repo: Arc<dyn NoteRepositoryPort>,
}

impl DeleteNoteHandler {
    pub fn new(note_repo: Arc<dyn NoteRepositoryPort>) -> Self {
        Self { note_repo }
    }

    pub async fn handle(&self, cmd: DeleteNoteCommand) -> Result<(), ApplicationError> {
        require_note_creator(&self.note_repo, cmd.note_id, &cmd.user_id).await?;
        self.note_repo.delete(cmd.note_id).await?;

        tracing::info!(note_id = %cmd.note_id, "Note deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::application::ports::{ChapterRecord, ProjectRecord};
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteChapterRepository,
        SqliteNoteRepository, SqliteProjectRepository,
    };

    struct Fixture {
        create: CreateNoteHandler,
        update: UpdateNoteHandler,
        resolve: ResolveNoteHandler,
        note_repo: Arc<SqliteNoteRepository>,
        chapter_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let chapter_repo = Arc::new(SqliteChapterRepository::new(pool.clone()));
        let note_repo = Arc::new(SqliteNoteRepository::new(pool.clone()));

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

        let chapter_id = Uuid::new_v4();
        chapter_repo
            .save(&ChapterRecord {
                id: chapter_id,
                project_id,
                chapter_number: 1,
                title: "第一章".to_string(),
                content: "夜色笼罩着车站".to_string(),
                word_count: 1,
                creator_id: "alice".to_string(),
                version: 1,
                created_at: now,
                updated_at: now,
            })
            .await
            .unwrap();

        let note_repo_dyn: Arc<dyn NoteRepositoryPort> = note_repo.clone();
        Fixture {
            create: CreateNoteHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
                note_repo_dyn.clone(),
            ),
            update: UpdateNoteHandler::new(note_repo_dyn.clone()),
            resolve: ResolveNoteHandler::new(note_repo_dyn),
            note_repo,
            chapter_id,
        }
    }

    async fn create_note(fx: &Fixture) -> Uuid {
        fx.create
            .handle(CreateNoteCommand {
                user_id: "alice".to_string(),
                chapter_id: fx.chapter_id,
                content: "这里节奏太慢".to_string(),
                position: Some(42),
            })
            .await
            .unwrap()
            .note_id
    }

    #[tokio::test]
    async fn test_update_bumps_version() {
        let fx = fixture().await;
        let note_id = create_note(&fx).await;

        let updated = fx
            .update
            .handle(UpdateNoteCommand {
                user_id: "alice".to_string(),
                note_id,
                content: "这里节奏太慢，建议压缩对话".to_string(),
                expected_version: 1,
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let record = fx.note_repo.find_by_id(note_id).await.unwrap().unwrap();
        assert_eq!(record.version, 2);
        assert_eq!(record.content, "这里节奏太慢，建议压缩对话");
    }

    #[tokio::test]
    async fn test_update_rejects_empty_content() {
        let fx = fixture().await;
        let note_id = create_note(&fx).await;

        let result = fx
            .update
            .handle(UpdateNoteCommand {
                user_id: "alice".to_string(),
                note_id,
                content: "   ".to_string(),
                expected_version: 1,
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::InvalidParameters(_))
        ));
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent() {
        let fx = fixture().await;
        let note_id = create_note(&fx).await;

        let first = fx
            .resolve
            .handle(ResolveNoteCommand {
                user_id: "alice".to_string(),
                note_id,
                expected_version: 1,
            })
            .await
            .unwrap();
        assert!(first.resolved);
        assert_eq!(first.version, 2);

        // 重复 resolve 不再写库，返回当前快照
        let second = fx
            .resolve
            .handle(ResolveNoteCommand {
                user_id: "alice".to_string(),
                note_id,
                expected_version: 2,
            })
            .await
            .unwrap();
        assert!(second.resolved);
        assert_eq!(second.version, 2);

        let record = fx.note_repo.find_by_id(note_id).await.unwrap().unwrap();
        assert_eq!(record.version, 2);
        assert!(record.resolved_at.is_some());
    }
}
