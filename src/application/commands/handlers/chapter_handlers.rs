//! Chapter Command Handlers

use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::application::access::require_member;
use crate::application::commands::chapter_commands::*;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, ChapterVersionRecord, ProjectRepositoryPort,
};
use crate::domain::project::{Chapter, ProjectId};

fn chapter_to_record(chapter: &Chapter) -> ChapterRecord {
    ChapterRecord {
        id: chapter.id(),
        project_id: *chapter.project_id().as_uuid(),
        chapter_number: chapter.number(),
        title: chapter.title().to_string(),
        content: chapter.content().to_string(),
        word_count: chapter.word_count(),
        creator_id: chapter.creator_id().to_string(),
        version: chapter.version(),
        created_at: chapter.created_at(),
        updated_at: chapter.updated_at(),
    }
}

fn chapter_from_record(record: &ChapterRecord) -> Chapter {
    Chapter::from_parts(
        record.id,
        ProjectId::from_uuid(record.project_id),
        record.chapter_number,
        record.title.clone(),
        record.content.clone(),
        record.word_count,
        record.creator_id.clone(),
        record.version,
        record.created_at,
        record.updated_at,
    )
}

/// CreateChapter Handler - 成员可写
pub struct CreateChapterHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl CreateChapterHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            project_repo,
            chapter_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: CreateChapterCommand,
    ) -> Result<CreateChapterResponse, ApplicationError> {
        require_member(&self.project_repo, cmd.project_id, &cmd.user_id).await?;

        // 编号缺省为当前最大编号 + 1
        let chapter_number = match cmd.chapter_number {
            Some(n) => {
                if self
                    .chapter_repo
                    .find_by_number(cmd.project_id, n)
                    .await?
                    .is_some()
                {
                    return Err(ApplicationError::invalid(format!(
                        "chapter {} already exists",
                        n
                    )));
                }
                n
            }
            None => self.chapter_repo.max_chapter_number(cmd.project_id).await? + 1,
        };

        // 领域实体负责编号与内容校验
        let chapter = Chapter::new(
            ProjectId::from_uuid(cmd.project_id),
            chapter_number,
            cmd.title,
            cmd.content,
            cmd.user_id,
        )
        .map_err(|e| ApplicationError::invalid(e.to_string()))?;

        let record = chapter_to_record(&chapter);
        self.chapter_repo.save(&record).await?;

        tracing::info!(
            project_id = %cmd.project_id,
            chapter_id = %record.id,
            chapter_number = chapter_number,
            word_count = record.word_count,
            "Chapter created"
        );

        Ok(CreateChapterResponse {
            chapter_id: record.id,
            chapter_number,
            word_count: record.word_count,
        })
    }
}

/// UpdateChapter Handler - 成员可写，旧内容进入版本快照
pub struct UpdateChapterHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl UpdateChapterHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            project_repo,
            chapter_repo,
        }
    }

    pub async fn handle(
        &self,
        cmd: UpdateChapterCommand,
    ) -> Result<UpdateChapterResponse, ApplicationError> {
        let record = self
            .chapter_repo
            .find_by_id(cmd.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", cmd.chapter_id))?;

        require_member(&self.project_repo, record.project_id, &cmd.user_id).await?;

        // 版本递增与内容校验在领域实体内完成，revise 返回被替换的旧内容
        let mut chapter = chapter_from_record(&record);
        let previous_title = chapter.title().to_string();
        let previous_version = chapter.version();
        let previous_content = chapter
            .revise(cmd.title, cmd.content)
            .map_err(|e| ApplicationError::invalid(e.to_string()))?;

        // 先落版本快照，再覆盖当前内容
        let snapshot = ChapterVersionRecord {
            id: Uuid::new_v4(),
            chapter_id: record.id,
            version: previous_version,
            title: previous_title,
            content: previous_content,
            created_at: Utc::now(),
        };
        self.chapter_repo.append_version(&snapshot).await?;

        let updated = chapter_to_record(&chapter);
        self.chapter_repo.save(&updated).await?;

        tracing::info!(
            chapter_id = %updated.id,
            version = updated.version,
            "Chapter updated"
        );

        Ok(UpdateChapterResponse {
            chapter_id: updated.id,
            version: updated.version,
            word_count: updated.word_count,
        })
    }
}

/// DeleteChapter Handler - 成员可写
pub struct DeleteChapterHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl DeleteChapterHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            project_repo,
            chapter_repo,
        }
    }

    pub async fn handle(&self, cmd: DeleteChapterCommand) -> Result<(), ApplicationError> {
        let chapter = self
            .chapter_repo
            .find_by_id(cmd.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", cmd.chapter_id))?;

        require_member(&self.project_repo, chapter.project_id, &cmd.user_id).await?;
        self.chapter_repo.delete(cmd.chapter_id).await?;

        tracing::info!(chapter_id = %cmd.chapter_id, "Chapter deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    use crate::application::ports::ProjectRecord;
    use crate::infrastructure::persistence::sqlite::{
        create_pool, run_migrations, DatabaseConfig, SqliteChapterRepository,
        SqliteProjectRepository,
    };

    struct Fixture {
        create: CreateChapterHandler,
        update: UpdateChapterHandler,
        chapter_repo: Arc<SqliteChapterRepository>,
        project_id: Uuid,
    }

    async fn fixture() -> Fixture {
        let pool = create_pool(&DatabaseConfig::in_memory()).await.unwrap();
        run_migrations(&pool).await.unwrap();

        let project_repo = Arc::new(SqliteProjectRepository::new(pool.clone()));
        let chapter_repo = Arc::new(SqliteChapterRepository::new(pool.clone()));

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

        Fixture {
            create: CreateChapterHandler::new(project_repo.clone(), chapter_repo.clone()),
            update: UpdateChapterHandler::new(project_repo, chapter_repo.clone()),
            chapter_repo,
            project_id,
        }
    }

    #[tokio::test]
    async fn test_update_bumps_version_and_snapshots_previous() {
        let fx = fixture().await;
        let created = fx
            .create
            .handle(CreateChapterCommand {
                user_id: "alice".to_string(),
                project_id: fx.project_id,
                title: "第一章".to_string(),
                content: "初稿内容".to_string(),
                chapter_number: None,
            })
            .await
            .unwrap();

        let updated = fx
            .update
            .handle(UpdateChapterCommand {
                user_id: "alice".to_string(),
                chapter_id: created.chapter_id,
                title: Some("第一章（修订）".to_string()),
                content: "二稿内容".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(updated.version, 2);

        let current = fx
            .chapter_repo
            .find_by_id(created.chapter_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.content, "二稿内容");
        assert_eq!(current.title, "第一章（修订）");
        assert_eq!(current.version, 2);

        // 旧内容进入版本快照
        let versions = fx.chapter_repo.versions(created.chapter_id).await.unwrap();
        assert_eq!(versions.len(), 1);
        assert_eq!(versions[0].version, 1);
        assert_eq!(versions[0].title, "第一章");
        assert_eq!(versions[0].content, "初稿内容");
    }

    #[tokio::test]
    async fn test_create_rejects_empty_content_and_zero_number() {
        let fx = fixture().await;

        let empty = fx
            .create
            .handle(CreateChapterCommand {
                user_id: "alice".to_string(),
                project_id: fx.project_id,
                title: "空章".to_string(),
                content: "   ".to_string(),
                chapter_number: None,
            })
            .await;
        assert!(matches!(
            empty,
            Err(ApplicationError::InvalidParameters(_))
        ));

        let zero = fx
            .create
            .handle(CreateChapterCommand {
                user_id: "alice".to_string(),
                project_id: fx.project_id,
                title: "零号章".to_string(),
                content: "内容".to_string(),
                chapter_number: Some(0),
            })
            .await;
        assert!(matches!(zero, Err(ApplicationError::InvalidParameters(_))));
    }

    #[tokio::test]
    async fn test_update_rejects_empty_content() {
        let fx = fixture().await;
        let created = fx
            .create
            .handle(CreateChapterCommand {
                user_id: "alice".to_string(),
                project_id: fx.project_id,
                title: "第一章".to_string(),
                content: "初稿内容".to_string(),
                chapter_number: None,
            })
            .await
            .unwrap();

        let result = fx
            .update
            .handle(UpdateChapterCommand {
                user_id: "alice".to_string(),
                chapter_id: created.chapter_id,
                title: None,
                content: "  ".to_string(),
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::InvalidParameters(_))
        ));

        // 被拒绝的更新不产生版本快照
        let versions = fx.chapter_repo.versions(created.chapter_id).await.unwrap();
        assert!(versions.is_empty());
    }
}
