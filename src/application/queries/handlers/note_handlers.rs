//! Director's Note Query Handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::access::require_member;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRepositoryPort, NoteRecord, NoteRepositoryPort, ProjectRepositoryPort,
};
use crate::application::queries::ListNotesQuery;

/// 导演笔记响应
#[derive(Debug, Clone, Serialize)]
pub struct NoteResponse {
    pub id: Uuid,
    pub chapter_id: Uuid,
    pub content: String,
    pub position: Option<u32>,
    pub creator_id: String,
    pub resolved: bool,
    pub resolved_at: Option<DateTime<Utc>>,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<NoteRecord> for NoteResponse {
    fn from(record: NoteRecord) -> Self {
        Self {
            id: record.id,
            chapter_id: record.chapter_id,
            content: record.content,
            position: record.position,
            creator_id: record.creator_id,
            resolved: record.resolved,
            resolved_at: record.resolved_at,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// ListNotes Handler
pub struct ListNotesHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
    note_repo: Arc<dyn NoteRepositoryPort>,
}

impl ListNotesHandler {
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

    pub async fn handle(&self, query: ListNotesQuery) -> Result<Vec<NoteResponse>, ApplicationError> {
        let chapter = self
            .chapter_repo
            .find_by_id(query.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", query.chapter_id))?;

        require_member(&self.project_repo, chapter.project_id, &query.user_id).await?;

        let notes = self.note_repo.find_by_chapter(query.chapter_id).await?;
        Ok(notes.into_iter().map(NoteResponse::from).collect())
    }
}
