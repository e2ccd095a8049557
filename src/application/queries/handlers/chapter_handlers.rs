//! Chapter Query Handlers

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::application::access::require_member;
use crate::application::error::ApplicationError;
use crate::application::ports::{
    ChapterRecord, ChapterRepositoryPort, ChapterVersionRecord, ProjectRepositoryPort,
};
use crate::application::queries::{GetChapterQuery, GetChapterVersionsQuery, ListChaptersQuery};

// ============================================================================
// Response DTOs
// ============================================================================

/// 章节详情响应
#[derive(Debug, Clone, Serialize)]
pub struct ChapterResponse {
    pub id: Uuid,
    pub project_id: Uuid,
    pub chapter_number: u32,
    pub title: String,
    pub content: String,
    pub word_count: u64,
    pub creator_id: String,
    pub version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ChapterRecord> for ChapterResponse {
    fn from(record: ChapterRecord) -> Self {
        Self {
            id: record.id,
            project_id: record.project_id,
            chapter_number: record.chapter_number,
            title: record.title,
            content: record.content,
            word_count: record.word_count,
            creator_id: record.creator_id,
            version: record.version,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// 章节列表条目（不含正文）
#[derive(Debug, Clone, Serialize)]
pub struct ChapterSummary {
    pub id: Uuid,
    pub chapter_number: u32,
    pub title: String,
    pub word_count: u64,
    pub version: u32,
    pub updated_at: DateTime<Utc>,
}

impl From<ChapterRecord> for ChapterSummary {
    fn from(record: ChapterRecord) -> Self {
        Self {
            id: record.id,
            chapter_number: record.chapter_number,
            title: record.title,
            word_count: record.word_count,
            version: record.version,
            updated_at: record.updated_at,
        }
    }
}

/// 章节历史版本响应
#[derive(Debug, Clone, Serialize)]
pub struct ChapterVersionResponse {
    pub version: u32,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<ChapterVersionRecord> for ChapterVersionResponse {
    fn from(record: ChapterVersionRecord) -> Self {
        Self {
            version: record.version,
            title: record.title,
            content: record.content,
            created_at: record.created_at,
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GetChapter Handler
pub struct GetChapterHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl GetChapterHandler {
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
    ) -> Self {
        Self {
            project_repo,
            chapter_repo,
        }
    }

    pub async fn handle(&self, query: GetChapterQuery) -> Result<ChapterResponse, ApplicationError> {
        let chapter = self
            .chapter_repo
            .find_by_id(query.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", query.chapter_id))?;

        require_member(&self.project_repo, chapter.project_id, &query.user_id).await?;

        Ok(ChapterResponse::from(chapter))
    }
}

/// ListChapters Handler
pub struct ListChaptersHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl ListChaptersHandler {
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
        query: ListChaptersQuery,
    ) -> Result<Vec<ChapterSummary>, ApplicationError> {
        require_member(&self.project_repo, query.project_id, &query.user_id).await?;

        let chapters = self.chapter_repo.find_by_project(query.project_id).await?;
        Ok(chapters.into_iter().map(ChapterSummary::from).collect())
    }
}

/// GetChapterVersions Handler
pub struct GetChapterVersionsHandler {
    project_repo: Arc<dyn ProjectRepositoryPort>,
    chapter_repo: Arc<dyn ChapterRepositoryPort>,
}

impl GetChapterVersionsHandler {
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
        query: GetChapterVersionsQuery,
    ) -> Result<Vec<ChapterVersionResponse>, ApplicationError> {
        let chapter = self
            .chapter_repo
            .find_by_id(query.chapter_id)
            .await?
            .ok_or_else(|| ApplicationError::not_found("Chapter", query.chapter_id))?;

        require_member(&self.project_repo, chapter.project_id, &query.user_id).await?;

        let versions = self.chapter_repo.versions(query.chapter_id).await?;
        Ok(versions
            .into_iter()
            .map(ChapterVersionResponse::from)
            .collect())
    }
}
