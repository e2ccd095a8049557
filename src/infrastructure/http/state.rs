//! Application State
//!
//! 包含所有 Command/Query Handlers 的应用状态

use std::sync::Arc;

use crate::application::{
    // Command handlers
    AddCollaboratorHandler, ControlJobHandler, CreateChapterHandler, CreateNoteHandler,
    CreateProjectHandler, DeleteChapterHandler, DeleteNoteHandler, DeleteProjectHandler,
    RemoveCollaboratorHandler, ResolveNoteHandler, StartAutoCompleteHandler, UpdateBibleHandler,
    UpdateChapterHandler, UpdateNoteHandler, UpdateSettingsHandler,
    // Query handlers
    GetBibleHandler, GetChapterHandler, GetChapterVersionsHandler, GetJobStatusHandler,
    GetProjectHandler, ListChaptersHandler, ListJobsHandler, ListNotesHandler,
    ListProjectsHandler,
    // Ports
    ChapterRepositoryPort, JobControlPort, JobRepositoryPort, NoteRepositoryPort,
    ProjectRepositoryPort, TokenVerifierPort,
};
use crate::infrastructure::events::EventPublisher;

/// 应用状态
pub struct AppState {
    // ========== Ports ==========
    pub token_verifier: Arc<dyn TokenVerifierPort>,
    pub job_repo: Arc<dyn JobRepositoryPort>,
    pub event_publisher: Arc<EventPublisher>,

    // ========== Command Handlers ==========
    pub create_project_handler: CreateProjectHandler,
    pub update_settings_handler: UpdateSettingsHandler,
    pub delete_project_handler: DeleteProjectHandler,
    pub add_collaborator_handler: AddCollaboratorHandler,
    pub remove_collaborator_handler: RemoveCollaboratorHandler,
    pub update_bible_handler: UpdateBibleHandler,
    pub create_chapter_handler: CreateChapterHandler,
    pub update_chapter_handler: UpdateChapterHandler,
    pub delete_chapter_handler: DeleteChapterHandler,
    pub create_note_handler: CreateNoteHandler,
    pub update_note_handler: UpdateNoteHandler,
    pub resolve_note_handler: ResolveNoteHandler,
    pub delete_note_handler: DeleteNoteHandler,
    pub start_auto_complete_handler: StartAutoCompleteHandler,
    pub control_job_handler: ControlJobHandler,

    // ========== Query Handlers ==========
    pub get_project_handler: GetProjectHandler,
    pub list_projects_handler: ListProjectsHandler,
    pub get_bible_handler: GetBibleHandler,
    pub get_chapter_handler: GetChapterHandler,
    pub list_chapters_handler: ListChaptersHandler,
    pub get_chapter_versions_handler: GetChapterVersionsHandler,
    pub list_notes_handler: ListNotesHandler,
    pub get_job_status_handler: GetJobStatusHandler,
    pub list_jobs_handler: ListJobsHandler,
}

impl AppState {
    /// 创建应用状态
    pub fn new(
        project_repo: Arc<dyn ProjectRepositoryPort>,
        chapter_repo: Arc<dyn ChapterRepositoryPort>,
        note_repo: Arc<dyn NoteRepositoryPort>,
        job_repo: Arc<dyn JobRepositoryPort>,
        job_control: Arc<dyn JobControlPort>,
        token_verifier: Arc<dyn TokenVerifierPort>,
        event_publisher: Arc<EventPublisher>,
    ) -> Self {
        Self {
            // Ports
            token_verifier,
            job_repo: job_repo.clone(),
            event_publisher: event_publisher.clone(),

            // Command handlers
            create_project_handler: CreateProjectHandler::new(project_repo.clone()),
            update_settings_handler: UpdateSettingsHandler::new(project_repo.clone()),
            delete_project_handler: DeleteProjectHandler::new(project_repo.clone()),
            add_collaborator_handler: AddCollaboratorHandler::new(project_repo.clone()),
            remove_collaborator_handler: RemoveCollaboratorHandler::new(project_repo.clone()),
            update_bible_handler: UpdateBibleHandler::new(project_repo.clone()),
            create_chapter_handler: CreateChapterHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
            ),
            update_chapter_handler: UpdateChapterHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
            ),
            delete_chapter_handler: DeleteChapterHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
            ),
            create_note_handler: CreateNoteHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
                note_repo.clone(),
            ),
            update_note_handler: UpdateNoteHandler::new(note_repo.clone()),
            resolve_note_handler: ResolveNoteHandler::new(note_repo.clone()),
            delete_note_handler: DeleteNoteHandler::new(note_repo.clone()),
            start_auto_complete_handler: StartAutoCompleteHandler::new(
                project_repo.clone(),
                job_repo.clone(),
                job_control.clone(),
            ),
            control_job_handler: ControlJobHandler::new(
                job_repo.clone(),
                job_control.clone(),
                event_publisher.clone(),
            ),

            // Query handlers
            get_project_handler: GetProjectHandler::new(project_repo.clone()),
            list_projects_handler: ListProjectsHandler::new(project_repo.clone()),
            get_bible_handler: GetBibleHandler::new(project_repo.clone()),
            get_chapter_handler: GetChapterHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
            ),
            list_chapters_handler: ListChaptersHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
            ),
            get_chapter_versions_handler: GetChapterVersionsHandler::new(
                project_repo.clone(),
                chapter_repo.clone(),
            ),
            list_notes_handler: ListNotesHandler::new(project_repo, chapter_repo, note_repo),
            get_job_status_handler: GetJobStatusHandler::new(job_repo.clone()),
            list_jobs_handler: ListJobsHandler::new(job_repo),
        }
    }
}
