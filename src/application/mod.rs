//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（GenerationEngine、QualityScorer、Repository、JobControl 等）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - access: 项目成员/owner 授权检查
//! - error: 应用层错误定义

pub mod access;
pub mod commands;
pub mod error;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    // Chapter commands
    CreateChapterCommand,
    CreateChapterResponse,
    DeleteChapterCommand,
    UpdateChapterCommand,
    UpdateChapterResponse,
    // Job commands
    ControlAction,
    ControlJobCommand,
    StartAutoCompleteCommand,
    StartAutoCompleteResponse,
    // Note commands
    CreateNoteCommand,
    CreateNoteResponse,
    DeleteNoteCommand,
    NoteMutationResponse,
    ResolveNoteCommand,
    UpdateNoteCommand,
    // Project commands
    AddCollaboratorCommand,
    CreateProjectCommand,
    CreateProjectResponse,
    DeleteProjectCommand,
    RemoveCollaboratorCommand,
    UpdateBibleCommand,
    UpdateBibleResponse,
    UpdateSettingsCommand,
    // Handlers
    handlers::{
        AddCollaboratorHandler, ControlJobHandler, CreateChapterHandler, CreateNoteHandler,
        CreateProjectHandler, DeleteChapterHandler, DeleteNoteHandler, DeleteProjectHandler,
        RemoveCollaboratorHandler, ResolveNoteHandler, StartAutoCompleteHandler,
        UpdateBibleHandler, UpdateChapterHandler, UpdateNoteHandler, UpdateSettingsHandler,
    },
};

pub use error::ApplicationError;

pub use ports::{
    // Generation engine
    GenerationEnginePort,
    GenerationError,
    GenerationRequest,
    GenerationResponse,
    // Job control
    JobControlError,
    JobControlPort,
    RunSignal,
    // Quality scorer
    QualityAssessment,
    QualityScorerPort,
    ScoringError,
    // Repositories
    ChapterRecord,
    ChapterRepositoryPort,
    ChapterVersionRecord,
    JobRecord,
    JobRepositoryPort,
    JobScoreRecord,
    NoteRecord,
    NoteRepositoryPort,
    ProjectRecord,
    ProjectRepositoryPort,
    RepositoryError,
    // Token verifier
    AuthError,
    Identity,
    TokenVerifierPort,
};

pub use queries::{
    // Chapter queries
    GetChapterQuery,
    GetChapterVersionsQuery,
    ListChaptersQuery,
    // Job queries
    GetJobStatusQuery,
    JobSnapshot,
    ListJobsQuery,
    ScoreEntry,
    // Note queries
    ListNotesQuery,
    // Project queries
    GetBibleQuery,
    GetProjectQuery,
    ListProjectsQuery,
    // Handlers
    handlers::{
        BibleResponse, ChapterResponse, ChapterSummary, ChapterVersionResponse, GetBibleHandler,
        GetChapterHandler, GetChapterVersionsHandler, GetJobStatusHandler, GetProjectHandler,
        ListChaptersHandler, ListJobsHandler, ListNotesHandler, ListProjectsHandler, NoteResponse,
        ProjectResponse, ProjectSummary,
    },
};
