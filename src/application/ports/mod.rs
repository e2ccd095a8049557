//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod generation_engine;
mod job_control;
mod quality_scorer;
mod repositories;
mod token_verifier;

pub use generation_engine::{
    GenerationEnginePort, GenerationError, GenerationRequest, GenerationResponse,
};
pub use job_control::{JobControlError, JobControlPort, RunSignal};
pub use quality_scorer::{QualityAssessment, QualityScorerPort, ScoringError};
pub use repositories::{
    ChapterRecord, ChapterRepositoryPort, ChapterVersionRecord, JobRecord, JobRepositoryPort,
    JobScoreRecord, NoteRecord, NoteRepositoryPort, ProjectRecord, ProjectRepositoryPort,
    RepositoryError,
};
pub use token_verifier::{AuthError, Identity, TokenVerifierPort};
