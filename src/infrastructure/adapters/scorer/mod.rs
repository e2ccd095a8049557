//! Scorer Adapter - 章节质量评分实现

mod llm_scorer;
mod scripted_scorer;

pub use llm_scorer::{LlmScorer, LlmScorerConfig};
pub use scripted_scorer::{ScriptedScore, ScriptedScorer};
