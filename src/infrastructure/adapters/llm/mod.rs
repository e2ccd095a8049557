//! LLM Adapter - 章节生成客户端实现

mod fake_generation_client;
mod http_generation_client;

pub use fake_generation_client::{FakeGenerationClient, ScriptedGeneration};
pub use http_generation_client::*;
