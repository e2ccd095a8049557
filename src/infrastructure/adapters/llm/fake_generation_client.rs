//! Fake Generation Client - 用于测试的生成客户端
//!
//! 按调用顺序返回预置章节，不访问外部服务

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::application::ports::{
    GenerationEnginePort, GenerationError, GenerationRequest, GenerationResponse,
};

/// 预置的一次生成结果
#[derive(Debug, Clone)]
pub enum ScriptedGeneration {
    /// 成功返回章节
    Chapter {
        title: String,
        content: String,
        is_ending: bool,
    },
    /// 返回指定错误
    Fail(String),
    /// 模拟超时
    Timeout,
}

impl ScriptedGeneration {
    pub fn chapter(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Chapter {
            title: title.into(),
            content: content.into(),
            is_ending: false,
        }
    }

    pub fn ending(title: impl Into<String>, content: impl Into<String>) -> Self {
        Self::Chapter {
            title: title.into(),
            content: content.into(),
            is_ending: true,
        }
    }
}

/// Fake Generation Client
///
/// 脚本耗尽后重复返回最后一项
pub struct FakeGenerationClient {
    script: Mutex<Vec<ScriptedGeneration>>,
    cursor: AtomicUsize,
    /// 每次调用的模拟延迟（毫秒）
    delay_ms: u64,
}

impl FakeGenerationClient {
    pub fn new(script: Vec<ScriptedGeneration>) -> Self {
        Self {
            script: Mutex::new(script),
            cursor: AtomicUsize::new(0),
            delay_ms: 0,
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }

    /// 已消费的调用次数
    pub fn calls(&self) -> usize {
        self.cursor.load(Ordering::SeqCst)
    }

    fn next_step(&self) -> Option<ScriptedGeneration> {
        let script = self.script.lock().ok()?;
        if script.is_empty() {
            return None;
        }
        let index = self.cursor.fetch_add(1, Ordering::SeqCst);
        Some(script[index.min(script.len() - 1)].clone())
    }
}

#[async_trait]
impl GenerationEnginePort for FakeGenerationClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if self.delay_ms > 0 {
            tokio::time::sleep(tokio::time::Duration::from_millis(self.delay_ms)).await;
        }

        tracing::debug!(
            chapter_number = request.chapter_number,
            "FakeGenerationClient: serving scripted step"
        );

        match self.next_step() {
            Some(ScriptedGeneration::Chapter {
                title,
                content,
                is_ending,
            }) => Ok(GenerationResponse {
                title,
                content,
                is_ending,
                model: Some("fake".to_string()),
            }),
            Some(ScriptedGeneration::Fail(message)) => {
                Err(GenerationError::ServiceError(message))
            }
            Some(ScriptedGeneration::Timeout) => Err(GenerationError::Timeout),
            None => Err(GenerationError::ServiceError(
                "script is empty".to_string(),
            )),
        }
    }

    async fn health_check(&self) -> bool {
        true
    }
}
