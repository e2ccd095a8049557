//! HTTP Generation Client - 调用 OpenAI 兼容的文本生成服务
//!
//! 实现 GenerationEnginePort trait，适用于任何 chat/completions 兼容端点
//! （vLLM、Ollama、OpenAI API 等）
//!
//! 约定生成端以 JSON 输出一章:
//! {"title": "...", "content": "...", "is_ending": false}

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{
    GenerationEnginePort, GenerationError, GenerationRequest, GenerationResponse,
};

/// HTTP 生成客户端配置
#[derive(Debug, Clone)]
pub struct HttpGenerationClientConfig {
    /// 生成服务基础 URL（含 /v1）
    pub base_url: String,
    /// 模型名
    pub model: String,
    /// API Key（本地部署可为空）
    pub api_key: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
    /// 采样温度
    pub temperature: f32,
    /// 输出 token 上限
    pub max_tokens: u32,
}

impl Default for HttpGenerationClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "default".to_string(),
            api_key: None,
            timeout_secs: 300,
            temperature: 0.8,
            max_tokens: 8192,
        }
    }
}

impl HttpGenerationClientConfig {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
    temperature: f32,
    response_format: ResponseFormat,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

/// 生成端约定的 JSON 章节载荷
#[derive(Debug, Deserialize)]
struct ChapterPayload {
    title: String,
    content: String,
    #[serde(default)]
    is_ending: bool,
}

/// HTTP 生成客户端
pub struct HttpGenerationClient {
    client: Client,
    config: HttpGenerationClientConfig,
}

impl HttpGenerationClient {
    /// 创建新的 HTTP 生成客户端
    pub fn new(config: HttpGenerationClientConfig) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GenerationError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn models_url(&self) -> String {
        format!("{}/models", self.config.base_url)
    }

    fn auth_header(&self) -> Option<String> {
        self.config.api_key.as_ref().map(|k| format!("Bearer {k}"))
    }

    /// 从模型输出中解析章节 JSON（容忍 markdown 代码块包裹）
    fn parse_chapter(raw: &str) -> Result<ChapterPayload, GenerationError> {
        let trimmed = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        serde_json::from_str(trimmed)
            .map_err(|e| GenerationError::InvalidResponse(format!("malformed chapter JSON: {e}")))
    }
}

#[async_trait]
impl GenerationEnginePort for HttpGenerationClient {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
            stream: false,
        };

        tracing::debug!(
            url = %self.chat_completions_url(),
            project_id = %request.project_id,
            chapter_number = request.chapter_number,
            prompt_len = request.prompt.len(),
            "Sending generation request"
        );

        let mut http_request = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(auth) = self.auth_header() {
            http_request = http_request.header(header::AUTHORIZATION, auth);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                GenerationError::Timeout
            } else if e.is_connect() {
                GenerationError::NetworkError(format!("Cannot connect to generation service: {e}"))
            } else {
                GenerationError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(GenerationError::ServiceError(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| {
                GenerationError::InvalidResponse("response has no choices".to_string())
            })?;

        let payload = Self::parse_chapter(content)?;
        if payload.content.trim().is_empty() {
            return Err(GenerationError::InvalidResponse(
                "generated chapter content is empty".to_string(),
            ));
        }

        tracing::info!(
            chapter_number = request.chapter_number,
            title = %payload.title,
            content_len = payload.content.len(),
            is_ending = payload.is_ending,
            "Chapter generation completed"
        );

        Ok(GenerationResponse {
            title: payload.title,
            content: payload.content,
            is_ending: payload.is_ending,
            model: Some(self.config.model.clone()),
        })
    }

    async fn health_check(&self) -> bool {
        let mut request = self
            .client
            .get(self.models_url())
            .timeout(Duration::from_secs(5));
        if let Some(auth) = self.auth_header() {
            request = request.header(header::AUTHORIZATION, auth);
        }

        match request.send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chapter_plain_json() {
        let payload = HttpGenerationClient::parse_chapter(
            r#"{"title": "第一章", "content": "风雪夜。", "is_ending": false}"#,
        )
        .unwrap();
        assert_eq!(payload.title, "第一章");
        assert!(!payload.is_ending);
    }

    #[test]
    fn test_parse_chapter_fenced_json() {
        let raw = "```json\n{\"title\": \"终章\", \"content\": \"全书完。\", \"is_ending\": true}\n```";
        let payload = HttpGenerationClient::parse_chapter(raw).unwrap();
        assert!(payload.is_ending);
    }

    #[test]
    fn test_parse_chapter_rejects_garbage() {
        let err = HttpGenerationClient::parse_chapter("这不是 JSON").unwrap_err();
        assert!(matches!(err, GenerationError::InvalidResponse(_)));
        assert!(!err.is_retryable());
    }
}
