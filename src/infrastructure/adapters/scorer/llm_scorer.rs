//! LLM Quality Scorer - 调用 OpenAI 兼容服务做章节评分
//!
//! 实现 QualityScorerPort trait，评委模型输出 JSON:
//! {"score": 7.5, "feedback": "..."}
//!
//! 契约: 空白文本直接判 0 分，不调用外部评委

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::application::ports::{QualityAssessment, QualityScorerPort, ScoringError};
use crate::domain::narrative::NarrativeContext;

/// LLM 评分器配置
#[derive(Debug, Clone)]
pub struct LlmScorerConfig {
    /// 评分服务基础 URL（含 /v1）
    pub base_url: String,
    /// 评委模型名
    pub model: String,
    /// API Key（本地部署可为空）
    pub api_key: Option<String>,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for LlmScorerConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "default".to_string(),
            api_key: None,
            timeout_secs: 120,
        }
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

/// 评委约定的 JSON 载荷
#[derive(Debug, Deserialize)]
struct ScorePayload {
    score: f64,
    #[serde(default)]
    feedback: Option<String>,
}

/// LLM 评分器
pub struct LlmScorer {
    client: Client,
    config: LlmScorerConfig,
}

impl LlmScorer {
    pub fn new(config: LlmScorerConfig) -> Result<Self, ScoringError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScoringError::NetworkError(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url)
    }

    fn auth_header(&self) -> Option<String> {
        self.config.api_key.as_ref().map(|k| format!("Bearer {k}"))
    }

    /// 渲染评委提示词
    fn judge_prompt(chapter_text: &str, context: &NarrativeContext) -> String {
        let mut prompt = String::new();
        prompt.push_str(&format!(
            "You are a strict fiction editor. Score chapter {} of {} on a 0-10 scale \
             for prose quality, pacing and continuity with the story so far.\n",
            context.next_chapter, context.target_chapters
        ));

        if let Some(style) = &context.style_guide {
            prompt.push_str(&format!("Style guide: {style}\n"));
        }
        if !context.summaries.is_empty() {
            prompt.push_str("Story so far:\n");
            for summary in &context.summaries {
                prompt.push_str(&format!("  Ch.{} {}: {}\n", summary.number, summary.title, summary.summary));
            }
        }
        if !context.continuity_names.is_empty() {
            prompt.push_str(&format!(
                "Recurring names that must stay consistent: {}\n",
                context.continuity_names.join(", ")
            ));
        }

        prompt.push_str(
            "\nRespond with JSON only: {\"score\": <number>, \"feedback\": \"<weakest aspects>\"}\n",
        );
        prompt.push_str("\n--- CHAPTER TEXT ---\n");
        prompt.push_str(chapter_text);
        prompt
    }

    fn parse_score(raw: &str) -> Result<ScorePayload, ScoringError> {
        let trimmed = raw
            .trim()
            .trim_start_matches("```json")
            .trim_start_matches("```")
            .trim_end_matches("```")
            .trim();

        let payload: ScorePayload = serde_json::from_str(trimmed)
            .map_err(|e| ScoringError::InvalidResponse(format!("malformed score JSON: {e}")))?;

        if !payload.score.is_finite() {
            return Err(ScoringError::InvalidResponse(
                "score is not a finite number".to_string(),
            ));
        }
        Ok(payload)
    }
}

#[async_trait]
impl QualityScorerPort for LlmScorer {
    async fn score(
        &self,
        chapter_text: &str,
        context: &NarrativeContext,
    ) -> Result<QualityAssessment, ScoringError> {
        // fail closed: 空白文本不值得消耗评委调用
        if chapter_text.trim().is_empty() {
            return Ok(QualityAssessment::rejected_empty());
        }

        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: Self::judge_prompt(chapter_text, context),
            }],
            max_tokens: 512,
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object".to_string(),
            },
            stream: false,
        };

        let mut http_request = self.client.post(self.chat_completions_url()).json(&body);
        if let Some(auth) = self.auth_header() {
            http_request = http_request.header(header::AUTHORIZATION, auth);
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                ScoringError::Timeout
            } else {
                ScoringError::NetworkError(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(ScoringError::ServiceError(format!(
                "HTTP {status}: {error_text}"
            )));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| ScoringError::InvalidResponse(e.to_string()))?;

        let content = chat
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .ok_or_else(|| ScoringError::InvalidResponse("response has no choices".to_string()))?;

        let payload = Self::parse_score(content)?;
        let score = payload.score.clamp(0.0, 10.0);

        tracing::debug!(
            chapter_number = context.next_chapter,
            score,
            "Chapter scored"
        );

        Ok(QualityAssessment {
            score,
            feedback: payload.feedback,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_clamps_range() {
        let payload = LlmScorer::parse_score(r#"{"score": 12.5, "feedback": null}"#).unwrap();
        assert_eq!(payload.score.clamp(0.0, 10.0), 10.0);
    }

    #[test]
    fn test_parse_score_rejects_nan_and_garbage() {
        assert!(LlmScorer::parse_score("not json").is_err());
        assert!(LlmScorer::parse_score(r#"{"score": "high"}"#).is_err());
    }

    #[tokio::test]
    async fn test_empty_text_fails_closed() {
        let scorer = LlmScorer::new(LlmScorerConfig::default()).unwrap();
        let context = NarrativeContext {
            chapters_completed: 0,
            next_chapter: 1,
            target_chapters: 5,
            summaries: vec![],
            recent_chapters: vec![],
            continuity_names: vec![],
            style_guide: None,
            bible: None,
            feedback: None,
        };

        // 不触发网络调用，直接 0 分
        let assessment = scorer.score("   \n\t", &context).await.unwrap();
        assert_eq!(assessment.score, 0.0);
        assert!(assessment.feedback.is_some());
    }
}
