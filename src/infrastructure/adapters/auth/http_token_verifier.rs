//! HTTP Token Verifier - 调用外部身份提供方校验令牌
//!
//! 实现 TokenVerifierPort trait，GET userinfo 端点携带 Bearer Token，
//! 2xx 返回 {"user_id": "..."}（兼容 "sub" 字段）

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;

use crate::application::ports::{AuthError, Identity, TokenVerifierPort};

/// HTTP 令牌校验器配置
#[derive(Debug, Clone)]
pub struct HttpTokenVerifierConfig {
    /// userinfo 端点完整 URL
    pub userinfo_url: String,
    /// 请求超时时间（秒）
    pub timeout_secs: u64,
}

impl Default for HttpTokenVerifierConfig {
    fn default() -> Self {
        Self {
            userinfo_url: "http://localhost:9000/userinfo".to_string(),
            timeout_secs: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
struct UserInfoResponse {
    #[serde(alias = "sub")]
    user_id: String,
}

/// HTTP 令牌校验器
pub struct HttpTokenVerifier {
    client: Client,
    config: HttpTokenVerifierConfig,
}

impl HttpTokenVerifier {
    pub fn new(config: HttpTokenVerifierConfig) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AuthError::ProviderError(e.to_string()))?;

        Ok(Self { client, config })
    }
}

#[async_trait]
impl TokenVerifierPort for HttpTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        let response = self
            .client
            .get(&self.config.userinfo_url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .send()
            .await
            .map_err(|e| AuthError::ProviderError(e.to_string()))?;

        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(AuthError::InvalidToken),
            status if status.is_success() => {
                let info: UserInfoResponse = response
                    .json()
                    .await
                    .map_err(|e| AuthError::ProviderError(e.to_string()))?;
                Ok(Identity::new(info.user_id))
            }
            status => Err(AuthError::ProviderError(format!(
                "identity provider returned HTTP {status}"
            ))),
        }
    }
}
