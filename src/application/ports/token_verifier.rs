//! Token Verifier Port - 身份令牌校验
//!
//! 身份认证委托给外部身份提供方，本服务只校验 Bearer Token 并得到调用者身份。
//! 具体实现在 infrastructure/adapters/auth 层

use async_trait::async_trait;
use thiserror::Error;

/// 认证错误
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Missing bearer token")]
    MissingToken,

    #[error("Invalid or expired token")]
    InvalidToken,

    #[error("Identity provider error: {0}")]
    ProviderError(String),
}

/// 已验证的调用者身份
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }
}

/// Token Verifier Port
#[async_trait]
pub trait TokenVerifierPort: Send + Sync {
    /// 校验令牌并返回身份
    async fn verify(&self, token: &str) -> Result<Identity, AuthError>;
}
