//! Static Token Verifier - 开发与测试用的令牌校验器
//!
//! 令牌到用户的静态映射，不依赖外部身份提供方

use async_trait::async_trait;
use std::collections::HashMap;

use crate::application::ports::{AuthError, Identity, TokenVerifierPort};

/// 静态令牌校验器
pub struct StaticTokenVerifier {
    tokens: HashMap<String, String>,
}

impl StaticTokenVerifier {
    pub fn new(tokens: HashMap<String, String>) -> Self {
        Self { tokens }
    }

    /// 从 "token:user_id" 形式的条目构建
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, S)>,
        S: Into<String>,
    {
        Self {
            tokens: pairs
                .into_iter()
                .map(|(token, user)| (token.into(), user.into()))
                .collect(),
        }
    }
}

#[async_trait]
impl TokenVerifierPort for StaticTokenVerifier {
    async fn verify(&self, token: &str) -> Result<Identity, AuthError> {
        if token.is_empty() {
            return Err(AuthError::MissingToken);
        }

        self.tokens
            .get(token)
            .map(|user_id| Identity::new(user_id.clone()))
            .ok_or(AuthError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_known_and_unknown_tokens() {
        let verifier = StaticTokenVerifier::from_pairs(vec![("tok-alice", "alice")]);

        let identity = verifier.verify("tok-alice").await.unwrap();
        assert_eq!(identity.user_id, "alice");

        assert!(matches!(
            verifier.verify("tok-bogus").await.unwrap_err(),
            AuthError::InvalidToken
        ));
        assert!(matches!(
            verifier.verify("").await.unwrap_err(),
            AuthError::MissingToken
        ));
    }
}
