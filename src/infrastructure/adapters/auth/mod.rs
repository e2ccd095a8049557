//! Auth Adapter - 令牌校验实现

mod http_token_verifier;
mod static_token_verifier;

pub use http_token_verifier::{HttpTokenVerifier, HttpTokenVerifierConfig};
pub use static_token_verifier::StaticTokenVerifier;
