//! HTTP Middleware
//!
//! Bearer 认证中间件 + HTTP 状态码错误日志中间件

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;
use super::state::AppState;
use crate::application::ports::AuthError;

/// Bearer Token 认证中间件
///
/// 校验通过后把 Identity 放进 request extensions 供 handler 提取。
/// 浏览器 WebSocket 无法携带 Authorization 头，放行 `?token=` 查询参数。
/// `/api/ping` 不需要认证
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if request.uri().path() == "/api/ping" {
        return next.run(request).await;
    }

    let token = match extract_token(&request) {
        Some(token) => token,
        None => return ApiError::from(AuthError::MissingToken).into_response(),
    };

    match state.token_verifier.verify(&token).await {
        Ok(identity) => {
            request.extensions_mut().insert(identity);
            next.run(request).await
        }
        Err(e) => ApiError::from(e).into_response(),
    }
}

fn extract_token(request: &Request) -> Option<String> {
    if let Some(value) = request.headers().get(http::header::AUTHORIZATION) {
        if let Ok(value) = value.to_str() {
            if let Some(token) = value.strip_prefix("Bearer ") {
                if !token.is_empty() {
                    return Some(token.to_string());
                }
            }
        }
    }

    // WebSocket 升级请求走查询参数
    request.uri().query().and_then(|query| {
        query.split('&').find_map(|pair| {
            pair.strip_prefix("token=")
                .filter(|t| !t.is_empty())
                .map(|t| t.to_string())
        })
    })
}

/// HTTP 状态码错误日志中间件
///
/// 拦截 HTTP 响应，当状态码为 4xx 或 5xx 时记录日志
/// 注意：业务错误（errno != 0）在 ApiError::into_response() 中记录
pub async fn error_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();

    let response = next.run(request).await;
    let status = response.status();

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP server error"
        );
    } else if status.is_client_error() {
        tracing::warn!(
            method = %method,
            uri = %uri,
            status = %status.as_u16(),
            "HTTP client error"
        );
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, routing::get, Router};
    use http::{Request as HttpRequest, StatusCode};
    use tower::util::ServiceExt;

    async fn ok_handler() -> &'static str {
        "pong"
    }

    async fn missing_handler() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    async fn broken_handler() -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    fn logging_router() -> Router {
        Router::new()
            .route("/ping", get(ok_handler))
            .route("/missing", get(missing_handler))
            .route("/broken", get(broken_handler))
            .layer(axum::middleware::from_fn(error_logging_middleware))
    }

    #[tokio::test]
    async fn test_error_logging_passes_responses_through() {
        for (uri, expected) in [
            ("/ping", StatusCode::OK),
            ("/missing", StatusCode::NOT_FOUND),
            ("/broken", StatusCode::INTERNAL_SERVER_ERROR),
        ] {
            let request = HttpRequest::builder().uri(uri).body(Body::empty()).unwrap();
            let response = logging_router().oneshot(request).await.unwrap();
            assert_eq!(response.status(), expected, "uri: {uri}");
        }
    }

    #[test]
    fn test_extract_token_from_header() {
        let request = HttpRequest::builder()
            .uri("/api/project/list")
            .header("Authorization", "Bearer tok-123")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request).as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_extract_token_from_query() {
        let request = HttpRequest::builder()
            .uri("/api/auto-complete/abc/progress?token=tok-456")
            .body(Body::empty())
            .unwrap();
        assert_eq!(extract_token(&request).as_deref(), Some("tok-456"));
    }

    #[test]
    fn test_missing_token() {
        let request = HttpRequest::builder()
            .uri("/api/project/list")
            .body(Body::empty())
            .unwrap();
        assert!(extract_token(&request).is_none());

        let request = HttpRequest::builder()
            .uri("/api/project/list")
            .header("Authorization", "Bearer ")
            .body(Body::empty())
            .unwrap();
        assert!(extract_token(&request).is_none());
    }
}
