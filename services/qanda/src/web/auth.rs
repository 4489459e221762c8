//! 認証ミドルウェア
//!
//! 書き込み系エンドポイントをAPIトークンで保護する。
//! 閲覧ページには適用しない（ルーター側で`route_layer`により限定する）。

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::{IntoResponse, Response},
};

use super::error::ApiError;

/// 認証設定
#[derive(Clone)]
pub struct AuthConfig {
    /// APIトークン（環境変数から取得）
    pub api_token: String,
}

impl AuthConfig {
    pub fn new(api_token: impl Into<String>) -> Self {
        Self {
            api_token: api_token.into(),
        }
    }
}

/// 認証ミドルウェア
///
/// # Authorization Header Format
/// `Bearer <token>`
///
/// # Returns
/// - 認証成功時: 次のハンドラーにリクエストを渡す
/// - 認証失敗時: 401 Unauthorized（JSON形式）を返す
pub async fn auth_middleware(
    State(config): State<AuthConfig>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let Some(header) = auth_header else {
        tracing::warn!(path = %request.uri().path(), "認証ヘッダーがありません");
        return ApiError::unauthorized("Authorizationヘッダーが必要です").into_response();
    };

    let Some(token) = header.strip_prefix("Bearer ") else {
        tracing::warn!(path = %request.uri().path(), "Bearer形式ではない認証ヘッダー");
        return ApiError::unauthorized("Bearer形式のトークンが必要です").into_response();
    };

    if tokens_match(token, &config.api_token) {
        next.run(request).await
    } else {
        tracing::warn!(path = %request.uri().path(), "無効なAPIトークン");
        ApiError::unauthorized("APIトークンが無効です").into_response()
    }
}

/// トークンを完全一致で比較する
///
/// 長さが等しい場合は不一致の位置によらず全バイトを比較する。
fn tokens_match(given: &str, expected: &str) -> bool {
    let (given, expected) = (given.as_bytes(), expected.as_bytes());
    if given.len() != expected.len() {
        return false;
    }
    given
        .iter()
        .zip(expected)
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::web::error::ApiErrorBody;
    use axum::{
        Router,
        http::StatusCode,
        middleware,
        routing::{get, post},
    };
    use tower::ServiceExt;

    const TEST_TOKEN: &str = "test-api-token-12345";

    /// POSTのみ保護したテスト用ルーター
    fn create_test_router() -> Router {
        let config = AuthConfig::new(TEST_TOKEN);

        Router::new()
            .route("/ask", post(|| async { "asked" }))
            .route_layer(middleware::from_fn_with_state(config, auth_middleware))
            .route("/health", get(|| async { "OK" }))
    }

    fn post_ask(auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri("/ask").method("POST");
        if let Some(value) = auth {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    async fn error_body(response: Response) -> ApiErrorBody {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_valid_bearer_token_passes() {
        let app = create_test_router();

        let response = app
            .oneshot(post_ask(Some(&format!("Bearer {}", TEST_TOKEN))))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_header_returns_401() {
        let app = create_test_router();

        let response = app.oneshot(post_ask(None)).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = error_body(response).await;
        assert_eq!(body.error, "unauthorized");
        assert_eq!(body.message, "Authorizationヘッダーが必要です");
    }

    #[tokio::test]
    async fn test_invalid_token_returns_401() {
        let app = create_test_router();

        let response = app.oneshot(post_ask(Some("Bearer wrong"))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(error_body(response).await.message, "APIトークンが無効です");
    }

    #[tokio::test]
    async fn test_token_with_extra_whitespace_returns_401() {
        for value in [
            format!("Bearer {} ", TEST_TOKEN),
            format!("Bearer  {}", TEST_TOKEN),
            format!("Bearer {}\t", TEST_TOKEN),
        ] {
            let app = create_test_router();

            let response = app.oneshot(post_ask(Some(&value))).await.unwrap();

            assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "header: {:?}", value);
        }
    }

    #[test]
    fn test_tokens_match_requires_exact_bytes() {
        assert!(tokens_match(TEST_TOKEN, TEST_TOKEN));
        assert!(!tokens_match("test-api-token-12346", TEST_TOKEN));
        assert!(!tokens_match("test-api-token-1234", TEST_TOKEN));
        assert!(!tokens_match("", TEST_TOKEN));
        assert!(tokens_match("", ""));
    }

    #[tokio::test]
    async fn test_token_without_bearer_prefix_returns_401() {
        let app = create_test_router();

        let response = app.oneshot(post_ask(Some(TEST_TOKEN))).await.unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_unprotected_route_needs_no_token() {
        let app = create_test_router();

        let request = Request::builder()
            .uri("/health")
            .method("GET")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }
}
