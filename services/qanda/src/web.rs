//! Webレイヤー
//!
//! 閲覧ページ（日別一覧・質問詳細・検索）と書き込みエンドポイント（投稿・編集）を提供する。
//! 書き込みエンドポイントのみAPIトークン認証を要求する。

pub mod auth;
pub mod error;
pub mod handlers;
pub mod pages;

pub use auth::{AuthConfig, auth_middleware};
pub use error::{ApiError, ApiErrorBody};

use axum::{
    Router, middleware,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::application::{DailyQuestionList, QuestionService};
use crate::domain::Clock;
use crate::infrastructure::{IndexReader, SqliteQuestionStore};

/// アプリケーション状態
///
/// ルーター全体で共有される。
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteQuestionStore>,
    pub questions: Arc<QuestionService>,
    pub daily: Arc<DailyQuestionList>,
    pub search: Arc<dyn IndexReader>,
    /// 検索対象のインデックス名
    pub index_name: String,
    pub clock: Arc<dyn Clock>,
}

/// ルーターを構築する
///
/// TraceLayerによりリクエスト/レスポンスの構造化ログを自動記録する。
pub fn create_router(auth_config: AuthConfig, state: AppState) -> Router {
    let writes = Router::new()
        .route("/ask", post(handlers::ask_question))
        .route("/q/{id}/edit", post(handlers::edit_question))
        .route_layer(middleware::from_fn_with_state(auth_config, auth_middleware));

    Router::new()
        .route("/", get(handlers::today_redirect))
        .route("/health", get(handlers::health))
        .route("/q/{id}", get(handlers::question_page))
        .route("/search", get(handlers::search_page))
        .merge(writes)
        // リクエストトレーシングレイヤー（method, path, status, latencyを自動記録）
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
