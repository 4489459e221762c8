//! HTTPハンドラー

use axum::{
    Form,
    extract::{Path, Query, State},
    response::{Html, Redirect},
};
use serde::Deserialize;

use super::AppState;
use super::error::ApiError;
use super::pages;
use crate::domain::{Account, NewQuestion, QuestionEdit, QuestionId};

/// 質問投稿・編集フォーム
#[derive(Debug, Deserialize)]
pub struct QuestionForm {
    pub username: String,
    pub title: String,
    pub question: String,
}

/// 検索クエリ
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    #[serde(default)]
    pub q: String,
}

/// `/q/{id}`のキー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum QuestionKey {
    Date { year: i32, month: u32, day: u32 },
    Id(QuestionId),
}

impl QuestionKey {
    /// `YYYY-MM-DD`なら日付、数字のみならIDとして解釈する
    fn parse(key: &str) -> Option<Self> {
        let parts: Vec<&str> = key.split('-').collect();
        if let [y, m, d] = parts.as_slice() {
            let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
            if y.len() == 4 && m.len() == 2 && d.len() == 2 && parts.iter().all(|p| all_digits(p)) {
                return Some(Self::Date {
                    year: y.parse().ok()?,
                    month: m.parse().ok()?,
                    day: d.parse().ok()?,
                });
            }
            return None;
        }

        if key.bytes().all(|b| b.is_ascii_digit()) {
            return key.parse().ok().map(|id| Self::Id(QuestionId(id)));
        }
        None
    }
}

/// ヘルスチェック
pub async fn health() -> &'static str {
    "OK"
}

/// 今日の一覧へリダイレクト (GET /)
pub async fn today_redirect(State(state): State<AppState>) -> Redirect {
    let today = state.clock.now().date_naive();
    Redirect::to(&pages::daily_list_path(today))
}

/// 日別一覧または質問詳細 (GET /q/{id})
pub async fn question_page(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Html<String>, ApiError> {
    match QuestionKey::parse(&key) {
        Some(QuestionKey::Date { year, month, day }) => {
            let listing = state.daily.list(year, month, day).await?;
            Ok(Html(pages::render_daily_list(&listing)))
        }
        Some(QuestionKey::Id(id)) => {
            let question = state
                .store
                .get_question(id)
                .await?
                .ok_or_else(|| ApiError::not_found(format!("質問が見つかりません: {}", id)))?;
            Ok(Html(pages::render_question_detail(&question)))
        }
        None => Err(ApiError::not_found(format!("ページが見つかりません: /q/{}", key))),
    }
}

/// 全文検索 (GET /search?q=)
pub async fn search_page(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Html<String>, ApiError> {
    let query = params.q.trim();
    if query.is_empty() {
        return Ok(Html(pages::render_search_results(query, &[])));
    }

    let results = state
        .search
        .search(&state.index_name, query)
        .await
        .map_err(|e| {
            tracing::error!(query = %query, error = %e, "検索に失敗");
            ApiError::internal_error(format!("検索エラー: {}", e))
        })?;

    tracing::debug!(query = %query, count = results.len(), "検索完了");
    Ok(Html(pages::render_search_results(query, &results)))
}

/// 質問投稿 (POST /ask)
pub async fn ask_question(
    State(state): State<AppState>,
    Form(form): Form<QuestionForm>,
) -> Result<Redirect, ApiError> {
    tracing::info!(username = %form.username, "質問投稿リクエストを受信");

    let user = find_user(&state, &form.username).await?;
    let new = NewQuestion::new(form.title, form.question, user)?;
    let question = state.questions.save_new(new).await?;

    Ok(Redirect::to(&format!("/q/{}", question.id)))
}

/// 質問編集 (POST /q/{id}/edit)
pub async fn edit_question(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Form(form): Form<QuestionForm>,
) -> Result<Redirect, ApiError> {
    let id = QuestionId(id);
    tracing::info!(question_id = %id, username = %form.username, "質問編集リクエストを受信");

    let editor = find_user(&state, &form.username).await?;
    let edit = QuestionEdit::new(form.title, form.question)?;
    let question = state.questions.save_edit(id, &editor, edit).await?;

    Ok(Redirect::to(&format!("/q/{}", question.id)))
}

async fn find_user(state: &AppState, username: &str) -> Result<Account, ApiError> {
    state
        .store
        .find_account(username)
        .await?
        .ok_or_else(|| ApiError::bad_request(format!("不明なユーザーです: {}", username)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_key() {
        assert_eq!(
            QuestionKey::parse("2030-12-31"),
            Some(QuestionKey::Date {
                year: 2030,
                month: 12,
                day: 31
            })
        );
        // 暦として不正でも形式が合えば日付扱い（404は一覧側で返す）
        assert_eq!(
            QuestionKey::parse("2030-02-30"),
            Some(QuestionKey::Date {
                year: 2030,
                month: 2,
                day: 30
            })
        );
    }

    #[test]
    fn test_parse_id_key() {
        assert_eq!(QuestionKey::parse("42"), Some(QuestionKey::Id(QuestionId(42))));
    }

    #[test]
    fn test_parse_invalid_key() {
        for key in ["", "abc", "2030-1-31", "2030-12", "20301231x", "-1", "99999999999999999999"] {
            assert_eq!(QuestionKey::parse(key), None, "key: {:?}", key);
        }
    }
}
