//! 質問
//!
//! ストアに保存された質問と、保存前の入力値を表す。
//! 作成日時は作成時に一度だけ決まり、以後変更されない。
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use super::account::Account;

/// タイトルの最大文字数
pub const MAX_TITLE_CHARS: usize = 140;

/// 質問ID（ストアが採番する）
///
/// 検索インデックスのドキュメントIDとしても使用する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct QuestionId(pub i64);

impl fmt::Display for QuestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 保存済みの質問
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub title: String,
    /// 本文
    pub question: String,
    pub user: Account,
    pub created: DateTime<Utc>,
}

/// 質問入力値の検証エラー
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuestionValidationError {
    #[error("タイトルが空です")]
    EmptyTitle,

    #[error("タイトルが長すぎます: {0}文字（最大{max}文字）", max = MAX_TITLE_CHARS)]
    TitleTooLong(usize),

    #[error("本文が空です")]
    EmptyBody,
}

/// 新規投稿される質問
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewQuestion {
    pub title: String,
    pub question: String,
    pub user: Account,
}

impl NewQuestion {
    /// 入力値を検証して作成する
    pub fn new(
        title: impl Into<String>,
        question: impl Into<String>,
        user: Account,
    ) -> Result<Self, QuestionValidationError> {
        let edit = QuestionEdit::new(title, question)?;
        Ok(Self {
            title: edit.title,
            question: edit.question,
            user,
        })
    }
}

/// 既存質問の編集内容
///
/// 変更できるのはタイトルと本文のみ。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionEdit {
    pub title: String,
    pub question: String,
}

impl QuestionEdit {
    pub fn new(
        title: impl Into<String>,
        question: impl Into<String>,
    ) -> Result<Self, QuestionValidationError> {
        let title = title.into().trim().to_string();
        let question = question.into();

        if title.is_empty() {
            return Err(QuestionValidationError::EmptyTitle);
        }
        let title_chars = title.chars().count();
        if title_chars > MAX_TITLE_CHARS {
            return Err(QuestionValidationError::TitleTooLong(title_chars));
        }
        if question.trim().is_empty() {
            return Err(QuestionValidationError::EmptyBody);
        }

        Ok(Self { title, question })
    }
}
