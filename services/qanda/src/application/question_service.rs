//! 質問の保存
//!
//! 質問をストアに保存し、保存後フックを同期的に実行する。
//! 検索インデックスへの反映は`SearchIndexSync`フックが担う。
//!
//! フックの失敗は保存を取り消さない。ストアを正とし、失敗はエラーログに残して
//! 再インデックスで回復する。
//!
//! 保存とフック実行は`save_lock`で直列化する。同じ質問への並行した保存でも
//! フックはストアへの書き込み順に呼ばれ、インデックスに古い内容が残らない。
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{error, info};

use crate::domain::{Account, Clock, NewQuestion, Question, QuestionEdit, QuestionId};
use crate::infrastructure::{
    IndexWriter, SearchIndexError, SqliteQuestionStore, StoreError, UpsertBody, DOC_TYPE,
};

/// 保存後フックのエラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SaveHookError {
    #[error("検索インデックスへの反映に失敗: {0}")]
    SearchIndex(#[from] SearchIndexError),
}

/// 質問保存後に呼ばれるフック
#[async_trait]
pub trait QuestionSaveHook: Send + Sync {
    /// ログ出力用の名前
    fn name(&self) -> &'static str;

    /// 作成・更新のたびに1回呼ばれる
    async fn on_saved(&self, question: &Question) -> Result<(), SaveHookError>;
}

/// 保存された質問を検索インデックスにupsertするフック
pub struct SearchIndexSync {
    writer: Arc<dyn IndexWriter>,
    index_name: String,
}

impl SearchIndexSync {
    pub fn new(writer: Arc<dyn IndexWriter>, index_name: impl Into<String>) -> Self {
        Self {
            writer,
            index_name: index_name.into(),
        }
    }
}

#[async_trait]
impl QuestionSaveHook for SearchIndexSync {
    fn name(&self) -> &'static str {
        "search_index_sync"
    }

    async fn on_saved(&self, question: &Question) -> Result<(), SaveHookError> {
        let body = UpsertBody::from_question(question);
        self.writer
            .upsert(&self.index_name, DOC_TYPE, question.id, &body)
            .await?;
        Ok(())
    }
}

/// 質問サービスのエラー
#[derive(Debug, Error)]
pub enum QuestionServiceError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("質問が見つかりません: {0}")]
    NotFound(QuestionId),

    #[error("質問{id}を編集できるのは投稿者のみです（要求者: {username}）")]
    NotOwner { id: QuestionId, username: String },
}

/// 質問サービス
pub struct QuestionService {
    store: Arc<SqliteQuestionStore>,
    clock: Arc<dyn Clock>,
    hooks: Vec<Arc<dyn QuestionSaveHook>>,
    /// ストア書き込みからフック完了までを保持する
    save_lock: Mutex<()>,
}

impl QuestionService {
    pub fn new(store: Arc<SqliteQuestionStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            hooks: Vec::new(),
            save_lock: Mutex::new(()),
        }
    }

    /// 保存後フックを追加
    pub fn with_hook(mut self, hook: Arc<dyn QuestionSaveHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    /// 新規質問を保存
    ///
    /// IDと作成日時を確定させた後、各フックを1回ずつ実行する。
    pub async fn save_new(&self, new: NewQuestion) -> Result<Question, QuestionServiceError> {
        let _guard = self.save_lock.lock().await;
        let created = self.clock.now();
        let question = self.store.insert_question(&new, created).await?;

        info!(
            question_id = %question.id,
            username = %question.user.username,
            "質問を新規作成"
        );

        self.after_save(&question).await;
        Ok(question)
    }

    /// 既存質問のタイトルと本文を更新して保存
    ///
    /// 投稿者以外は編集できない。作成日時は変わらない。
    pub async fn save_edit(
        &self,
        id: QuestionId,
        editor: &Account,
        edit: QuestionEdit,
    ) -> Result<Question, QuestionServiceError> {
        let _guard = self.save_lock.lock().await;
        let current = self
            .store
            .get_question(id)
            .await?
            .ok_or(QuestionServiceError::NotFound(id))?;

        if current.user.id != editor.id {
            return Err(QuestionServiceError::NotOwner {
                id,
                username: editor.username.clone(),
            });
        }

        let question = self
            .store
            .update_question(id, &edit)
            .await?
            .ok_or(QuestionServiceError::NotFound(id))?;

        info!(question_id = %question.id, "質問を更新");

        self.after_save(&question).await;
        Ok(question)
    }

    /// 保存後フックを順に実行する
    async fn after_save(&self, question: &Question) {
        for hook in &self.hooks {
            if let Err(e) = hook.on_saved(question).await {
                error!(
                    hook = hook.name(),
                    question_id = %question.id,
                    error = %e,
                    "保存後フックに失敗（保存は確定済み、再インデックスで回復可能）"
                );
            }
        }
    }
}
