//! 検索インデックス再構築
//!
//! ストアの全質問をID順にページングし、検索インデックスへ一括upsertする。
//! 保存時のupsert失敗からの回復に使用する。

use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

use crate::domain::QuestionId;
use crate::infrastructure::{IndexWriter, QuestionDocument, SqliteQuestionStore, StoreError};

/// バッチサイズ環境変数名
const BATCH_SIZE_ENV: &str = "REINDEX_BATCH_SIZE";

/// デフォルトのバッチサイズ
const DEFAULT_BATCH_SIZE: u32 = 100;

/// 再構築設定
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReindexConfig {
    /// 1回に読み込んで送信する質問数
    pub batch_size: u32,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

impl ReindexConfig {
    pub fn new(batch_size: u32) -> Result<Self, ReindexConfigError> {
        if batch_size == 0 {
            return Err(ReindexConfigError::InvalidBatchSize);
        }
        Ok(Self { batch_size })
    }

    /// 環境変数から設定を読み込む
    ///
    /// # 環境変数
    /// - REINDEX_BATCH_SIZE: バッチサイズ（デフォルト: 100、数値でなければエラー）
    pub fn from_env() -> Result<Self, ReindexConfigError> {
        let batch_size = match std::env::var(BATCH_SIZE_ENV) {
            Ok(s) => s
                .trim()
                .parse()
                .map_err(|_| ReindexConfigError::InvalidBatchSize)?,
            Err(_) => DEFAULT_BATCH_SIZE,
        };

        Self::new(batch_size)
    }
}

/// 再構築設定エラー
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ReindexConfigError {
    /// バッチサイズが不正（0または数値でない）
    #[error("バッチサイズは1以上の整数である必要があります")]
    InvalidBatchSize,
}

/// 再構築エラー
#[derive(Debug, Error)]
pub enum ReindexError {
    /// ストア読み込みエラー
    #[error("ストア読み込みエラー: {0}")]
    Store(#[from] StoreError),
}

/// 再構築結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReindexResult {
    /// 読み込んだ質問数
    pub scanned_count: usize,
    /// インデックス化された質問数
    pub indexed_count: usize,
    /// インデックス化に失敗した質問数
    pub error_count: usize,
    /// 最後に処理した質問ID（中断時の再開用）
    pub last_id: Option<QuestionId>,
}

/// 検索インデックス再構築
pub struct Reindexer {
    store: Arc<SqliteQuestionStore>,
    writer: Arc<dyn IndexWriter>,
    index_name: String,
    config: ReindexConfig,
}

impl Reindexer {
    pub fn new(
        store: Arc<SqliteQuestionStore>,
        writer: Arc<dyn IndexWriter>,
        index_name: impl Into<String>,
        config: ReindexConfig,
    ) -> Self {
        Self {
            store,
            writer,
            index_name: index_name.into(),
            config,
        }
    }

    /// インデックスを再構築
    ///
    /// # 引数
    /// * `start_after` - このIDより後から再開する（Noneの場合は最初から）
    ///
    /// バッチ単位の送信失敗はエラー件数に数えて続行する。
    /// ストアの読み込み失敗のみ中断する。
    pub async fn run(&self, start_after: Option<QuestionId>) -> Result<ReindexResult, ReindexError> {
        info!(
            index_name = %self.index_name,
            batch_size = self.config.batch_size,
            start_after = ?start_after,
            "検索インデックス再構築を開始"
        );

        let mut result = ReindexResult {
            last_id: start_after,
            ..Default::default()
        };
        let mut batch_number = 0u32;

        loop {
            let questions = self
                .store
                .list_page(result.last_id, self.config.batch_size)
                .await?;
            if questions.is_empty() {
                break;
            }

            batch_number += 1;
            result.scanned_count += questions.len();

            let docs: Vec<QuestionDocument> =
                questions.iter().map(QuestionDocument::from_question).collect();

            match self.writer.bulk_upsert(&self.index_name, &docs).await {
                Ok(bulk) => {
                    result.indexed_count += bulk.indexed;
                    result.error_count += bulk.failed;
                    info!(
                        batch_number = batch_number,
                        indexed = bulk.indexed,
                        failed = bulk.failed,
                        total_scanned = result.scanned_count,
                        "バッチインデックス完了"
                    );
                }
                Err(e) => {
                    result.error_count += docs.len();
                    error!(
                        batch_number = batch_number,
                        batch_count = docs.len(),
                        error = %e,
                        "バッチインデックスに失敗"
                    );
                }
            }

            result.last_id = questions.last().map(|q| q.id);

            if questions.len() < self.config.batch_size as usize {
                break;
            }
        }

        info!(
            scanned_count = result.scanned_count,
            indexed_count = result.indexed_count,
            error_count = result.error_count,
            last_id = ?result.last_id,
            "検索インデックス再構築完了"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewQuestion;
    use crate::infrastructure::logging::init_test_logging;
    use crate::infrastructure::InMemorySearchIndex;
    use chrono::{TimeZone, Utc};
    use serial_test::serial;
    use tempfile::tempdir;

    const INDEX: &str = "answerly_test";

    async fn setup(count: usize) -> (Arc<SqliteQuestionStore>, Vec<QuestionId>, tempfile::TempDir) {
        init_test_logging();
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        let store = Arc::new(SqliteQuestionStore::new(&db_path).await.unwrap());
        let user = store.create_account("unittest").await.unwrap();
        let created = Utc.with_ymd_and_hms(2030, 12, 31, 10, 0, 0).unwrap();

        let mut ids = Vec::new();
        for i in 0..count {
            let q = store
                .insert_question(
                    &NewQuestion::new(format!("q{}", i), "body", user.clone()).unwrap(),
                    created,
                )
                .await
                .unwrap();
            ids.push(q.id);
        }
        (store, ids, dir)
    }

    #[tokio::test]
    async fn test_reindex_all_questions_in_batches() {
        let (store, ids, _dir) = setup(7).await;
        let index = Arc::new(InMemorySearchIndex::new());
        let reindexer = Reindexer::new(store, index.clone(), INDEX, ReindexConfig::new(3).unwrap());

        let result = reindexer.run(None).await.unwrap();

        assert_eq!(
            result,
            ReindexResult {
                scanned_count: 7,
                indexed_count: 7,
                error_count: 0,
                last_id: ids.last().copied(),
            }
        );
        assert_eq!(index.document_count(INDEX), 7);
        let doc = index.document(INDEX, ids[0]).unwrap();
        assert_eq!(doc.text, "q0\nbody");
    }

    #[tokio::test]
    async fn test_reindex_resumes_after_id() {
        let (store, ids, _dir) = setup(5).await;
        let index = Arc::new(InMemorySearchIndex::new());
        let reindexer = Reindexer::new(store, index.clone(), INDEX, ReindexConfig::default());

        let result = reindexer.run(Some(ids[2])).await.unwrap();

        assert_eq!(result.scanned_count, 2);
        assert_eq!(index.document(INDEX, ids[2]), None);
        assert!(index.document(INDEX, ids[3]).is_some());
    }

    #[tokio::test]
    async fn test_reindex_empty_store() {
        let (store, _ids, _dir) = setup(0).await;
        let index = Arc::new(InMemorySearchIndex::new());
        let reindexer = Reindexer::new(store, index, INDEX, ReindexConfig::default());

        let result = reindexer.run(None).await.unwrap();

        assert_eq!(result, ReindexResult::default());
    }

    #[tokio::test]
    async fn test_reindex_counts_failed_batches_and_continues() {
        let (store, ids, _dir) = setup(4).await;
        let index = Arc::new(InMemorySearchIndex::new());
        index.set_failing(true);
        let reindexer = Reindexer::new(store, index.clone(), INDEX, ReindexConfig::new(2).unwrap());

        let result = reindexer.run(None).await.unwrap();

        assert_eq!(result.scanned_count, 4);
        assert_eq!(result.indexed_count, 0);
        assert_eq!(result.error_count, 4);
        assert_eq!(result.last_id, ids.last().copied());
    }

    #[test]
    fn test_config_rejects_zero() {
        assert_eq!(ReindexConfig::new(0), Err(ReindexConfigError::InvalidBatchSize));
        assert_eq!(ReindexConfig::new(5).unwrap().batch_size, 5);
    }

    #[test]
    #[serial]
    fn test_config_from_env() {
        unsafe { std::env::remove_var(BATCH_SIZE_ENV) };
        assert_eq!(ReindexConfig::from_env().unwrap(), ReindexConfig::default());

        unsafe { std::env::set_var(BATCH_SIZE_ENV, "250") };
        assert_eq!(ReindexConfig::from_env().unwrap().batch_size, 250);

        unsafe { std::env::set_var(BATCH_SIZE_ENV, "0") };
        assert_eq!(
            ReindexConfig::from_env(),
            Err(ReindexConfigError::InvalidBatchSize)
        );

        // 数値でない値はデフォルトに戻さずエラーにする
        for value in ["abc", "-1", ""] {
            unsafe { std::env::set_var(BATCH_SIZE_ENV, value) };
            assert_eq!(
                ReindexConfig::from_env(),
                Err(ReindexConfigError::InvalidBatchSize),
                "value: {:?}",
                value
            );
        }

        unsafe { std::env::remove_var(BATCH_SIZE_ENV) };
    }
}
