//! 検索インデックスの書き込み・読み取りトレイト
//!
//! リモートの検索クラスタ実装とインメモリ実装の共通インターフェース。

use async_trait::async_trait;
use thiserror::Error;

use super::document::{QuestionDocument, UpsertBody};
use crate::domain::QuestionId;

/// ドキュメントタイプ
pub const DOC_TYPE: &str = "doc";

/// 検索インデックス操作のエラー型
///
/// # エラー種別
/// - `HttpError`: HTTPリクエストのエラーレスポンス
/// - `NetworkError`: ネットワーク接続エラー
/// - `SerializationError`: シリアライズエラー
/// - `RetryExhausted`: 再試行回数超過
/// - `InvalidResponse`: レスポンスボディの解釈に失敗
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SearchIndexError {
    /// HTTPエラー（ステータスコード付き）
    #[error("HTTPエラー: status={status}, message={message}")]
    HttpError {
        /// HTTPステータスコード
        status: u16,
        /// エラーメッセージ
        message: String,
    },

    /// ネットワークエラー
    #[error("ネットワークエラー: {0}")]
    NetworkError(String),

    /// シリアライズエラー
    #[error("シリアライズエラー: {0}")]
    SerializationError(String),

    /// 再試行回数超過エラー
    #[error("再試行回数超過: {0}")]
    RetryExhausted(String),

    /// 不正なレスポンス
    #[error("不正なレスポンス: {0}")]
    InvalidResponse(String),
}

/// 一括upsertの結果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BulkUpsertResult {
    /// 成功したドキュメント数
    pub indexed: usize,
    /// 失敗したドキュメント数
    pub failed: usize,
}

/// 検索インデックスへの書き込み
#[async_trait]
pub trait IndexWriter: Send + Sync {
    /// ドキュメントを作成または更新する
    ///
    /// # 引数
    /// * `index_name` - インデックス名
    /// * `doc_type` - ドキュメントタイプ（常に`DOC_TYPE`）
    /// * `id` - ドキュメントID（質問ID）
    /// * `body` - `{doc, doc_as_upsert}`形式のボディ
    async fn upsert(
        &self,
        index_name: &str,
        doc_type: &str,
        id: QuestionId,
        body: &UpsertBody,
    ) -> Result<(), SearchIndexError>;

    /// 複数ドキュメントをまとめて作成または更新する
    async fn bulk_upsert(
        &self,
        index_name: &str,
        docs: &[QuestionDocument],
    ) -> Result<BulkUpsertResult, SearchIndexError>;
}

/// 検索インデックスからの読み取り
#[async_trait]
pub trait IndexReader: Send + Sync {
    /// 全文検索（`text`フィールドへのmatchクエリ）
    async fn search(
        &self,
        index_name: &str,
        query: &str,
    ) -> Result<Vec<QuestionDocument>, SearchIndexError>;
}
