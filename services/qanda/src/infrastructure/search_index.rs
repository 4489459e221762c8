//! 検索インデックス関連のインフラストラクチャ実装
//!
//! Elasticsearch互換のHTTP APIへの質問ドキュメントのupsert・一括登録・検索を提供する。
//! SQLiteストアを「真実の源」として維持し、検索インデックスは検索用のマテリアライズドビューとして機能。

mod client;
mod config;
mod document;
mod index;
mod memory;

// 再エクスポート
pub use client::ElasticsearchClient;
pub use config::{SearchIndexConfig, SearchIndexConfigError};
pub use document::{QuestionDocument, UpsertBody};
pub use index::{BulkUpsertResult, IndexReader, IndexWriter, SearchIndexError, DOC_TYPE};
pub use memory::{InMemorySearchIndex, UpsertCall};
