//! インフラストラクチャ層モジュール
pub mod config;
pub mod logging;
pub mod question_store;
pub mod search_index;

// 再エクスポート
pub use config::{AppConfig, ConfigError};
pub use logging::init_logging;
pub use question_store::{SqliteQuestionStore, StoreError};
pub use search_index::{
    BulkUpsertResult, ElasticsearchClient, InMemorySearchIndex, IndexReader, IndexWriter,
    QuestionDocument, SearchIndexConfig, SearchIndexConfigError, SearchIndexError, UpsertBody,
    UpsertCall, DOC_TYPE,
};
