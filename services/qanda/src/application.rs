//! アプリケーション層モジュール
pub mod daily_listing;
pub mod question_service;
pub mod reindexer;

// 再エクスポート
pub use daily_listing::{DailyListError, DailyListing, DailyQuestionList};
pub use question_service::{
    QuestionSaveHook, QuestionService, QuestionServiceError, SaveHookError, SearchIndexSync,
};
pub use reindexer::{
    ReindexConfig, ReindexConfigError, ReindexError, ReindexResult, Reindexer,
};
