//! ドメイン層モジュール
pub mod account;
pub mod clock;
pub mod question;

// 再エクスポート
pub use account::{Account, AccountId};
pub use clock::{Clock, FixedClock, SystemClock};
pub use question::{
    NewQuestion, Question, QuestionEdit, QuestionId, QuestionValidationError, MAX_TITLE_CHARS,
};
