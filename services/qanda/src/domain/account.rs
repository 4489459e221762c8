//! アカウント
//!
//! 質問の投稿者を表す。質問はアカウントを参照するだけで所有はしない。
use serde::{Deserialize, Serialize};
use std::fmt;

/// アカウントID（ストアが採番する）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub i64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// アカウント
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub id: AccountId,
    pub username: String,
}

impl Account {
    /// ユーザー名として受け付けられるか
    ///
    /// 空でなく、空白文字を含まないこと。
    pub fn is_valid_username(username: &str) -> bool {
        !username.is_empty() && !username.chars().any(char::is_whitespace)
    }
}
