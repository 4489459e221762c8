//! 日別質問一覧
//!
//! 指定日（UTC）に作成された質問を作成日時の昇順で取得する。

use chrono::{DateTime, Days, NaiveDate, Utc};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::domain::Question;
use crate::infrastructure::{SqliteQuestionStore, StoreError};

/// 日別一覧のエラー
#[derive(Debug, Error)]
pub enum DailyListError {
    /// 暦上存在しない日付
    #[error("不正な日付: {year:04}-{month:02}-{day:02}")]
    InvalidDate { year: i32, month: u32, day: u32 },

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// ある1日の質問一覧
#[derive(Debug, Clone, PartialEq)]
pub struct DailyListing {
    pub date: NaiveDate,
    /// 作成日時の昇順（同時刻はID順）
    pub questions: Vec<Question>,
}

impl DailyListing {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    /// 前日（暦の下限ではNone）
    pub fn previous_day(&self) -> Option<NaiveDate> {
        self.date.pred_opt()
    }

    /// 翌日（暦の上限ではNone）
    pub fn next_day(&self) -> Option<NaiveDate> {
        self.date.succ_opt()
    }
}

/// 日別一覧の取得
pub struct DailyQuestionList {
    store: Arc<SqliteQuestionStore>,
}

impl DailyQuestionList {
    pub fn new(store: Arc<SqliteQuestionStore>) -> Self {
        Self { store }
    }

    /// 年月日を指定して一覧を取得
    pub async fn list(
        &self,
        year: i32,
        month: u32,
        day: u32,
    ) -> Result<DailyListing, DailyListError> {
        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or(DailyListError::InvalidDate { year, month, day })?;
        self.list_date(date).await
    }

    /// 日付を指定して一覧を取得
    ///
    /// 範囲は`[当日 00:00, 翌日 00:00)`。翌日が表現できない日付では上限なし。
    pub async fn list_date(&self, date: NaiveDate) -> Result<DailyListing, DailyListError> {
        let (since, until) = day_bounds(date);
        let questions = self.store.list_created_between(since, until).await?;

        debug!(date = %date, count = questions.len(), "日別一覧を取得");

        Ok(DailyListing { date, questions })
    }
}

/// 日付のUTCでの半開区間
fn day_bounds(date: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
    let since = date.and_time(chrono::NaiveTime::MIN).and_utc();
    let until = date
        .checked_add_days(Days::new(1))
        .map(|next| next.and_time(chrono::NaiveTime::MIN).and_utc())
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
    (since, until)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::NewQuestion;
    use crate::infrastructure::logging::init_test_logging;
    use chrono::{Duration, TimeZone};
    use tempfile::tempdir;

    async fn setup() -> (DailyQuestionList, Arc<SqliteQuestionStore>, tempfile::TempDir) {
        init_test_logging();
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db").to_string_lossy().to_string();
        let store = Arc::new(SqliteQuestionStore::new(&db_path).await.unwrap());
        (DailyQuestionList::new(store.clone()), store, dir)
    }

    async fn insert_at(
        store: &SqliteQuestionStore,
        user: &crate::domain::Account,
        title: &str,
        created: DateTime<Utc>,
    ) -> Question {
        store
            .insert_question(&NewQuestion::new(title, "body", user.clone()).unwrap(), created)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_list_zero_questions() {
        let (list, _store, _dir) = setup().await;

        let listing = list.list(2030, 12, 31).await.unwrap();

        assert!(listing.is_empty());
        assert_eq!(listing.date, NaiveDate::from_ymd_opt(2030, 12, 31).unwrap());
    }

    #[tokio::test]
    async fn test_list_ten_questions_in_created_order() {
        let (list, store, _dir) = setup().await;
        let user = store.create_account("unittest").await.unwrap();
        let base = Utc.with_ymd_and_hms(2030, 12, 31, 1, 0, 0).unwrap();

        // 逆順に挿入しても作成日時順で返る
        for i in (0..10).rev() {
            insert_at(&store, &user, &format!("q{}", i), base + Duration::hours(i)).await;
        }

        let listing = list.list(2030, 12, 31).await.unwrap();

        assert_eq!(listing.questions.len(), 10);
        let titles: Vec<&str> = listing.questions.iter().map(|q| q.title.as_str()).collect();
        let expected: Vec<String> = (0..10).map(|i| format!("q{}", i)).collect();
        assert_eq!(titles, expected.iter().map(String::as_str).collect::<Vec<_>>());
        assert!(listing.questions.iter().all(|q| q.user.username == "unittest"));
    }

    #[tokio::test]
    async fn test_list_excludes_neighbouring_days() {
        let (list, store, _dir) = setup().await;
        let user = store.create_account("unittest").await.unwrap();

        insert_at(
            &store,
            &user,
            "day before",
            Utc.with_ymd_and_hms(2030, 12, 30, 23, 59, 0).unwrap(),
        )
        .await;
        let first = insert_at(
            &store,
            &user,
            "first",
            Utc.with_ymd_and_hms(2030, 12, 31, 0, 0, 0).unwrap(),
        )
        .await;
        let last = insert_at(
            &store,
            &user,
            "last",
            Utc.with_ymd_and_hms(2030, 12, 31, 23, 59, 59).unwrap() + Duration::microseconds(999_999),
        )
        .await;
        insert_at(
            &store,
            &user,
            "day after",
            Utc.with_ymd_and_hms(2031, 1, 1, 0, 0, 0).unwrap(),
        )
        .await;

        let listing = list.list(2030, 12, 31).await.unwrap();
        let ids: Vec<_> = listing.questions.iter().map(|q| q.id).collect();

        assert_eq!(ids, vec![first.id, last.id]);
    }

    #[tokio::test]
    async fn test_same_created_ordered_by_id() {
        let (list, store, _dir) = setup().await;
        let user = store.create_account("unittest").await.unwrap();
        let at = Utc.with_ymd_and_hms(2030, 12, 31, 12, 0, 0).unwrap();

        let a = insert_at(&store, &user, "a", at).await;
        let b = insert_at(&store, &user, "b", at).await;

        let listing = list.list(2030, 12, 31).await.unwrap();
        let ids: Vec<_> = listing.questions.iter().map(|q| q.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
    }

    #[tokio::test]
    async fn test_list_invalid_date() {
        let (list, _store, _dir) = setup().await;

        let result = list.list(2030, 2, 30).await;

        assert!(matches!(
            result,
            Err(DailyListError::InvalidDate {
                year: 2030,
                month: 2,
                day: 30
            })
        ));
    }

    #[test]
    fn test_previous_and_next_day() {
        let listing = DailyListing {
            date: NaiveDate::from_ymd_opt(2030, 12, 31).unwrap(),
            questions: Vec::new(),
        };

        assert_eq!(listing.previous_day(), NaiveDate::from_ymd_opt(2030, 12, 30));
        assert_eq!(listing.next_day(), NaiveDate::from_ymd_opt(2031, 1, 1));
    }

    #[test]
    fn test_day_bounds() {
        let (since, until) = day_bounds(NaiveDate::from_ymd_opt(2024, 2, 28).unwrap());
        assert_eq!(since, Utc.with_ymd_and_hms(2024, 2, 28, 0, 0, 0).unwrap());
        assert_eq!(until, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }
}
