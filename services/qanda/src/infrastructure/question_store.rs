//! SQLite質問ストア
//!
//! アカウントと質問の保存・取得を提供する。
//! - 書き込み: 専用の単一接続（Arc<Mutex<Connection>>）
//! - 読み取り: deadpool-sqliteによるasync接続プール
//!
//! 作成日時はUNIXエポックからのマイクロ秒（INTEGER）で保存する。

use std::sync::{Arc, Mutex};

use chrono::{DateTime, SubsecRound, Utc};
use deadpool_sqlite::{Config, Pool, Runtime};
use rusqlite::{Connection, OptionalExtension, Row};
use thiserror::Error;

use crate::domain::{Account, AccountId, NewQuestion, Question, QuestionEdit, QuestionId};

/// ストアエラー
#[derive(Debug, Error)]
pub enum StoreError {
    /// データベースエラー
    #[error("データベースエラー: {0}")]
    Database(String),

    /// プール取得エラー
    #[error("プールエラー: {0}")]
    Pool(String),

    /// 接続構築エラー
    #[error("接続構築エラー: {0}")]
    Build(String),

    /// 書き込み接続のロック取得に失敗（Mutex poisoned）
    #[error("書き込み接続のロック取得に失敗")]
    Lock,

    /// ユーザー名が既に使われている
    #[error("ユーザー名は既に使用されています: {0}")]
    UsernameTaken(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<deadpool_sqlite::BuildError> for StoreError {
    fn from(err: deadpool_sqlite::BuildError) -> Self {
        StoreError::Build(err.to_string())
    }
}

impl From<deadpool_sqlite::PoolError> for StoreError {
    fn from(err: deadpool_sqlite::PoolError) -> Self {
        StoreError::Pool(err.to_string())
    }
}

impl From<deadpool_sqlite::InteractError> for StoreError {
    fn from(err: deadpool_sqlite::InteractError) -> Self {
        StoreError::Database(err.to_string())
    }
}

impl From<tokio::task::JoinError> for StoreError {
    fn from(err: tokio::task::JoinError) -> Self {
        StoreError::Database(format!("タスク実行エラー: {}", err))
    }
}

/// SQLiteデータベースのスキーマを定義するSQL
const SCHEMA_SQL: &str = r#"
-- WALモード設定
PRAGMA journal_mode=WAL;
PRAGMA synchronous=NORMAL;

-- 外部キー制約を有効化
PRAGMA foreign_keys=ON;

-- アカウントテーブル
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE
);

-- 質問テーブル
CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    question TEXT NOT NULL,
    user_id INTEGER NOT NULL,
    created INTEGER NOT NULL,      -- UNIXエポックからのマイクロ秒
    FOREIGN KEY (user_id) REFERENCES accounts(id)
);

-- インデックス定義
CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created, id);
CREATE INDEX IF NOT EXISTS idx_questions_user_id ON questions(user_id);
"#;

/// 質問をアカウント付きで取得するSELECT句
const SELECT_QUESTION: &str = "SELECT q.id, q.title, q.question, q.created, a.id, a.username \
     FROM questions AS q INNER JOIN accounts AS a ON a.id = q.user_id";

/// SQLite質問ストア
pub struct SqliteQuestionStore {
    /// 書き込み専用接続
    write_conn: Arc<Mutex<Connection>>,
    /// 読み取り用async接続プール
    read_pool: Pool,
}

impl SqliteQuestionStore {
    /// 新しいSqliteQuestionStoreを作成
    ///
    /// データベースファイルを開き、スキーマを初期化する。
    ///
    /// # Arguments
    /// * `db_path` - データベースファイルのパス
    pub async fn new(db_path: &str) -> Result<Self, StoreError> {
        let write_conn = Connection::open(db_path)?;
        write_conn.execute_batch(SCHEMA_SQL)?;

        // 読み取り用プール（最大4接続）
        let read_pool = Config::new(db_path)
            .builder(Runtime::Tokio1)
            .map_err(|e| StoreError::Build(e.to_string()))?
            .max_size(4)
            .build()?;

        Ok(Self {
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
        })
    }

    /// 書き込み用接続でクロージャを実行する
    async fn with_write_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let conn = self.write_conn.clone();
        tokio::task::spawn_blocking(move || {
            let conn = conn.lock().map_err(|_| StoreError::Lock)?;
            f(&conn)
        })
        .await?
    }

    /// アカウントを作成
    ///
    /// # Returns
    /// * `Ok(Account)` - 作成されたアカウント
    /// * `Err(StoreError::UsernameTaken)` - ユーザー名が既に存在
    pub async fn create_account(&self, username: &str) -> Result<Account, StoreError> {
        let username = username.to_string();

        self.with_write_conn(move |conn| {
            let exists = conn
                .query_row(
                    "SELECT 1 FROM accounts WHERE username = ?1",
                    [&username],
                    |_| Ok(true),
                )
                .optional()?
                .unwrap_or(false);

            if exists {
                return Err(StoreError::UsernameTaken(username));
            }

            conn.execute("INSERT INTO accounts (username) VALUES (?1)", [&username])?;

            Ok(Account {
                id: AccountId(conn.last_insert_rowid()),
                username,
            })
        })
        .await
    }

    /// ユーザー名でアカウントを検索
    pub async fn find_account(&self, username: &str) -> Result<Option<Account>, StoreError> {
        let username = username.to_string();
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| -> Result<Option<Account>, StoreError> {
            let account = conn
                .query_row(
                    "SELECT id, username FROM accounts WHERE username = ?1",
                    [&username],
                    |row| {
                        Ok(Account {
                            id: AccountId(row.get(0)?),
                            username: row.get(1)?,
                        })
                    },
                )
                .optional()?;
            Ok(account)
        })
        .await?
    }

    /// 質問を新規保存
    ///
    /// IDはストアが採番し、作成日時は`created`で確定する。
    /// 作成日時はマイクロ秒単位で保存するため、返す値も同じ精度に切り捨てる。
    pub async fn insert_question(
        &self,
        new: &NewQuestion,
        created: DateTime<Utc>,
    ) -> Result<Question, StoreError> {
        let new = new.clone();
        let created = created.trunc_subsecs(6);

        self.with_write_conn(move |conn| {
            conn.execute(
                "INSERT INTO questions (title, question, user_id, created) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    &new.title,
                    &new.question,
                    new.user.id.0,
                    created.timestamp_micros(),
                ],
            )?;

            Ok(Question {
                id: QuestionId(conn.last_insert_rowid()),
                title: new.title,
                question: new.question,
                user: new.user,
                created,
            })
        })
        .await
    }

    /// 質問のタイトルと本文を更新
    ///
    /// 作成日時と投稿者は変更しない。
    ///
    /// # Returns
    /// * `Ok(Some(Question))` - 更新後の質問
    /// * `Ok(None)` - 質問が存在しない
    pub async fn update_question(
        &self,
        id: QuestionId,
        edit: &QuestionEdit,
    ) -> Result<Option<Question>, StoreError> {
        let edit = edit.clone();

        self.with_write_conn(move |conn| {
            let rows_affected = conn.execute(
                "UPDATE questions SET title = ?1, question = ?2 WHERE id = ?3",
                rusqlite::params![&edit.title, &edit.question, id.0],
            )?;

            if rows_affected == 0 {
                return Ok(None);
            }

            Self::select_by_id(conn, id)
        })
        .await
    }

    /// IDで質問を取得
    pub async fn get_question(&self, id: QuestionId) -> Result<Option<Question>, StoreError> {
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| Self::select_by_id(conn, id))
            .await?
    }

    /// 作成日時が`[since, until)`に含まれる質問を作成日時の昇順で取得
    pub async fn list_created_between(
        &self,
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    ) -> Result<Vec<Question>, StoreError> {
        let conn = self.read_pool.get().await?;

        conn.interact(move |conn| -> Result<Vec<Question>, StoreError> {
            let sql = format!(
                "{} WHERE q.created >= ?1 AND q.created < ?2 ORDER BY q.created ASC, q.id ASC",
                SELECT_QUESTION
            );
            let mut stmt = conn.prepare(&sql)?;
            let questions = stmt
                .query_map(
                    rusqlite::params![since.timestamp_micros(), until.timestamp_micros()],
                    Self::row_to_question,
                )?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(questions)
        })
        .await?
    }

    /// ID順に質問をページングして取得（再インデックス用）
    ///
    /// # Arguments
    /// * `after` - このIDより大きい質問のみを返す（Noneの場合は先頭から）
    /// * `limit` - 取得件数
    pub async fn list_page(
        &self,
        after: Option<QuestionId>,
        limit: u32,
    ) -> Result<Vec<Question>, StoreError> {
        let conn = self.read_pool.get().await?;
        let after = after.map(|id| id.0).unwrap_or(0);

        conn.interact(move |conn| -> Result<Vec<Question>, StoreError> {
            let sql = format!("{} WHERE q.id > ?1 ORDER BY q.id ASC LIMIT ?2", SELECT_QUESTION);
            let mut stmt = conn.prepare(&sql)?;
            let questions = stmt
                .query_map(rusqlite::params![after, limit], Self::row_to_question)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(questions)
        })
        .await?
    }

    /// IDで質問を1件取得（内部用）
    fn select_by_id(conn: &Connection, id: QuestionId) -> Result<Option<Question>, StoreError> {
        let sql = format!("{} WHERE q.id = ?1", SELECT_QUESTION);
        let question = conn
            .query_row(&sql, [id.0], Self::row_to_question)
            .optional()?;
        Ok(question)
    }

    /// SELECT_QUESTIONの行を質問に変換（内部用）
    fn row_to_question(row: &Row<'_>) -> rusqlite::Result<Question> {
        let created_micros: i64 = row.get(3)?;
        let created = DateTime::from_timestamp_micros(created_micros)
            .ok_or(rusqlite::Error::IntegralValueOutOfRange(3, created_micros))?;

        Ok(Question {
            id: QuestionId(row.get(0)?),
            title: row.get(1)?,
            question: row.get(2)?,
            created,
            user: Account {
                id: AccountId(row.get(4)?),
                username: row.get(5)?,
            },
        })
    }
}
