//! Q&A管理コマンド
//!
//! ユーザー作成と検索インデックスの再構築を行う。
//!
//! # 環境変数
//! - DB_PATH: データベースファイルのパス（デフォルト: /var/lib/answerly/answerly.db）
//! - ES_ENDPOINT: 検索クラスタのエンドポイント（reindexでは必須）
//! - ES_INDEX: インデックス名（デフォルト: answerly）
//! - REINDEX_BATCH_SIZE: バッチサイズ（デフォルト: 100、コマンドライン引数で上書き可能）
//!
//! # 実行例
//! ```bash
//! # ユーザー作成
//! qanda-admin create-user alice
//!
//! # 全件再構築
//! export ES_ENDPOINT=http://localhost:9200
//! qanda-admin reindex
//!
//! # バッチサイズ指定、中断位置から再開
//! qanda-admin reindex --batch-size 200 --start-after 1234
//! ```
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::{error, info};

use qanda::application::{ReindexConfig, ReindexResult, Reindexer};
use qanda::domain::{Account, QuestionId};
use qanda::infrastructure::config::db_path_from_env;
use qanda::infrastructure::{
    ElasticsearchClient, SearchIndexConfig, SqliteQuestionStore, init_logging,
};

type Error = Box<dyn std::error::Error>;

/// コマンドライン引数
#[derive(Parser, Debug)]
#[command(name = "qanda-admin")]
#[command(about = "Q&Aサーバーの管理コマンド")]
struct CliArgs {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// ユーザーを作成する
    CreateUser {
        /// ユーザー名（空白を含まない）
        username: String,
    },

    /// SQLiteの全質問から検索インデックスを再構築する
    Reindex {
        /// バッチサイズ（1回に読み込んで送信する質問数）
        /// 環境変数REINDEX_BATCH_SIZEより優先される
        #[arg(long, short = 'b')]
        batch_size: Option<u32>,

        /// このIDより後の質問から再開する（中断位置から再開する場合）
        #[arg(long, short = 's')]
        start_after: Option<i64>,
    },
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    init_logging();

    let args = CliArgs::parse();
    info!(command = ?args.command, "コマンドライン引数をパース");

    let db_path = db_path_from_env();
    let store = Arc::new(SqliteQuestionStore::new(&db_path).await.inspect_err(|e| {
        error!(error = %e, db_path = %db_path, "SQLiteストアの初期化に失敗");
    })?);

    match args.command {
        Command::CreateUser { username } => {
            let account = create_user(&store, &username).await?;
            info!(account_id = %account.id, username = %account.username, "ユーザーを作成しました");
        }
        Command::Reindex {
            batch_size,
            start_after,
        } => {
            let result = run_reindex(store, batch_size, start_after.map(QuestionId)).await?;
            if let Some(last_id) = result.last_id {
                info!(
                    last_id = %last_id,
                    "次回の再開用ID（未完了の場合は --start-after に指定）"
                );
            }
        }
    }

    Ok(())
}

/// ユーザーを作成
async fn create_user(store: &SqliteQuestionStore, username: &str) -> Result<Account, Error> {
    if !Account::is_valid_username(username) {
        error!(username = %username, "不正なユーザー名");
        return Err(format!("不正なユーザー名です: {:?}", username).into());
    }

    store.create_account(username).await.map_err(|e| {
        error!(username = %username, error = %e, "ユーザー作成に失敗");
        e.into()
    })
}

/// 再構築を実行
///
/// # 引数
/// * `batch_size_override` - バッチサイズのオーバーライド
/// * `start_after` - 再開位置
async fn run_reindex(
    store: Arc<SqliteQuestionStore>,
    batch_size_override: Option<u32>,
    start_after: Option<QuestionId>,
) -> Result<ReindexResult, Error> {
    let reindex_config = match batch_size_override {
        Some(batch_size) => ReindexConfig::new(batch_size),
        None => ReindexConfig::from_env(),
    }
    .inspect_err(|e| {
        error!(error = %e, "再構築設定読み込み失敗");
    })?;

    let search_config = SearchIndexConfig::from_env().inspect_err(|e| {
        error!(error = %e, "検索インデックス設定読み込み失敗");
    })?;

    let Some(endpoint) = search_config.endpoint() else {
        error!("ES_ENDPOINT環境変数が設定されていません");
        return Err("Missing environment variable: ES_ENDPOINT".into());
    };

    info!(
        endpoint = %endpoint,
        index_name = %search_config.index_name(),
        batch_size = reindex_config.batch_size,
        start_after = ?start_after,
        "設定読み込み完了"
    );

    let client = Arc::new(ElasticsearchClient::new(endpoint)?);
    let reindexer = Reindexer::new(store, client, search_config.index_name(), reindex_config);

    let result = reindexer.run(start_after).await.inspect_err(|e| {
        error!(error = %e, "再構築処理に失敗");
    })?;

    if result.error_count > 0 {
        error!(
            error_count = result.error_count,
            "一部の質問のインデックス化に失敗しました"
        );
    }

    Ok(result)
}
