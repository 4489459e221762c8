//! Q&A HTTPサーバー
//!
//! 本バイナリは以下の機能を提供する:
//! - 今日の一覧へのリダイレクト (GET /)
//! - 日別一覧・質問詳細 (GET /q/{id})
//! - 全文検索 (GET /search?q=)
//! - 質問投稿 (POST /ask)
//! - 質問編集 (POST /q/{id}/edit)
//! - ヘルスチェック (GET /health)
//!
//! # 環境変数
//! - `API_TOKEN`: 書き込みAPIのトークン（必須）
//! - `DB_PATH`: データベースファイルのパス（デフォルト: /var/lib/answerly/answerly.db）
//! - `LISTEN_ADDR`: リッスンアドレス（デフォルト: 127.0.0.1:8080）
//! - `ES_ENDPOINT`: 検索クラスタのエンドポイント（未設定時はインメモリインデックス）
//! - `ES_INDEX`: インデックス名（デフォルト: answerly）
//! - `RUST_LOG`: ログレベル（デフォルト: info）

use std::sync::Arc;
use tokio::signal;
use tracing::{error, info, warn};

use qanda::application::{DailyQuestionList, QuestionService, SearchIndexSync};
use qanda::domain::{Clock, SystemClock};
use qanda::infrastructure::{
    AppConfig, ElasticsearchClient, InMemorySearchIndex, IndexReader, IndexWriter,
    SearchIndexConfig, SqliteQuestionStore, init_logging,
};
use qanda::web::{AppState, AuthConfig, create_router};

/// シャットダウンシグナルを待機する
///
/// SIGTERMまたはCtrl+C (SIGINT) を待機し、いずれかを受信したらリターンする。
/// シグナルハンドラーの登録に失敗した場合、そのシグナルは待機しない。
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Ctrl+C シグナルハンドラーの登録に失敗しました");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "SIGTERM シグナルハンドラーの登録に失敗しました");
                std::future::pending::<()>().await;
            }
        }
    };

    // Windows等の非Unix環境ではSIGTERMは利用不可
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Ctrl+C (SIGINT) を受信しました。graceful shutdownを開始します");
        }
        _ = terminate => {
            info!("SIGTERM を受信しました。graceful shutdownを開始します");
        }
    }
}

/// 検索インデックスの書き込み・読み取り実装を選択する
fn build_search_index(
    config: &SearchIndexConfig,
) -> Result<(Arc<dyn IndexWriter>, Arc<dyn IndexReader>), Box<dyn std::error::Error>> {
    match config.endpoint() {
        Some(endpoint) => {
            let client = Arc::new(ElasticsearchClient::new(endpoint)?);
            info!(endpoint = %endpoint, index_name = %config.index_name(), "検索クラスタに接続");
            let writer: Arc<dyn IndexWriter> = client.clone();
            let reader: Arc<dyn IndexReader> = client;
            Ok((writer, reader))
        }
        None => {
            warn!("ES_ENDPOINTが未設定のため、インメモリ検索インデックスを使用します（再起動で消えます）");
            let index = Arc::new(InMemorySearchIndex::new());
            let writer: Arc<dyn IndexWriter> = index.clone();
            let reader: Arc<dyn IndexReader> = index;
            Ok((writer, reader))
        }
    }
}

/// メイン関数
///
/// SIGTERMまたはCtrl+Cを受信するとgraceful shutdownを実行し、
/// 処理中のリクエスト完了を待ってからSQLiteコネクションを正常にクローズする。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    info!("Q&Aサーバーを起動します");

    let config = AppConfig::from_env().inspect_err(|e| {
        error!(error = %e, "サーバー設定の読み込みに失敗");
    })?;
    let search_config = SearchIndexConfig::from_env().inspect_err(|e| {
        error!(error = %e, "検索インデックス設定の読み込みに失敗");
    })?;

    info!(db_path = %config.db_path(), "データベースパス");
    let store = Arc::new(SqliteQuestionStore::new(config.db_path()).await.inspect_err(
        |e| {
            error!(error = %e, "SQLiteストアの初期化に失敗");
        },
    )?);
    info!("SQLiteストアを初期化しました");

    let (writer, reader) = build_search_index(&search_config)?;
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let questions = QuestionService::new(store.clone(), clock.clone()).with_hook(Arc::new(
        SearchIndexSync::new(writer, search_config.index_name()),
    ));

    let state = AppState {
        store: store.clone(),
        questions: Arc::new(questions),
        daily: Arc::new(DailyQuestionList::new(store)),
        search: reader,
        index_name: search_config.index_name().to_string(),
        clock,
    };

    let app = create_router(AuthConfig::new(config.api_token()), state);

    let addr = config.listen_addr();
    info!(addr = %addr, "リッスン開始");
    let listener = tokio::net::TcpListener::bind(addr).await?;

    // shutdown_signal()がシグナルを受信すると新規コネクションの受付を停止し、
    // 処理中のリクエストの完了を待ってから終了する
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("サーバーが正常に停止しました");
    Ok(())
}
