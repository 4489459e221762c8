//! サーバー設定
//!
//! 環境変数からデータベースパス、リッスンアドレス、APIトークンを読み込む。

use std::net::SocketAddr;
use thiserror::Error;

/// APIトークン環境変数名
const API_TOKEN_ENV: &str = "API_TOKEN";

/// データベースパス環境変数名
const DB_PATH_ENV: &str = "DB_PATH";

/// リッスンアドレス環境変数名
const LISTEN_ADDR_ENV: &str = "LISTEN_ADDR";

/// デフォルトのデータベースパス
pub const DEFAULT_DB_PATH: &str = "/var/lib/answerly/answerly.db";

/// デフォルトのリッスンアドレス
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";

/// 設定エラー
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 必須の環境変数が設定されていない
    #[error("必須の環境変数が設定されていません: {0}")]
    MissingEnvVar(String),

    /// 値が不正
    #[error("環境変数の値が不正です: {name}={value}")]
    InvalidValue { name: String, value: String },
}

/// サーバー設定
#[derive(Debug, Clone)]
pub struct AppConfig {
    db_path: String,
    listen_addr: SocketAddr,
    api_token: String,
}

impl AppConfig {
    /// 環境変数から設定を読み込み
    ///
    /// # 環境変数
    /// - `API_TOKEN`: 書き込みAPIのトークン（必須）
    /// - `DB_PATH`: データベースファイルのパス（デフォルト: /var/lib/answerly/answerly.db）
    /// - `LISTEN_ADDR`: リッスンアドレス（デフォルト: 127.0.0.1:8080）
    pub fn from_env() -> Result<Self, ConfigError> {
        let api_token = std::env::var(API_TOKEN_ENV)
            .ok()
            .filter(|s| !s.is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(API_TOKEN_ENV.to_string()))?;

        let listen_addr_raw =
            std::env::var(LISTEN_ADDR_ENV).unwrap_or_else(|_| DEFAULT_LISTEN_ADDR.to_string());
        let listen_addr = listen_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                name: LISTEN_ADDR_ENV.to_string(),
                value: listen_addr_raw.clone(),
            })?;

        Ok(Self {
            db_path: db_path_from_env(),
            listen_addr,
            api_token,
        })
    }

    /// データベースファイルのパスを取得
    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    /// リッスンアドレスを取得
    pub fn listen_addr(&self) -> SocketAddr {
        self.listen_addr
    }

    /// APIトークンを取得
    pub fn api_token(&self) -> &str {
        &self.api_token
    }
}

/// データベースパスを環境変数から取得（未設定時はデフォルト）
pub fn db_path_from_env() -> String {
    std::env::var(DB_PATH_ENV).unwrap_or_else(|_| DEFAULT_DB_PATH.to_string())
}
