//! 検索インデックス接続設定
//!
//! 環境変数から検索クラスタのエンドポイントとインデックス名を読み取る。
//! エンドポイント未設定時はインメモリインデックスを使用する。

use thiserror::Error;
use url::Url;

/// 検索インデックス設定のエラー型
#[derive(Debug, Error)]
pub enum SearchIndexConfigError {
    /// エンドポイントURLが無効
    #[error("無効なエンドポイントURL: {0}")]
    InvalidEndpoint(String),
}

/// 検索インデックス接続設定
///
/// 環境変数:
/// - ES_ENDPOINT: 検索クラスタのエンドポイントURL（未設定ならインメモリ）
/// - ES_INDEX: インデックス名（デフォルト: answerly）
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// エンドポイントURL
    endpoint: Option<String>,
    /// インデックス名
    index_name: String,
}

impl SearchIndexConfig {
    /// デフォルトのインデックス名
    pub const DEFAULT_INDEX_NAME: &'static str = "answerly";

    /// 環境変数から設定を読み込む
    ///
    /// # エラー
    /// - `InvalidEndpoint`: エンドポイントURLが無効
    pub fn from_env() -> Result<Self, SearchIndexConfigError> {
        let endpoint = std::env::var("ES_ENDPOINT")
            .ok()
            .filter(|s| !s.trim().is_empty());

        if let Some(endpoint) = &endpoint {
            Self::validate_endpoint(endpoint)?;
        }

        let index_name = std::env::var("ES_INDEX")
            .unwrap_or_else(|_| Self::DEFAULT_INDEX_NAME.to_string());

        Ok(Self {
            endpoint,
            index_name,
        })
    }

    /// 明示的な値で設定を作成
    pub fn new(
        endpoint: Option<String>,
        index_name: impl Into<String>,
    ) -> Result<Self, SearchIndexConfigError> {
        if let Some(endpoint) = &endpoint {
            Self::validate_endpoint(endpoint)?;
        }
        Ok(Self {
            endpoint,
            index_name: index_name.into(),
        })
    }

    /// エンドポイントURLのバリデーション
    fn validate_endpoint(endpoint: &str) -> Result<(), SearchIndexConfigError> {
        let url = Url::parse(endpoint)
            .map_err(|e| SearchIndexConfigError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(SearchIndexConfigError::InvalidEndpoint(format!(
                "{}: スキームはhttpまたはhttpsである必要があります",
                endpoint
            )));
        }

        Ok(())
    }

    /// エンドポイントURLを取得
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// インデックス名を取得
    pub fn index_name(&self) -> &str {
        &self.index_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn test_new_with_valid_endpoint() {
        let config =
            SearchIndexConfig::new(Some("http://localhost:9200".to_string()), "test_index").unwrap();

        assert_eq!(config.endpoint(), Some("http://localhost:9200"));
        assert_eq!(config.index_name(), "test_index");
    }

    #[test]
    fn test_new_without_endpoint() {
        let config = SearchIndexConfig::new(None, "answerly").unwrap();
        assert_eq!(config.endpoint(), None);
    }

    #[test]
    fn test_new_with_invalid_scheme() {
        let result = SearchIndexConfig::new(Some("ftp://localhost".to_string()), "idx");
        assert!(matches!(result, Err(SearchIndexConfigError::InvalidEndpoint(_))));
    }

    #[test]
    fn test_new_with_unparsable_endpoint() {
        let result = SearchIndexConfig::new(Some("not a url".to_string()), "idx");
        assert!(result.is_err());
    }

    #[test]
    #[serial]
    fn test_from_env_with_endpoint_and_index() {
        unsafe {
            std::env::set_var("ES_ENDPOINT", "http://es.internal:9200");
            std::env::set_var("ES_INDEX", "questions");
        }

        let config = SearchIndexConfig::from_env().expect("設定の読み込みに失敗");

        assert_eq!(config.endpoint(), Some("http://es.internal:9200"));
        assert_eq!(config.index_name(), "questions");

        unsafe {
            std::env::remove_var("ES_ENDPOINT");
            std::env::remove_var("ES_INDEX");
        }
    }

    #[test]
    #[serial]
    fn test_from_env_defaults() {
        unsafe {
            std::env::remove_var("ES_ENDPOINT");
            std::env::remove_var("ES_INDEX");
        }

        let config = SearchIndexConfig::from_env().expect("設定の読み込みに失敗");

        assert_eq!(config.endpoint(), None);
        assert_eq!(config.index_name(), SearchIndexConfig::DEFAULT_INDEX_NAME);
    }

    #[test]
    #[serial]
    fn test_from_env_blank_endpoint_is_ignored() {
        unsafe {
            std::env::set_var("ES_ENDPOINT", "  ");
        }

        let config = SearchIndexConfig::from_env().expect("設定の読み込みに失敗");
        assert_eq!(config.endpoint(), None);

        unsafe {
            std::env::remove_var("ES_ENDPOINT");
        }
    }
}
