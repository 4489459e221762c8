//! 検索インデックスHTTPクライアント
//!
//! Elasticsearch互換のHTTP APIに対して、質問ドキュメントのupsert、
//! 一括upsert（_bulk）、全文検索（_search）を行う。

use async_trait::async_trait;
use reqwest::Client;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{policies::ExponentialBackoff, RetryTransientMiddleware};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, error, info, instrument};

use super::document::{QuestionDocument, UpsertBody};
use super::index::{BulkUpsertResult, IndexReader, IndexWriter, SearchIndexError, DOC_TYPE};
use crate::domain::QuestionId;

/// 最大再試行回数
const MAX_RETRIES: u32 = 3;

/// リクエストタイムアウト（秒）
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// 接続タイムアウト（秒）
const CONNECT_TIMEOUT_SECS: u64 = 10;

/// _searchレスポンス
#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    hits: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(rename = "_source")]
    source: QuestionDocument,
}

/// _bulkレスポンス
#[derive(Debug, Deserialize)]
struct BulkResponse {
    #[serde(default)]
    items: Vec<HashMap<String, BulkItem>>,
}

#[derive(Debug, Deserialize)]
struct BulkItem {
    status: u16,
}

/// 検索インデックスHTTPクライアント
///
/// 指数バックオフによる再試行機能を持つ。
#[derive(Clone)]
pub struct ElasticsearchClient {
    /// HTTPクライアント（再試行ミドルウェア付き）
    client: ClientWithMiddleware,
    /// エンドポイントURL
    endpoint: String,
}

impl std::fmt::Debug for ElasticsearchClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticsearchClient")
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

impl ElasticsearchClient {
    /// エンドポイントを指定してクライアントを作成
    ///
    /// # 引数
    /// * `endpoint` - 検索クラスタのベースURL
    pub fn new(endpoint: &str) -> Result<Self, SearchIndexError> {
        info!(endpoint = endpoint, "検索インデックスクライアントを初期化");

        let base_client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| SearchIndexError::NetworkError(e.to_string()))?;

        // 指数バックオフ再試行ポリシー
        let retry_policy = ExponentialBackoff::builder().build_with_max_retries(MAX_RETRIES);

        let client = ClientBuilder::new(base_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// upsertエンドポイントURLを構築
    fn update_url(&self, index_name: &str, doc_type: &str, id: QuestionId) -> String {
        format!("{}/{}/{}/{}/_update", self.endpoint, index_name, doc_type, id)
    }

    /// 一括処理エンドポイントURLを構築
    fn bulk_url(&self) -> String {
        format!("{}/_bulk", self.endpoint)
    }

    /// 検索エンドポイントURLを構築
    fn search_url(&self, index_name: &str) -> String {
        format!("{}/{}/_search", self.endpoint, index_name)
    }

    /// _bulk用のNDJSONボディを構築
    ///
    /// 各ドキュメントについて、updateアクション行とupsertボディ行を出力する。
    fn bulk_body(index_name: &str, docs: &[QuestionDocument]) -> Result<String, SearchIndexError> {
        let mut body = String::new();
        for doc in docs {
            let action = json!({
                "update": {
                    "_index": index_name,
                    "_type": DOC_TYPE,
                    "_id": doc.document_id().to_string(),
                }
            });
            let source = serde_json::to_string(&UpsertBody::new(doc.clone()))
                .map_err(|e| SearchIndexError::SerializationError(e.to_string()))?;

            body.push_str(&action.to_string());
            body.push('\n');
            body.push_str(&source);
            body.push('\n');
        }
        Ok(body)
    }

    /// 送信エラーを分類
    fn classify_send_error(e: reqwest_middleware::Error) -> SearchIndexError {
        if e.is_timeout() || e.is_connect() {
            SearchIndexError::NetworkError(e.to_string())
        } else {
            SearchIndexError::RetryExhausted(e.to_string())
        }
    }

    /// エラーレスポンスをSearchIndexErrorに変換
    async fn error_from_response(response: reqwest::Response) -> SearchIndexError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        SearchIndexError::HttpError {
            status: status.as_u16(),
            message: body,
        }
    }
}

#[async_trait]
impl IndexWriter for ElasticsearchClient {
    #[instrument(skip(self, body), fields(question_id = %id))]
    async fn upsert(
        &self,
        index_name: &str,
        doc_type: &str,
        id: QuestionId,
        body: &UpsertBody,
    ) -> Result<(), SearchIndexError> {
        let url = self.update_url(index_name, doc_type, id);
        debug!(url = %url, "ドキュメントをupsert");

        let body = serde_json::to_string(body).map_err(|e| {
            error!(error = %e, "upsertボディのシリアライズに失敗");
            SearchIndexError::SerializationError(e.to_string())
        })?;

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "upsertリクエスト失敗");
                Self::classify_send_error(e)
            })?;

        let status = response.status();
        if status.is_success() {
            info!(status = %status, "ドキュメントのupsertに成功");
            return Ok(());
        }

        let err = Self::error_from_response(response).await;
        error!(error = %err, "ドキュメントupsertエラー");
        Err(err)
    }

    #[instrument(skip(self, docs), fields(doc_count = docs.len()))]
    async fn bulk_upsert(
        &self,
        index_name: &str,
        docs: &[QuestionDocument],
    ) -> Result<BulkUpsertResult, SearchIndexError> {
        if docs.is_empty() {
            return Ok(BulkUpsertResult::default());
        }

        let body = Self::bulk_body(index_name, docs)?;

        let response = self
            .client
            .post(self.bulk_url())
            .header("Content-Type", "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "一括upsertリクエスト失敗");
                Self::classify_send_error(e)
            })?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            error!(error = %err, "一括upsertエラー");
            return Err(err);
        }

        let text = response
            .text()
            .await
            .map_err(|e| SearchIndexError::InvalidResponse(e.to_string()))?;
        let result = Self::parse_bulk_response(&text, docs.len())?;

        info!(
            indexed = result.indexed,
            failed = result.failed,
            "一括upsert完了"
        );
        Ok(result)
    }
}

impl ElasticsearchClient {
    /// _bulkレスポンスを集計
    ///
    /// ステータスが2xxの項目を成功、それ以外を失敗として数える。
    fn parse_bulk_response(text: &str, sent: usize) -> Result<BulkUpsertResult, SearchIndexError> {
        let response: BulkResponse = serde_json::from_str(text)
            .map_err(|e| SearchIndexError::InvalidResponse(e.to_string()))?;

        if response.items.len() != sent {
            return Err(SearchIndexError::InvalidResponse(format!(
                "送信件数{}に対して結果が{}件",
                sent,
                response.items.len()
            )));
        }

        let mut result = BulkUpsertResult::default();
        for item in response.items.iter().flat_map(|item| item.values()) {
            if (200..300).contains(&item.status) {
                result.indexed += 1;
            } else {
                result.failed += 1;
            }
        }
        Ok(result)
    }
}

#[async_trait]
impl IndexReader for ElasticsearchClient {
    #[instrument(skip(self))]
    async fn search(
        &self,
        index_name: &str,
        query: &str,
    ) -> Result<Vec<QuestionDocument>, SearchIndexError> {
        let body = json!({
            "query": {
                "match": { "text": query }
            }
        });

        let response = self
            .client
            .post(self.search_url(index_name))
            .header("Content-Type", "application/json")
            .body(body.to_string())
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "検索リクエスト失敗");
                Self::classify_send_error(e)
            })?;

        if !response.status().is_success() {
            let err = Self::error_from_response(response).await;
            error!(error = %err, "検索エラー");
            return Err(err);
        }

        let text = response
            .text()
            .await
            .map_err(|e| SearchIndexError::InvalidResponse(e.to_string()))?;
        let parsed: SearchResponse = serde_json::from_str(&text)
            .map_err(|e| SearchIndexError::InvalidResponse(e.to_string()))?;

        let docs: Vec<QuestionDocument> = parsed.hits.hits.into_iter().map(|h| h.source).collect();
        debug!(count = docs.len(), "検索結果を取得");
        Ok(docs)
    }
}
