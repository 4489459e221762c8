//! インメモリ検索インデックス
//!
//! 検索クラスタなしでのローカル起動とテストに使用する。
//! upsert呼び出しを記録し、失敗を注入できる。

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use super::document::{QuestionDocument, UpsertBody};
use super::index::{BulkUpsertResult, IndexReader, IndexWriter, SearchIndexError};
use crate::domain::QuestionId;

/// 記録されたupsert呼び出し
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpsertCall {
    pub index_name: String,
    pub doc_type: String,
    pub id: QuestionId,
    pub body: UpsertBody,
}

/// インメモリ検索インデックス
#[derive(Debug, Default)]
pub struct InMemorySearchIndex {
    /// (インデックス名, ドキュメントID) -> ドキュメント
    documents: Mutex<BTreeMap<(String, QuestionId), QuestionDocument>>,
    /// upsert呼び出し履歴
    upsert_calls: Mutex<Vec<UpsertCall>>,
    /// trueの間、書き込みは全て失敗する
    failing: AtomicBool,
}

impl InMemorySearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 書き込みを失敗させるかを切り替える
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// これまでのupsert呼び出しを取得
    pub fn upsert_calls(&self) -> Vec<UpsertCall> {
        self.upsert_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// 格納されたドキュメントを取得
    pub fn document(&self, index_name: &str, id: QuestionId) -> Option<QuestionDocument> {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(&(index_name.to_string(), id))
            .cloned()
    }

    /// インデックス内のドキュメント数
    pub fn document_count(&self, index_name: &str) -> usize {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .filter(|(index, _)| index == index_name)
            .count()
    }

    fn check_failing(&self) -> Result<(), SearchIndexError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SearchIndexError::NetworkError(
                "インメモリインデックスは失敗モードです".to_string(),
            ));
        }
        Ok(())
    }

    fn store(&self, index_name: &str, doc: QuestionDocument) {
        self.documents
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert((index_name.to_string(), doc.id), doc);
    }
}

#[async_trait]
impl IndexWriter for InMemorySearchIndex {
    async fn upsert(
        &self,
        index_name: &str,
        doc_type: &str,
        id: QuestionId,
        body: &UpsertBody,
    ) -> Result<(), SearchIndexError> {
        // 失敗した呼び出しも記録する
        self.upsert_calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(UpsertCall {
                index_name: index_name.to_string(),
                doc_type: doc_type.to_string(),
                id,
                body: body.clone(),
            });

        self.check_failing()?;
        self.store(index_name, body.doc.clone());
        Ok(())
    }

    async fn bulk_upsert(
        &self,
        index_name: &str,
        docs: &[QuestionDocument],
    ) -> Result<BulkUpsertResult, SearchIndexError> {
        self.check_failing()?;
        for doc in docs {
            self.store(index_name, doc.clone());
        }
        Ok(BulkUpsertResult {
            indexed: docs.len(),
            failed: 0,
        })
    }
}

#[async_trait]
impl IndexReader for InMemorySearchIndex {
    /// `text`に検索語のいずれかを含むドキュメントを、一致した語の数が多い順に返す
    async fn search(
        &self,
        index_name: &str,
        query: &str,
    ) -> Result<Vec<QuestionDocument>, SearchIndexError> {
        let terms: Vec<String> = query.split_whitespace().map(str::to_lowercase).collect();
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let documents = self.documents.lock().unwrap_or_else(|e| e.into_inner());
        let mut scored: Vec<(usize, &QuestionDocument)> = documents
            .iter()
            .filter(|((index, _), _)| index == index_name)
            .filter_map(|(_, doc)| {
                let text = doc.text.to_lowercase();
                let score = terms.iter().filter(|t| text.contains(t.as_str())).count();
                (score > 0).then_some((score, doc))
            })
            .collect();

        // スコア降順、同点はID昇順
        scored.sort_by(|(sa, da), (sb, db)| sb.cmp(sa).then(da.id.cmp(&db.id)));

        Ok(scored.into_iter().map(|(_, doc)| doc.clone()).collect())
    }
}
