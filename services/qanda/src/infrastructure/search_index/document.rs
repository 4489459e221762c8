//! 検索インデックスドキュメント構造
//!
//! 質問から導出される検索用ドキュメントと、upsertリクエストのボディを定義する。
//! ドキュメントは質問の保存に伴ってのみ作成・更新される。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{Question, QuestionId};

/// 検索インデックスドキュメント
///
/// 質問IDをドキュメントIDとして使用する。
///
/// # フィールド
/// - text: タイトルと本文を改行で連結した全文検索対象
/// - question_body: 本文
/// - title: タイトル
/// - id: 質問ID
/// - created: 作成日時
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionDocument {
    pub text: String,
    pub question_body: String,
    pub title: String,
    pub id: QuestionId,
    pub created: DateTime<Utc>,
}

impl QuestionDocument {
    /// 質問からドキュメントを構築する
    pub fn from_question(question: &Question) -> Self {
        Self {
            text: format!("{}\n{}", question.title, question.question),
            question_body: question.question.clone(),
            title: question.title.clone(),
            id: question.id,
            created: question.created,
        }
    }

    /// ドキュメントIDを返す（質問IDをそのまま使用）
    pub fn document_id(&self) -> QuestionId {
        self.id
    }
}

/// upsertリクエストのボディ
///
/// `doc_as_upsert = true`により、ドキュメントが存在しなければ作成し、
/// 存在すればフィールドをマージする。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UpsertBody {
    pub doc: QuestionDocument,
    pub doc_as_upsert: bool,
}

impl UpsertBody {
    pub fn new(doc: QuestionDocument) -> Self {
        Self {
            doc,
            doc_as_upsert: true,
        }
    }

    pub fn from_question(question: &Question) -> Self {
        Self::new(QuestionDocument::from_question(question))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Account, AccountId};
    use chrono::TimeZone;

    fn question() -> Question {
        Question {
            id: QuestionId(12),
            title: "Unit test".to_string(),
            question: "some long text".to_string(),
            user: Account {
                id: AccountId(1),
                username: "unittest".to_string(),
            },
            created: Utc.with_ymd_and_hms(2030, 12, 31, 10, 30, 0).unwrap(),
        }
    }

    #[test]
    fn test_from_question_fields() {
        let q = question();
        let doc = QuestionDocument::from_question(&q);

        assert_eq!(doc.text, "Unit test\nsome long text");
        assert_eq!(doc.question_body, "some long text");
        assert_eq!(doc.title, "Unit test");
        assert_eq!(doc.id, QuestionId(12));
        assert_eq!(doc.created, q.created);
        assert_eq!(doc.document_id(), QuestionId(12));
    }

    #[test]
    fn test_upsert_body_json_shape() {
        let body = UpsertBody::from_question(&question());
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["doc_as_upsert"], serde_json::Value::Bool(true));
        assert_eq!(json["doc"]["text"], "Unit test\nsome long text");
        assert_eq!(json["doc"]["question_body"], "some long text");
        assert_eq!(json["doc"]["title"], "Unit test");
        assert_eq!(json["doc"]["id"], 12);
        assert_eq!(json["doc"]["created"], "2030-12-31T10:30:00Z");
    }

    #[test]
    fn test_document_deserializes_from_source() {
        let source = r#"{
            "text": "t\nb",
            "question_body": "b",
            "title": "t",
            "id": 3,
            "created": "2030-12-31T10:30:00Z"
        }"#;
        let doc: QuestionDocument = serde_json::from_str(source).unwrap();

        assert_eq!(doc.id, QuestionId(3));
        assert_eq!(doc.title, "t");
    }
}
