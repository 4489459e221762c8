//! HTMLページ描画
//!
//! ユーザー入力はすべてescape_htmlを通して埋め込む。

use chrono::{DateTime, NaiveDate, Utc};

use crate::application::DailyListing;
use crate::domain::Question;
use crate::infrastructure::QuestionDocument;

/// 質問が1件もない日に表示するメッセージ
pub const EMPTY_DAY_MESSAGE: &str = "Hmm... Everyone thinks they know everything today.";

/// 一覧に表示する作成日時の書式
pub const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M";

/// HTML特殊文字をエスケープ
pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// 作成日時を一覧用の書式に整形
pub fn format_created(created: &DateTime<Utc>) -> String {
    created.format(CREATED_FORMAT).to_string()
}

/// 日別一覧ページのURL
pub fn daily_list_path(date: NaiveDate) -> String {
    format!("/q/{}", date.format("%Y-%m-%d"))
}

fn layout(title: &str, body: &str) -> String {
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>{}</title>\n</head>\n<body>\n\
         <form action=\"/search\" method=\"get\"><input type=\"search\" name=\"q\"><button>Search</button></form>\n\
         {}</body>\n</html>\n",
        escape_html(title),
        body
    )
}

/// 一覧の1項目
fn list_item(question: &Question) -> String {
    format!(
        "<li><a href=\"/q/{}\">{}</a> by {} on {}</li>\n",
        question.id,
        escape_html(&question.title),
        escape_html(&question.user.username),
        format_created(&question.created)
    )
}

/// 日別一覧ページ
pub fn render_daily_list(listing: &DailyListing) -> String {
    let date = listing.date.format("%Y-%m-%d").to_string();
    let mut body = format!("<h1>Questions asked on {}</h1>\n", date);

    if listing.is_empty() {
        body.push_str(&format!("<p>{}</p>\n", EMPTY_DAY_MESSAGE));
    } else {
        body.push_str("<ul>\n");
        for question in &listing.questions {
            body.push_str(&list_item(question));
        }
        body.push_str("</ul>\n");
    }

    body.push_str("<nav>\n");
    if let Some(prev) = listing.previous_day() {
        body.push_str(&format!(
            "<a rel=\"prev\" href=\"{}\">&laquo; {}</a>\n",
            daily_list_path(prev),
            prev.format("%Y-%m-%d")
        ));
    }
    if let Some(next) = listing.next_day() {
        body.push_str(&format!(
            "<a rel=\"next\" href=\"{}\">{} &raquo;</a>\n",
            daily_list_path(next),
            next.format("%Y-%m-%d")
        ));
    }
    body.push_str("</nav>\n");

    layout(&format!("Questions on {}", date), &body)
}

/// 質問詳細ページ
pub fn render_question_detail(question: &Question) -> String {
    let body = format!(
        "<article>\n<h1>{}</h1>\n<p class=\"meta\">by {} on <a href=\"{}\">{}</a></p>\n<div class=\"question\">{}</div>\n</article>\n",
        escape_html(&question.title),
        escape_html(&question.user.username),
        daily_list_path(question.created.date_naive()),
        format_created(&question.created),
        escape_html(&question.question)
    );
    layout(&question.title, &body)
}

/// 検索結果ページ
pub fn render_search_results(query: &str, results: &[QuestionDocument]) -> String {
    let mut body = format!("<h1>Search: {}</h1>\n", escape_html(query));

    if results.is_empty() {
        body.push_str("<p>No questions matched.</p>\n");
    } else {
        body.push_str("<ul>\n");
        for doc in results {
            body.push_str(&format!(
                "<li><a href=\"/q/{}\">{}</a> on {}</li>\n",
                doc.id,
                escape_html(&doc.title),
                format_created(&doc.created)
            ));
        }
        body.push_str("</ul>\n");
    }

    layout(&format!("Search: {}", query), &body)
}
