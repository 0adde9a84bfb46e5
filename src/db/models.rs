use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;
use time::PrimitiveDateTime;

use crate::db::types::{QuestionKind, TestKind};

/// Listing-card metadata carried alongside a test. Fields default to the
/// empty string when the source page omits them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TestInfo {
    #[serde(default)]
    pub duration: String,
    #[serde(default)]
    pub attempts: String,
    #[serde(default)]
    pub comments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub value: String,
    pub label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Test {
    pub id: String,
    pub kind: TestKind,
    pub crawl_id: String,
    pub part_id: Option<String>,
    pub title: String,
    pub origin_url: String,
    pub info: Json<TestInfo>,
    pub left_column_html: Option<String>,
    pub right_column_html: Option<String>,
    pub audio_links: Option<Vec<String>>,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QuestionGroup {
    pub id: String,
    pub test_id: String,
    pub context: Option<String>,
    pub title: Option<String>,
    pub crawl_part_id: Option<String>,
    pub total_questions: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: String,
    pub group_id: String,
    pub crawl_qid: Option<String>,
    pub number: i32,
    pub text: String,
    pub kind: QuestionKind,
    pub options: Option<Json<Vec<ChoiceOption>>>,
    pub answer: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AnswerRecord {
    pub id: String,
    pub test_id: String,
    pub question_id: String,
    pub number: i16,
    pub answer: String,
    pub created_at: PrimitiveDateTime,
    pub updated_at: PrimitiveDateTime,
}
