use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::db::models::{Question, QuestionGroup};

pub(crate) const fn default_page() -> i64 {
    1
}

pub(crate) const fn default_limit() -> i64 {
    10
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ListTestsQuery {
    #[serde(default = "default_page")]
    #[validate(range(min = 1))]
    pub page: i64,
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: i64,
    #[serde(default)]
    pub keyword: Option<String>,
}

impl Default for ListTestsQuery {
    fn default() -> Self {
        Self { page: default_page(), limit: default_limit(), keyword: None }
    }
}

#[derive(Debug, Serialize)]
pub struct Paginated<T> {
    pub data: Vec<T>,
    pub page: i64,
    pub limit: i64,
    pub total: i64,
    pub total_pages: i64,
}

#[derive(Debug, Serialize)]
pub struct GroupWithQuestions {
    pub group: QuestionGroup,
    pub questions: Vec<Question>,
}
