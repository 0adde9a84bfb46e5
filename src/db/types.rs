use serde::{Deserialize, Serialize};
use sqlx::Type;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "testkind", rename_all = "lowercase")]
pub enum TestKind {
    Reading,
    Listening,
}

impl TestKind {
    /// Term used by the source site's listing URLs, also the label on
    /// crawl metrics.
    pub fn term(self) -> &'static str {
        match self {
            TestKind::Reading => "reading",
            TestKind::Listening => "listening",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "questionkind", rename_all = "snake_case")]
pub enum QuestionKind {
    TextInput,
    SingleChoice,
}
