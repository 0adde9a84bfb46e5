use serde::{Deserialize, Serialize};

/// Query for canonical answer records: either an explicit list of test ids
/// or the external group identifier shared by related tests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AnswerQuery {
    #[serde(default)]
    pub test_ids: Option<Vec<String>>,
    #[serde(default)]
    pub test_group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAnswers {
    pub test_id: String,
    pub answers: Vec<SubTestAnswers>,
}

/// One block of submitted answers for a single sub-test.
#[derive(Debug, Clone, Deserialize)]
pub struct SubTestAnswers {
    pub test_id: String,
    pub details: Vec<AnswerDetail>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnswerDetail {
    pub question_id: String,
    pub answers: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuestionVerdict {
    pub question_id: String,
    pub number: i16,
    pub answer: String,
    pub submitted_values: Vec<String>,
    pub correct: bool,
    pub category: String,
    pub explanation: String,
}
