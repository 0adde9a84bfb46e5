use sqlx::PgPool;

use crate::db::models::AnswerRecord;
use crate::errors::ServiceError;
use crate::repositories;
use crate::schemas::submission::{QuestionVerdict, SubTestAnswers};

/// Verdicts start out with this label until a submitted answer matches.
const PLACEHOLDER_LABEL: &str = "NOT DONE";
const MATCHED_CATEGORY: &str = "TRUE FALSE NOT GIVEN";

/// Canonical answer records of one sub-test together with the verdicts
/// being built for them.
pub(crate) struct SubTestVerdicts {
    test_id: String,
    records: Vec<AnswerRecord>,
    verdicts: Vec<QuestionVerdict>,
}

impl SubTestVerdicts {
    pub(crate) fn new(test_id: String, records: Vec<AnswerRecord>) -> Self {
        let verdicts = records
            .iter()
            .map(|record| QuestionVerdict {
                question_id: record.question_id.clone(),
                number: record.number,
                answer: record.answer.clone(),
                submitted_values: Vec::new(),
                correct: false,
                category: PLACEHOLDER_LABEL.to_string(),
                explanation: PLACEHOLDER_LABEL.to_string(),
            })
            .collect();
        Self { test_id, records, verdicts }
    }

    pub(crate) fn into_verdicts(self) -> Vec<QuestionVerdict> {
        self.verdicts
    }
}

/// Grades a submission against the stored answer key. One verdict per
/// canonical answer record, in sub-test iteration order.
pub(crate) async fn grade(
    pool: &PgPool,
    test_id: &str,
    answers: &[SubTestAnswers],
) -> Result<Vec<QuestionVerdict>, ServiceError> {
    let test = repositories::tests::find_by_id(pool, test_id)
        .await
        .map_err(|err| ServiceError::internal(err, "failed to load test for grading"))?
        .ok_or_else(|| ServiceError::NotFound("test not found".to_string()))?;

    // The storage layout folds sub-tests (listening tracks) into tests rows,
    // so the graded test is its own sub-test set.
    let sub_test_ids = vec![test.id];

    let mut sub_tests = Vec::with_capacity(sub_test_ids.len());
    for sub_test_id in sub_test_ids {
        let records = repositories::answers::list_by_test_id(pool, &sub_test_id)
            .await
            .map_err(|err| ServiceError::internal(err, "failed to load answer records"))?;
        sub_tests.push(SubTestVerdicts::new(sub_test_id, records));
    }

    apply_answers(&mut sub_tests, answers);

    Ok(sub_tests.into_iter().flat_map(SubTestVerdicts::into_verdicts).collect())
}

/// Marks verdicts whose canonical answer appears among the submitted
/// candidate values. Blocks referencing an unknown sub-test, question or
/// verdict row are skipped silently.
pub(crate) fn apply_answers(sub_tests: &mut [SubTestVerdicts], answers: &[SubTestAnswers]) {
    for block in answers {
        let Some(sub_test) = sub_tests.iter_mut().find(|sub| sub.test_id == block.test_id)
        else {
            continue;
        };

        for detail in &block.details {
            let Some(canonical) =
                sub_test.records.iter().find(|record| record.question_id == detail.question_id)
            else {
                continue;
            };
            if !detail.answers.iter().any(|candidate| candidate == &canonical.answer) {
                continue;
            }
            let Some(verdict) = sub_test
                .verdicts
                .iter_mut()
                .find(|verdict| verdict.question_id == detail.question_id)
            else {
                continue;
            };

            verdict.correct = true;
            verdict.category = MATCHED_CATEGORY.to_string();
            verdict.submitted_values = detail.answers.clone();
        }
    }
}
