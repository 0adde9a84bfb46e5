use time::PrimitiveDateTime;

use crate::db::models::AnswerRecord;

pub(crate) const COLUMNS: &str =
    "id, test_id, question_id, number, answer, created_at, updated_at";

pub(crate) struct CreateAnswerRecord<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) question_id: &'a str,
    pub(crate) number: i16,
    pub(crate) answer: &'a str,
    pub(crate) now: PrimitiveDateTime,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateAnswerRecord<'_>,
) -> Result<AnswerRecord, sqlx::Error> {
    sqlx::query_as::<_, AnswerRecord>(&format!(
        "INSERT INTO answer_records (
            id, test_id, question_id, number, answer, created_at, updated_at
         ) VALUES ($1,$2,$3,$4,$5,$6,$7)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.question_id)
    .bind(params.number)
    .bind(params.answer)
    .bind(params.now)
    .bind(params.now)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_test_id(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
) -> Result<Vec<AnswerRecord>, sqlx::Error> {
    sqlx::query_as::<_, AnswerRecord>(&format!(
        "SELECT {COLUMNS} FROM answer_records WHERE test_id = $1 ORDER BY number ASC"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn list_by_test_ids(
    executor: impl sqlx::PgExecutor<'_>,
    test_ids: &[String],
) -> Result<Vec<AnswerRecord>, sqlx::Error> {
    if test_ids.is_empty() {
        return Ok(Vec::new());
    }

    sqlx::query_as::<_, AnswerRecord>(&format!(
        "SELECT {COLUMNS} FROM answer_records WHERE test_id = ANY($1) \
         ORDER BY test_id, number ASC"
    ))
    .bind(test_ids)
    .fetch_all(executor)
    .await
}
