use sqlx::types::Json as SqlxJson;

use crate::db::models::{ChoiceOption, Question};
use crate::db::types::QuestionKind;

pub(crate) const COLUMNS: &str = "id, group_id, crawl_qid, number, text, kind, options, answer";

pub(crate) struct CreateQuestion<'a> {
    pub(crate) id: &'a str,
    pub(crate) group_id: &'a str,
    pub(crate) crawl_qid: Option<&'a str>,
    pub(crate) number: i32,
    pub(crate) text: &'a str,
    pub(crate) kind: QuestionKind,
    pub(crate) options: Option<&'a [ChoiceOption]>,
    pub(crate) answer: Option<&'a str>,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateQuestion<'_>,
) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO questions (
            id, group_id, crawl_qid, number, text, kind, options, answer
         ) VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
    )
    .bind(params.id)
    .bind(params.group_id)
    .bind(params.crawl_qid)
    .bind(params.number)
    .bind(params.text)
    .bind(params.kind)
    .bind(params.options.map(|options| SqlxJson(options.to_vec())))
    .bind(params.answer)
    .execute(executor)
    .await?;
    Ok(())
}

pub(crate) async fn list_by_group_id(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<Vec<Question>, sqlx::Error> {
    sqlx::query_as::<_, Question>(&format!(
        "SELECT {COLUMNS} FROM questions WHERE group_id = $1 ORDER BY number ASC"
    ))
    .bind(group_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_by_group_id(
    executor: impl sqlx::PgExecutor<'_>,
    group_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM questions WHERE group_id = $1")
        .bind(group_id)
        .fetch_one(executor)
        .await
}
