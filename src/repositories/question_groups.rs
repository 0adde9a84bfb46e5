use crate::db::models::QuestionGroup;

pub(crate) const COLUMNS: &str = "id, test_id, context, title, crawl_part_id, total_questions";

pub(crate) struct CreateGroup<'a> {
    pub(crate) id: &'a str,
    pub(crate) test_id: &'a str,
    pub(crate) context: Option<&'a str>,
    pub(crate) title: Option<&'a str>,
    pub(crate) crawl_part_id: Option<&'a str>,
    pub(crate) total_questions: i32,
}

pub(crate) async fn create(
    executor: impl sqlx::PgExecutor<'_>,
    params: CreateGroup<'_>,
) -> Result<QuestionGroup, sqlx::Error> {
    sqlx::query_as::<_, QuestionGroup>(&format!(
        "INSERT INTO question_groups (
            id, test_id, context, title, crawl_part_id, total_questions
         ) VALUES ($1,$2,$3,$4,$5,$6)
         RETURNING {COLUMNS}"
    ))
    .bind(params.id)
    .bind(params.test_id)
    .bind(params.context)
    .bind(params.title)
    .bind(params.crawl_part_id)
    .bind(params.total_questions)
    .fetch_one(executor)
    .await
}

pub(crate) async fn list_by_test_id(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
) -> Result<Vec<QuestionGroup>, sqlx::Error> {
    sqlx::query_as::<_, QuestionGroup>(&format!(
        "SELECT {COLUMNS} FROM question_groups WHERE test_id = $1 ORDER BY id"
    ))
    .bind(test_id)
    .fetch_all(executor)
    .await
}

pub(crate) async fn count_by_test_id(
    executor: impl sqlx::PgExecutor<'_>,
    test_id: &str,
) -> Result<i64, sqlx::Error> {
    sqlx::query_scalar("SELECT COUNT(*) FROM question_groups WHERE test_id = $1")
        .bind(test_id)
        .fetch_one(executor)
        .await
}
